//! Local ledger for one device.
//!
//! The [`Engine`] owns the entity stores (accounts, transactions, recurring
//! rules, credit cards and their transactions) on top of sea-orm. It exposes
//! two write paths:
//!
//! - user writes (`create_*`, `update_*`, `delete_*`), which keep the cached
//!   balances consistent and emit a [`LocalChange`] after commit;
//! - internal writes (`raw_upsert*`, `replace_all`, `import_backup`), which
//!   store records verbatim and stay silent.

pub use changes::{ChangeReceiver, ChangeSender, LocalChange};
pub use error::EngineError;
pub use ops::{
    AccountInput, CcTransactionInput, CreditCardInput, Engine, EngineBuilder, RecurringInput,
    TransactionFilter, TransactionInput,
};
pub use processor::{RecurringProcessor, ScanReport};
pub use recurring::next_date;
pub use recurring_history::RecurringExecution;
pub use schedule::PeriodicTask;

pub mod changes;

mod accounts;
mod cc_transactions;
mod credit_cards;
mod error;
mod ops;
mod processor;
mod recurring;
mod recurring_history;
mod schedule;
mod transactions;

type ResultEngine<T> = Result<T, EngineError>;
