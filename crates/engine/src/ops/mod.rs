use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use tracing::debug;

use crate::{ChangeSender, EngineError, LocalChange, ResultEngine};

mod access;
mod accounts;
mod cc_transactions;
mod credit_cards;
mod recurring;
mod snapshot;
mod transactions;

pub use accounts::AccountInput;
pub use cc_transactions::CcTransactionInput;
pub use credit_cards::CreditCardInput;
pub use recurring::RecurringInput;
pub use transactions::{TransactionFilter, TransactionInput};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result: crate::ResultEngine<_> = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    changes: Option<ChangeSender>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Publish committed user writes. A closed channel only means nobody
    /// listens anymore.
    fn notify(&self, changes: impl IntoIterator<Item = LocalChange>) {
        let Some(sender) = &self.changes else {
            return;
        };
        for change in changes {
            if sender.send(change).is_err() {
                debug!("change listener is gone, dropping notification");
                return;
            }
        }
    }
}

fn now() -> DateTime<Utc> {
    Utc::now()
}

fn new_id(prefix: &str) -> String {
    format!("{prefix}{}", uuid::Uuid::new_v4())
}

fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidAmount(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

fn require_positive(amount_minor: i64, label: &str) -> ResultEngine<()> {
    if amount_minor <= 0 {
        return Err(EngineError::InvalidAmount(format!(
            "{label} amount must be > 0"
        )));
    }
    Ok(())
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    changes: Option<ChangeSender>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Channel receiving a [`LocalChange`] after every committed user write.
    pub fn changes(mut self, sender: ChangeSender) -> EngineBuilder {
        self.changes = Some(sender);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            changes: self.changes,
        })
    }
}
