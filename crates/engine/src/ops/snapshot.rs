//! Internal write path: whole-ledger reads, verbatim upserts, snapshot
//! replacement and backups.
//!
//! Nothing here touches cached balances or links, and nothing here emits a
//! [`LocalChange`] except backup import, which is a user action.

use std::collections::HashSet;

use api_types::{
    SyncRecord,
    backup::{BACKUP_VERSION, Backup, ImportMode},
    ledger::{Account, CcTransaction, CreditCard, RecurringRule, Transaction},
    wallet::{Snapshot, SnapshotRecord},
};
use sea_orm::{ConnectionTrait, QueryOrder, TransactionTrait, prelude::*};
use tracing::info;

use crate::{
    EngineError, LocalChange, ResultEngine, accounts, cc_transactions, credit_cards, recurring,
    recurring_history, transactions,
};

use super::{Engine, now, with_tx};

/// Insert `$record` or overwrite the row with the same id.
macro_rules! upsert_record {
    ($db:expr, $module:ident, $record:expr) => {{
        let active: $module::ActiveModel = $record.into();
        if $module::Entity::find_by_id($record.id.clone())
            .one($db)
            .await?
            .is_some()
        {
            active.update($db).await?;
        } else {
            active.insert($db).await?;
        }
    }};
}

/// Generates a public `raw_upsert_*` method for one entity.
macro_rules! impl_raw_upsert {
    ($fn_name:ident, $record:ty, $module:ident) => {
        /// Store the record verbatim: no balance effect, no notification.
        pub async fn $fn_name(&self, record: &$record) -> ResultEngine<()> {
            upsert_record!(&self.database, $module, record);
            Ok(())
        }
    };
}

async fn upsert<C: ConnectionTrait>(db: &C, record: &SnapshotRecord) -> ResultEngine<()> {
    match record {
        SnapshotRecord::Account(r) => upsert_record!(db, accounts, r),
        SnapshotRecord::Transaction(r) => upsert_record!(db, transactions, r),
        SnapshotRecord::RecurringRule(r) => upsert_record!(db, recurring, r),
        SnapshotRecord::CreditCard(r) => upsert_record!(db, credit_cards, r),
        SnapshotRecord::CcTransaction(r) => upsert_record!(db, cc_transactions, r),
    }
    Ok(())
}

async fn clear<C: ConnectionTrait>(db: &C) -> ResultEngine<()> {
    cc_transactions::Entity::delete_many().exec(db).await?;
    credit_cards::Entity::delete_many().exec(db).await?;
    recurring_history::Entity::delete_many().exec(db).await?;
    recurring::Entity::delete_many().exec(db).await?;
    transactions::Entity::delete_many().exec(db).await?;
    accounts::Entity::delete_many().exec(db).await?;
    Ok(())
}

impl Engine {
    /// Every synchronized collection as stored right now.
    pub async fn snapshot(&self) -> ResultEngine<Snapshot> {
        let db = &self.database;
        let accounts = accounts::Entity::find()
            .order_by_asc(accounts::Column::CreatedAt)
            .all(db)
            .await?
            .into_iter()
            .map(Account::from)
            .collect();
        let transactions = transactions::Entity::find()
            .order_by_asc(transactions::Column::CreatedAt)
            .all(db)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect::<ResultEngine<_>>()?;
        let recurring = recurring::Entity::find()
            .order_by_asc(recurring::Column::CreatedAt)
            .all(db)
            .await?
            .into_iter()
            .map(RecurringRule::try_from)
            .collect::<ResultEngine<_>>()?;
        let credit_cards = credit_cards::Entity::find()
            .order_by_asc(credit_cards::Column::CreatedAt)
            .all(db)
            .await?
            .into_iter()
            .map(CreditCard::from)
            .collect();
        let cc_transactions = cc_transactions::Entity::find()
            .order_by_asc(cc_transactions::Column::CreatedAt)
            .all(db)
            .await?
            .into_iter()
            .map(CcTransaction::try_from)
            .collect::<ResultEngine<_>>()?;

        Ok(Snapshot {
            accounts,
            transactions,
            recurring,
            credit_cards,
            cc_transactions,
            created_at: None,
            updated_at: None,
        })
    }

    /// The stored record of the same kind and id as `record`, if any.
    pub async fn find_record(&self, record: &SnapshotRecord) -> ResultEngine<Option<SnapshotRecord>> {
        let db = &self.database;
        let id = record.id().to_string();
        let found = match record {
            SnapshotRecord::Account(_) => accounts::Entity::find_by_id(id)
                .one(db)
                .await?
                .map(|m| SnapshotRecord::Account(m.into())),
            SnapshotRecord::Transaction(_) => transactions::Entity::find_by_id(id)
                .one(db)
                .await?
                .map(Transaction::try_from)
                .transpose()?
                .map(SnapshotRecord::Transaction),
            SnapshotRecord::RecurringRule(_) => recurring::Entity::find_by_id(id)
                .one(db)
                .await?
                .map(RecurringRule::try_from)
                .transpose()?
                .map(SnapshotRecord::RecurringRule),
            SnapshotRecord::CreditCard(_) => credit_cards::Entity::find_by_id(id)
                .one(db)
                .await?
                .map(|m| SnapshotRecord::CreditCard(m.into())),
            SnapshotRecord::CcTransaction(_) => cc_transactions::Entity::find_by_id(id)
                .one(db)
                .await?
                .map(CcTransaction::try_from)
                .transpose()?
                .map(SnapshotRecord::CcTransaction),
        };
        Ok(found)
    }

    impl_raw_upsert!(raw_upsert_account, Account, accounts);
    impl_raw_upsert!(raw_upsert_transaction, Transaction, transactions);
    impl_raw_upsert!(raw_upsert_recurring, RecurringRule, recurring);
    impl_raw_upsert!(raw_upsert_credit_card, CreditCard, credit_cards);
    impl_raw_upsert!(raw_upsert_cc_transaction, CcTransaction, cc_transactions);

    /// Store any record verbatim: no balance effect, no notification.
    pub async fn raw_upsert(&self, record: &SnapshotRecord) -> ResultEngine<()> {
        upsert(&self.database, record).await
    }

    /// Drop the whole local ledger and store `snapshot` verbatim, in one
    /// database transaction.
    pub async fn replace_all(&self, snapshot: &Snapshot) -> ResultEngine<()> {
        let records = snapshot.clone().into_records();
        let count = records.len();
        with_tx!(self, |db_tx| {
            clear(&db_tx).await?;
            for record in &records {
                upsert(&db_tx, record).await?;
            }
            Ok(())
        })?;
        info!(records = count, "local ledger replaced");
        Ok(())
    }

    /// Drop the whole local ledger, execution history included.
    pub async fn clear_all(&self) -> ResultEngine<()> {
        with_tx!(self, |db_tx| clear(&db_tx).await)
    }

    pub async fn export_backup(&self) -> ResultEngine<Backup> {
        Ok(Backup {
            version: BACKUP_VERSION,
            export_date: now(),
            snapshot: self.snapshot().await?,
        })
    }

    /// Load a backup.
    ///
    /// `Replace` drops the ledger first; `Merge` only adds records whose id
    /// is unknown locally. Balances are taken as exported. Returns the number
    /// of records written.
    pub async fn import_backup(&self, backup: &Backup, mode: ImportMode) -> ResultEngine<usize> {
        if backup.version != BACKUP_VERSION {
            return Err(EngineError::InvalidRecord(format!(
                "unsupported backup version {}",
                backup.version
            )));
        }
        let records = backup.snapshot.clone().into_records();

        let written = with_tx!(self, |db_tx| {
            let mut written = 0;
            match mode {
                ImportMode::Replace => {
                    clear(&db_tx).await?;
                    for record in &records {
                        upsert(&db_tx, record).await?;
                        written += 1;
                    }
                }
                ImportMode::Merge => {
                    let mut seen = HashSet::new();
                    for record in &records {
                        if !seen.insert((record.kind(), record.id().to_string())) {
                            continue;
                        }
                        if self.find_record_in(&db_tx, record).await? {
                            continue;
                        }
                        upsert(&db_tx, record).await?;
                        written += 1;
                    }
                }
            }
            Ok(written)
        })?;

        info!(?mode, records = written, exported = %backup.export_date, "backup imported");
        self.notify([LocalChange::Imported { records: written }]);
        Ok(written)
    }

    async fn find_record_in<C: ConnectionTrait>(
        &self,
        db: &C,
        record: &SnapshotRecord,
    ) -> ResultEngine<bool> {
        let id = record.id().to_string();
        let exists = match record {
            SnapshotRecord::Account(_) => accounts::Entity::find_by_id(id).one(db).await?.is_some(),
            SnapshotRecord::Transaction(_) => {
                transactions::Entity::find_by_id(id).one(db).await?.is_some()
            }
            SnapshotRecord::RecurringRule(_) => {
                recurring::Entity::find_by_id(id).one(db).await?.is_some()
            }
            SnapshotRecord::CreditCard(_) => {
                credit_cards::Entity::find_by_id(id).one(db).await?.is_some()
            }
            SnapshotRecord::CcTransaction(_) => {
                cc_transactions::Entity::find_by_id(id).one(db).await?.is_some()
            }
        };
        Ok(exists)
    }
}
