use api_types::{
    ledger::{Transaction, TransactionType},
    wallet::EntityKind,
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use tracing::warn;

use crate::{EngineError, LocalChange, ResultEngine, transactions};

use super::{Engine, new_id, normalize_optional_text, now, require_positive, with_tx};

/// User-provided fields of a transaction.
#[derive(Clone, Debug)]
pub struct TransactionInput {
    pub account_id: String,
    pub kind: TransactionType,
    pub amount_minor: i64,
    pub description: Option<String>,
    pub category: Option<String>,
    pub date: NaiveDate,
    pub notes: Option<String>,
}

/// Optional criteria for [`Engine::filter_transactions`]. Date bounds are
/// inclusive.
#[derive(Clone, Debug, Default)]
pub struct TransactionFilter {
    pub account_id: Option<String>,
    pub kind: Option<TransactionType>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

fn into_transactions(models: Vec<transactions::Model>) -> ResultEngine<Vec<Transaction>> {
    models.into_iter().map(Transaction::try_from).collect()
}

impl Engine {
    /// Record a transaction and apply it to the account balance.
    pub async fn create_transaction(&self, input: TransactionInput) -> ResultEngine<Transaction> {
        let tx = with_tx!(self, |db_tx| {
            self.insert_transaction(&db_tx, input, None, now()).await
        })?;

        self.notify([
            LocalChange::upserted(EntityKind::Transaction, &tx.id),
            LocalChange::upserted(EntityKind::Account, &tx.account_id),
        ]);
        Ok(tx)
    }

    /// All transactions, newest date first.
    pub async fn transactions(&self) -> ResultEngine<Vec<Transaction>> {
        self.filter_transactions(&TransactionFilter::default()).await
    }

    pub async fn account_transactions(&self, account_id: &str) -> ResultEngine<Vec<Transaction>> {
        self.filter_transactions(&TransactionFilter {
            account_id: Some(account_id.to_string()),
            ..Default::default()
        })
        .await
    }

    pub async fn transaction(&self, id: &str) -> ResultEngine<Transaction> {
        let model = self.require_transaction(&self.database, id).await?;
        Transaction::try_from(model)
    }

    pub async fn filter_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> ResultEngine<Vec<Transaction>> {
        let mut query = transactions::Entity::find();
        if let Some(account_id) = &filter.account_id {
            query = query.filter(transactions::Column::AccountId.eq(account_id.as_str()));
        }
        if let Some(kind) = filter.kind {
            query = query.filter(transactions::Column::Kind.eq(kind.as_str()));
        }
        if let Some(from) = filter.from {
            query = query.filter(transactions::Column::Date.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(transactions::Column::Date.lte(to));
        }
        let models = query
            .order_by_desc(transactions::Column::Date)
            .order_by_desc(transactions::Column::CreatedAt)
            .all(&self.database)
            .await?;
        into_transactions(models)
    }

    /// Replace the fields of a transaction.
    ///
    /// The old amount is reversed on the old account before the new one is
    /// applied, so moving a transaction between accounts keeps both balances
    /// right.
    pub async fn update_transaction(
        &self,
        id: &str,
        input: TransactionInput,
    ) -> ResultEngine<Transaction> {
        require_positive(input.amount_minor, "transaction")?;
        let (tx, old_account_id) = with_tx!(self, |db_tx| {
            let old = self.require_transaction(&db_tx, id).await?;
            self.require_account(&db_tx, &input.account_id).await?;
            let at = now();

            let old_effect = old.balance_effect()?;
            if !self
                .adjust_account_balance(&db_tx, &old.account_id, -old_effect, at)
                .await?
            {
                warn!(transaction_id = %old.id, account_id = %old.account_id, "account missing, nothing to reverse");
            }
            self.adjust_account_balance(
                &db_tx,
                &input.account_id,
                input.kind.signed(input.amount_minor),
                at,
            )
            .await?;

            let tx = Transaction {
                id: old.id.clone(),
                account_id: input.account_id,
                kind: input.kind,
                amount_minor: input.amount_minor,
                description: normalize_optional_text(input.description.as_deref()),
                category: normalize_optional_text(input.category.as_deref()),
                date: input.date,
                notes: normalize_optional_text(input.notes.as_deref()),
                recurring_id: old.recurring_id.clone(),
                created_at: old.created_at,
                updated_at: Some(at),
            };
            transactions::ActiveModel::from(&tx).update(&db_tx).await?;
            Ok((tx, old.account_id))
        })?;

        let mut changes = vec![
            LocalChange::upserted(EntityKind::Transaction, &tx.id),
            LocalChange::upserted(EntityKind::Account, &tx.account_id),
        ];
        if old_account_id != tx.account_id {
            changes.push(LocalChange::upserted(EntityKind::Account, old_account_id));
        }
        self.notify(changes);
        Ok(tx)
    }

    /// Delete a transaction and reverse its effect on the account.
    pub async fn delete_transaction(&self, id: &str) -> ResultEngine<()> {
        let account_id = with_tx!(self, |db_tx| {
            let model = self.require_transaction(&db_tx, id).await?;
            let account_id = model.account_id.clone();
            self.remove_transaction(&db_tx, model, now()).await?;
            Ok(account_id)
        })?;

        self.notify([
            LocalChange::deleted(EntityKind::Transaction, id),
            LocalChange::upserted(EntityKind::Account, account_id),
        ]);
        Ok(())
    }

    /// Insert a new transaction and move its account balance.
    pub(super) async fn insert_transaction<C: ConnectionTrait>(
        &self,
        db: &C,
        input: TransactionInput,
        recurring_id: Option<String>,
        at: DateTime<Utc>,
    ) -> ResultEngine<Transaction> {
        require_positive(input.amount_minor, "transaction")?;
        self.require_account(db, &input.account_id).await?;

        let tx = Transaction {
            id: new_id(""),
            account_id: input.account_id,
            kind: input.kind,
            amount_minor: input.amount_minor,
            description: normalize_optional_text(input.description.as_deref()),
            category: normalize_optional_text(input.category.as_deref()),
            date: input.date,
            notes: normalize_optional_text(input.notes.as_deref()),
            recurring_id,
            created_at: at,
            updated_at: None,
        };
        transactions::ActiveModel::from(&tx).insert(db).await?;
        self.adjust_account_balance(db, &tx.account_id, tx.kind.signed(tx.amount_minor), at)
            .await?;
        Ok(tx)
    }

    /// Delete a stored transaction, reversing its balance effect when the
    /// account still exists.
    pub(super) async fn remove_transaction<C: ConnectionTrait>(
        &self,
        db: &C,
        model: transactions::Model,
        at: DateTime<Utc>,
    ) -> ResultEngine<()> {
        match model.balance_effect() {
            Ok(effect) => {
                if !self
                    .adjust_account_balance(db, &model.account_id, -effect, at)
                    .await?
                {
                    warn!(transaction_id = %model.id, account_id = %model.account_id, "account missing, nothing to reverse");
                }
            }
            Err(EngineError::InvalidRecord(reason)) => {
                warn!(transaction_id = %model.id, %reason, "unreadable transaction, deleting without reversal");
            }
            Err(err) => return Err(err),
        }
        transactions::Entity::delete_by_id(model.id)
            .exec(db)
            .await?;
        Ok(())
    }
}
