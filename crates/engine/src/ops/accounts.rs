use api_types::{ledger::Account, wallet::EntityKind};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{LocalChange, ResultEngine, accounts, transactions};

use super::{Engine, new_id, normalize_optional_text, normalize_required_name, now, with_tx};

/// Editable fields of an account.
#[derive(Clone, Debug, Default)]
pub struct AccountInput {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

impl Engine {
    /// Create an account holding `initial_balance_minor`.
    pub async fn create_account(
        &self,
        input: AccountInput,
        initial_balance_minor: i64,
    ) -> ResultEngine<Account> {
        let at = now();
        let account = Account {
            id: new_id(""),
            name: normalize_required_name(&input.name, "account")?,
            description: normalize_optional_text(input.description.as_deref()),
            color: normalize_optional_text(input.color.as_deref()),
            icon: normalize_optional_text(input.icon.as_deref()),
            balance_minor: initial_balance_minor,
            created_at: at,
            updated_at: at,
        };
        accounts::ActiveModel::from(&account)
            .insert(&self.database)
            .await?;

        self.notify([LocalChange::upserted(EntityKind::Account, &account.id)]);
        Ok(account)
    }

    /// All accounts, oldest first.
    pub async fn accounts(&self) -> ResultEngine<Vec<Account>> {
        let models = accounts::Entity::find()
            .order_by_asc(accounts::Column::CreatedAt)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Account::from).collect())
    }

    pub async fn account(&self, id: &str) -> ResultEngine<Account> {
        self.require_account(&self.database, id)
            .await
            .map(Account::from)
    }

    /// Update the descriptive fields. The balance is only moved by
    /// transactions.
    pub async fn update_account(&self, id: &str, input: AccountInput) -> ResultEngine<Account> {
        let name = normalize_required_name(&input.name, "account")?;
        let account = with_tx!(self, |db_tx| {
            let model = self.require_account(&db_tx, id).await?;
            let mut active: accounts::ActiveModel = model.into();
            active.name = ActiveValue::Set(name);
            active.description =
                ActiveValue::Set(normalize_optional_text(input.description.as_deref()));
            active.color = ActiveValue::Set(normalize_optional_text(input.color.as_deref()));
            active.icon = ActiveValue::Set(normalize_optional_text(input.icon.as_deref()));
            active.updated_at = ActiveValue::Set(now());
            let model = active.update(&db_tx).await?;
            Ok(Account::from(model))
        })?;

        self.notify([LocalChange::upserted(EntityKind::Account, &account.id)]);
        Ok(account)
    }

    /// Delete an account together with its transactions.
    pub async fn delete_account(&self, id: &str) -> ResultEngine<()> {
        let removed = with_tx!(self, |db_tx| {
            self.require_account(&db_tx, id).await?;

            let transaction_ids: Vec<String> = transactions::Entity::find()
                .filter(transactions::Column::AccountId.eq(id))
                .all(&db_tx)
                .await?
                .into_iter()
                .map(|model| model.id)
                .collect();
            transactions::Entity::delete_many()
                .filter(transactions::Column::AccountId.eq(id))
                .exec(&db_tx)
                .await?;
            accounts::Entity::delete_by_id(id.to_string())
                .exec(&db_tx)
                .await?;
            Ok(transaction_ids)
        })?;

        self.notify(
            removed
                .into_iter()
                .map(|tx_id| LocalChange::deleted(EntityKind::Transaction, tx_id))
                .chain([LocalChange::deleted(EntityKind::Account, id)]),
        );
        Ok(())
    }

    /// Move the cached balance by `delta_minor` and refresh `updated_at`.
    ///
    /// Returns `false` when the account does not exist.
    pub(super) async fn adjust_account_balance<C: ConnectionTrait>(
        &self,
        db: &C,
        account_id: &str,
        delta_minor: i64,
        at: DateTime<Utc>,
    ) -> ResultEngine<bool> {
        let Some(model) = accounts::Entity::find_by_id(account_id.to_string())
            .one(db)
            .await?
        else {
            return Ok(false);
        };
        let balance_minor = model.balance_minor + delta_minor;
        let mut active: accounts::ActiveModel = model.into();
        active.balance_minor = ActiveValue::Set(balance_minor);
        active.updated_at = ActiveValue::Set(at);
        active.update(db).await?;
        Ok(true)
    }
}
