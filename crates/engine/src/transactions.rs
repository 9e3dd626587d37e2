//! Deposits and withdrawals against a cash account.
//!
//! A stored row does not carry its effect on the account balance: the
//! effect is applied by the user-write operations in `ops::transactions` and
//! never recomputed from the rows.

use api_types::ledger::{Transaction, TransactionType};
use sea_orm::entity::{ActiveValue, prelude::*};

use crate::{EngineError, ResultEngine};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub account_id: String,
    pub kind: String,
    pub amount_minor: i64,
    pub description: Option<String>,
    pub category: Option<String>,
    pub date: Date,
    pub notes: Option<String>,
    pub recurring_id: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Signed effect of this row on its account balance.
    pub(crate) fn balance_effect(&self) -> ResultEngine<i64> {
        Ok(parse_kind(&self.kind)?.signed(self.amount_minor))
    }
}

pub(crate) fn parse_kind(value: &str) -> ResultEngine<TransactionType> {
    TransactionType::try_from(value).map_err(EngineError::InvalidRecord)
}

impl From<&Transaction> for ActiveModel {
    fn from(value: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(value.id.clone()),
            account_id: ActiveValue::Set(value.account_id.clone()),
            kind: ActiveValue::Set(value.kind.as_str().to_string()),
            amount_minor: ActiveValue::Set(value.amount_minor),
            description: ActiveValue::Set(value.description.clone()),
            category: ActiveValue::Set(value.category.clone()),
            date: ActiveValue::Set(value.date),
            notes: ActiveValue::Set(value.notes.clone()),
            recurring_id: ActiveValue::Set(value.recurring_id.clone()),
            created_at: ActiveValue::Set(value.created_at),
            updated_at: ActiveValue::Set(value.updated_at),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(value: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            kind: parse_kind(&value.kind)?,
            id: value.id,
            account_id: value.account_id,
            amount_minor: value.amount_minor,
            description: value.description,
            category: value.category,
            date: value.date,
            notes: value.notes,
            recurring_id: value.recurring_id,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}
