//! Credit card charges and payments.

use api_types::ledger::{CcTransaction, CcTransactionType};
use sea_orm::entity::{ActiveValue, prelude::*};

use crate::{EngineError, ResultEngine};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "cc_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub credit_card_id: String,
    pub kind: String,
    pub amount_minor: i64,
    pub description: Option<String>,
    pub category: String,
    pub date: Date,
    pub account_id: Option<String>,
    pub linked_transaction_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub(crate) fn parse_kind(value: &str) -> ResultEngine<CcTransactionType> {
    CcTransactionType::try_from(value).map_err(EngineError::InvalidRecord)
}

impl From<&CcTransaction> for ActiveModel {
    fn from(value: &CcTransaction) -> Self {
        Self {
            id: ActiveValue::Set(value.id.clone()),
            credit_card_id: ActiveValue::Set(value.credit_card_id.clone()),
            kind: ActiveValue::Set(value.kind.as_str().to_string()),
            amount_minor: ActiveValue::Set(value.amount_minor),
            description: ActiveValue::Set(value.description.clone()),
            category: ActiveValue::Set(value.category.clone()),
            date: ActiveValue::Set(value.date),
            account_id: ActiveValue::Set(value.account_id.clone()),
            linked_transaction_id: ActiveValue::Set(value.linked_transaction_id.clone()),
            notes: ActiveValue::Set(value.notes.clone()),
            created_at: ActiveValue::Set(value.created_at),
            updated_at: ActiveValue::Set(value.updated_at),
        }
    }
}

impl TryFrom<Model> for CcTransaction {
    type Error = EngineError;

    fn try_from(value: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            kind: parse_kind(&value.kind)?,
            id: value.id,
            credit_card_id: value.credit_card_id,
            amount_minor: value.amount_minor,
            description: value.description,
            category: value.category,
            date: value.date,
            account_id: value.account_id,
            linked_transaction_id: value.linked_transaction_id,
            notes: value.notes,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}
