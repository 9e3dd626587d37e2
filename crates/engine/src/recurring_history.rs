//! Execution log of recurring rules. Local to the device, never synchronized.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::Serialize;

/// One materialization of a recurring rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringExecution {
    pub id: String,
    pub recurring_id: String,
    pub transaction_id: String,
    pub executed_at: DateTime<Utc>,
    pub amount_minor: i64,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "recurring_history")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub recurring_id: String,
    pub transaction_id: String,
    pub executed_at: DateTimeUtc,
    pub amount_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&RecurringExecution> for ActiveModel {
    fn from(value: &RecurringExecution) -> Self {
        Self {
            id: ActiveValue::Set(value.id.clone()),
            recurring_id: ActiveValue::Set(value.recurring_id.clone()),
            transaction_id: ActiveValue::Set(value.transaction_id.clone()),
            executed_at: ActiveValue::Set(value.executed_at),
            amount_minor: ActiveValue::Set(value.amount_minor),
        }
    }
}

impl From<Model> for RecurringExecution {
    fn from(value: Model) -> Self {
        Self {
            id: value.id,
            recurring_id: value.recurring_id,
            transaction_id: value.transaction_id,
            executed_at: value.executed_at,
            amount_minor: value.amount_minor,
        }
    }
}
