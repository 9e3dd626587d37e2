//! Recurring rules and their schedule arithmetic.

use api_types::ledger::{Frequency, RecurringRule};
use chrono::{Days, Months, NaiveDate};
use sea_orm::entity::{ActiveValue, prelude::*};

use crate::{EngineError, ResultEngine, transactions::parse_kind};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "recurring_rules")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub account_id: String,
    pub kind: String,
    pub amount_minor: i64,
    pub description: Option<String>,
    pub category: Option<String>,
    pub frequency: String,
    pub next_date: Date,
    pub is_active: bool,
    pub last_executed: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Date of the execution following `date`.
///
/// Calendar steps clamp to the last day of the target month, so a rule on
/// Jan 31 runs next on Feb 28/29.
pub fn next_date(frequency: Frequency, date: NaiveDate) -> ResultEngine<NaiveDate> {
    let next = match frequency {
        Frequency::Daily => date.checked_add_days(Days::new(1)),
        Frequency::Weekly => date.checked_add_days(Days::new(7)),
        Frequency::Biweekly => date.checked_add_days(Days::new(14)),
        Frequency::Monthly => date.checked_add_months(Months::new(1)),
        Frequency::Quarterly => date.checked_add_months(Months::new(3)),
        Frequency::Yearly => date.checked_add_months(Months::new(12)),
    };
    next.ok_or_else(|| EngineError::InvalidRecord(format!("date out of range after {date}")))
}

pub(crate) fn parse_frequency(value: &str) -> ResultEngine<Frequency> {
    Frequency::try_from(value).map_err(EngineError::InvalidRecord)
}

impl From<&RecurringRule> for ActiveModel {
    fn from(value: &RecurringRule) -> Self {
        Self {
            id: ActiveValue::Set(value.id.clone()),
            account_id: ActiveValue::Set(value.account_id.clone()),
            kind: ActiveValue::Set(value.kind.as_str().to_string()),
            amount_minor: ActiveValue::Set(value.amount_minor),
            description: ActiveValue::Set(value.description.clone()),
            category: ActiveValue::Set(value.category.clone()),
            frequency: ActiveValue::Set(value.frequency.as_str().to_string()),
            next_date: ActiveValue::Set(value.next_date),
            is_active: ActiveValue::Set(value.is_active),
            last_executed: ActiveValue::Set(value.last_executed),
            created_at: ActiveValue::Set(value.created_at),
            updated_at: ActiveValue::Set(value.updated_at),
        }
    }
}

impl TryFrom<Model> for RecurringRule {
    type Error = EngineError;

    fn try_from(value: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            kind: parse_kind(&value.kind)?,
            frequency: parse_frequency(&value.frequency)?,
            id: value.id,
            account_id: value.account_id,
            amount_minor: value.amount_minor,
            description: value.description,
            category: value.category,
            next_date: value.next_date,
            is_active: value.is_active,
            last_executed: value.last_executed,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}
