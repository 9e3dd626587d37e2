//! Credit cards.

use api_types::ledger::CreditCard;
use sea_orm::entity::{ActiveValue, prelude::*};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "credit_cards")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub card_number: Option<String>,
    pub max_limit_minor: i64,
    pub current_balance_minor: i64,
    pub billing_day: i32,
    pub color: String,
    pub notes: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&CreditCard> for ActiveModel {
    fn from(value: &CreditCard) -> Self {
        Self {
            id: ActiveValue::Set(value.id.clone()),
            name: ActiveValue::Set(value.name.clone()),
            card_number: ActiveValue::Set(value.card_number.clone()),
            max_limit_minor: ActiveValue::Set(value.max_limit_minor),
            current_balance_minor: ActiveValue::Set(value.current_balance_minor),
            billing_day: ActiveValue::Set(value.billing_day),
            color: ActiveValue::Set(value.color.clone()),
            notes: ActiveValue::Set(value.notes.clone()),
            created_at: ActiveValue::Set(value.created_at),
            updated_at: ActiveValue::Set(value.updated_at),
        }
    }
}

impl From<Model> for CreditCard {
    fn from(value: Model) -> Self {
        Self {
            id: value.id,
            name: value.name,
            card_number: value.card_number,
            max_limit_minor: value.max_limit_minor,
            current_balance_minor: value.current_balance_minor,
            billing_day: value.billing_day,
            color: value.color,
            notes: value.notes,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}
