//! Cash accounts.

use api_types::ledger::Account;
use sea_orm::entity::{ActiveValue, prelude::*};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub balance_minor: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Account> for ActiveModel {
    fn from(value: &Account) -> Self {
        Self {
            id: ActiveValue::Set(value.id.clone()),
            name: ActiveValue::Set(value.name.clone()),
            description: ActiveValue::Set(value.description.clone()),
            color: ActiveValue::Set(value.color.clone()),
            icon: ActiveValue::Set(value.icon.clone()),
            balance_minor: ActiveValue::Set(value.balance_minor),
            created_at: ActiveValue::Set(value.created_at),
            updated_at: ActiveValue::Set(value.updated_at),
        }
    }
}

impl From<Model> for Account {
    fn from(value: Model) -> Self {
        Self {
            id: value.id,
            name: value.name,
            description: value.description,
            color: value.color,
            icon: value.icon,
            balance_minor: value.balance_minor,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}
