use api_types::{ledger::CreditCard, wallet::EntityKind};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{EngineError, LocalChange, ResultEngine, cc_transactions, credit_cards};

use super::{Engine, new_id, normalize_optional_text, normalize_required_name, now, with_tx};

const DEFAULT_COLOR: &str = "#3b82f6";

/// Editable fields of a credit card.
#[derive(Clone, Debug, Default)]
pub struct CreditCardInput {
    pub name: String,
    /// Only the last four digits are kept.
    pub card_number: Option<String>,
    pub max_limit_minor: i64,
    pub billing_day: i32,
    pub color: Option<String>,
    pub notes: Option<String>,
}

struct CardFields {
    name: String,
    card_number: Option<String>,
    color: String,
    notes: Option<String>,
}

fn validate(input: &CreditCardInput) -> ResultEngine<CardFields> {
    if input.max_limit_minor < 0 {
        return Err(EngineError::InvalidAmount(
            "credit card limit must be >= 0".to_string(),
        ));
    }
    if !(1..=31).contains(&input.billing_day) {
        return Err(EngineError::InvalidAmount(format!(
            "billing day must be within 1..=31, got {}",
            input.billing_day
        )));
    }
    Ok(CardFields {
        name: normalize_required_name(&input.name, "credit card")?,
        card_number: last_four_digits(input.card_number.as_deref()),
        color: normalize_optional_text(input.color.as_deref())
            .unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        notes: normalize_optional_text(input.notes.as_deref()),
    })
}

fn last_four_digits(value: Option<&str>) -> Option<String> {
    let digits: Vec<char> = value?.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    Some(digits[digits.len().saturating_sub(4)..].iter().collect())
}

impl Engine {
    /// Create a card owing `opening_balance_minor`.
    pub async fn create_credit_card(
        &self,
        input: CreditCardInput,
        opening_balance_minor: i64,
    ) -> ResultEngine<CreditCard> {
        if opening_balance_minor < 0 {
            return Err(EngineError::InvalidAmount(
                "credit card balance must be >= 0".to_string(),
            ));
        }
        let fields = validate(&input)?;
        let at = now();
        let card = CreditCard {
            id: new_id("cc_"),
            name: fields.name,
            card_number: fields.card_number,
            max_limit_minor: input.max_limit_minor,
            current_balance_minor: opening_balance_minor,
            billing_day: input.billing_day,
            color: fields.color,
            notes: fields.notes,
            created_at: at,
            updated_at: at,
        };
        credit_cards::ActiveModel::from(&card)
            .insert(&self.database)
            .await?;

        self.notify([LocalChange::upserted(EntityKind::CreditCard, &card.id)]);
        Ok(card)
    }

    pub async fn credit_cards(&self) -> ResultEngine<Vec<CreditCard>> {
        let models = credit_cards::Entity::find()
            .order_by_asc(credit_cards::Column::CreatedAt)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(CreditCard::from).collect())
    }

    pub async fn credit_card(&self, id: &str) -> ResultEngine<CreditCard> {
        self.require_credit_card(&self.database, id)
            .await
            .map(CreditCard::from)
    }

    /// Update the descriptive fields. The balance is only moved by card
    /// transactions.
    pub async fn update_credit_card(
        &self,
        id: &str,
        input: CreditCardInput,
    ) -> ResultEngine<CreditCard> {
        let fields = validate(&input)?;
        let card = with_tx!(self, |db_tx| {
            let model = self.require_credit_card(&db_tx, id).await?;
            let mut active: credit_cards::ActiveModel = model.into();
            active.name = ActiveValue::Set(fields.name);
            active.card_number = ActiveValue::Set(fields.card_number);
            active.max_limit_minor = ActiveValue::Set(input.max_limit_minor);
            active.billing_day = ActiveValue::Set(input.billing_day);
            active.color = ActiveValue::Set(fields.color);
            active.notes = ActiveValue::Set(fields.notes);
            active.updated_at = ActiveValue::Set(now());
            let model = active.update(&db_tx).await?;
            Ok(CreditCard::from(model))
        })?;

        self.notify([LocalChange::upserted(EntityKind::CreditCard, &card.id)]);
        Ok(card)
    }

    /// Delete a card and its card transactions.
    pub async fn delete_credit_card(&self, id: &str) -> ResultEngine<()> {
        let removed = with_tx!(self, |db_tx| {
            self.require_credit_card(&db_tx, id).await?;
            let ids: Vec<String> = cc_transactions::Entity::find()
                .filter(cc_transactions::Column::CreditCardId.eq(id))
                .all(&db_tx)
                .await?
                .into_iter()
                .map(|model| model.id)
                .collect();
            cc_transactions::Entity::delete_many()
                .filter(cc_transactions::Column::CreditCardId.eq(id))
                .exec(&db_tx)
                .await?;
            credit_cards::Entity::delete_by_id(id.to_string())
                .exec(&db_tx)
                .await?;
            Ok(ids)
        })?;

        self.notify(
            removed
                .into_iter()
                .map(|cc_id| LocalChange::deleted(EntityKind::CcTransaction, cc_id))
                .chain([LocalChange::deleted(EntityKind::CreditCard, id)]),
        );
        Ok(())
    }

    /// Move the card balance by `delta_minor`, never below zero.
    ///
    /// Returns `false` when the card does not exist.
    pub(super) async fn adjust_card_balance<C: ConnectionTrait>(
        &self,
        db: &C,
        card_id: &str,
        delta_minor: i64,
        at: DateTime<Utc>,
    ) -> ResultEngine<bool> {
        let Some(model) = credit_cards::Entity::find_by_id(card_id.to_string())
            .one(db)
            .await?
        else {
            return Ok(false);
        };
        let balance_minor = (model.current_balance_minor + delta_minor).max(0);
        let mut active: credit_cards::ActiveModel = model.into();
        active.current_balance_minor = ActiveValue::Set(balance_minor);
        active.updated_at = ActiveValue::Set(at);
        active.update(db).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_last_four_digits() {
        assert_eq!(
            last_four_digits(Some("4111 1111 1111 1234")).as_deref(),
            Some("1234")
        );
        assert_eq!(last_four_digits(Some("12")).as_deref(), Some("12"));
        assert_eq!(last_four_digits(Some("  ")), None);
        assert_eq!(last_four_digits(None), None);
    }

    #[test]
    fn billing_day_is_bounded() {
        let input = CreditCardInput {
            name: "Visa".to_string(),
            billing_day: 32,
            ..Default::default()
        };
        assert!(matches!(validate(&input), Err(EngineError::InvalidAmount(_))));
    }
}
