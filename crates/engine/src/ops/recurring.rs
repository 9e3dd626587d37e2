use api_types::{
    ledger::{Frequency, RecurringRule, Transaction, TransactionType},
    wallet::EntityKind,
};
use chrono::NaiveDate;
use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    LocalChange, RecurringExecution, ResultEngine, recurring, recurring::next_date,
    recurring_history,
};

use super::{
    Engine, TransactionInput, new_id, normalize_optional_text, now, require_positive, with_tx,
};

/// User-provided fields of a recurring rule.
#[derive(Clone, Debug)]
pub struct RecurringInput {
    pub account_id: String,
    pub kind: TransactionType,
    pub amount_minor: i64,
    pub description: Option<String>,
    pub category: Option<String>,
    pub frequency: Frequency,
    pub next_date: NaiveDate,
}

fn into_rules(models: Vec<recurring::Model>) -> ResultEngine<Vec<RecurringRule>> {
    models.into_iter().map(RecurringRule::try_from).collect()
}

fn auto_description(description: Option<&str>) -> String {
    match description {
        Some(text) => format!("{text} (Auto)"),
        None => "(Auto)".to_string(),
    }
}

impl Engine {
    /// Create an active rule that has never run.
    pub async fn create_recurring(&self, input: RecurringInput) -> ResultEngine<RecurringRule> {
        require_positive(input.amount_minor, "recurring")?;
        let rule = with_tx!(self, |db_tx| {
            self.require_account(&db_tx, &input.account_id).await?;
            let at = now();
            let rule = RecurringRule {
                id: new_id(""),
                account_id: input.account_id,
                kind: input.kind,
                amount_minor: input.amount_minor,
                description: normalize_optional_text(input.description.as_deref()),
                category: normalize_optional_text(input.category.as_deref()),
                frequency: input.frequency,
                next_date: input.next_date,
                is_active: true,
                last_executed: None,
                created_at: at,
                updated_at: at,
            };
            recurring::ActiveModel::from(&rule).insert(&db_tx).await?;
            Ok(rule)
        })?;

        self.notify([LocalChange::upserted(EntityKind::RecurringRule, &rule.id)]);
        Ok(rule)
    }

    /// All rules ordered by their next execution.
    pub async fn recurring_rules(&self) -> ResultEngine<Vec<RecurringRule>> {
        let models = recurring::Entity::find()
            .order_by_asc(recurring::Column::NextDate)
            .all(&self.database)
            .await?;
        into_rules(models)
    }

    pub async fn active_recurring_rules(&self) -> ResultEngine<Vec<RecurringRule>> {
        let models = recurring::Entity::find()
            .filter(recurring::Column::IsActive.eq(true))
            .order_by_asc(recurring::Column::NextDate)
            .all(&self.database)
            .await?;
        into_rules(models)
    }

    /// Active rules whose next execution is on or before `today`.
    pub async fn due_recurring_rules(&self, today: NaiveDate) -> ResultEngine<Vec<RecurringRule>> {
        let models = recurring::Entity::find()
            .filter(recurring::Column::IsActive.eq(true))
            .filter(recurring::Column::NextDate.lte(today))
            .order_by_asc(recurring::Column::NextDate)
            .all(&self.database)
            .await?;
        into_rules(models)
    }

    pub async fn recurring_rule(&self, id: &str) -> ResultEngine<RecurringRule> {
        let model = self.require_recurring(&self.database, id).await?;
        RecurringRule::try_from(model)
    }

    /// Replace the schedule and template of a rule. Its activity flag and
    /// execution record are kept.
    pub async fn update_recurring(
        &self,
        id: &str,
        input: RecurringInput,
    ) -> ResultEngine<RecurringRule> {
        require_positive(input.amount_minor, "recurring")?;
        let rule = with_tx!(self, |db_tx| {
            let old = self.require_recurring(&db_tx, id).await?;
            self.require_account(&db_tx, &input.account_id).await?;
            let rule = RecurringRule {
                id: old.id,
                account_id: input.account_id,
                kind: input.kind,
                amount_minor: input.amount_minor,
                description: normalize_optional_text(input.description.as_deref()),
                category: normalize_optional_text(input.category.as_deref()),
                frequency: input.frequency,
                next_date: input.next_date,
                is_active: old.is_active,
                last_executed: old.last_executed,
                created_at: old.created_at,
                updated_at: now(),
            };
            recurring::ActiveModel::from(&rule).update(&db_tx).await?;
            Ok(rule)
        })?;

        self.notify([LocalChange::upserted(EntityKind::RecurringRule, &rule.id)]);
        Ok(rule)
    }

    /// Flip a rule between active and paused.
    pub async fn toggle_recurring(&self, id: &str) -> ResultEngine<RecurringRule> {
        let rule = with_tx!(self, |db_tx| {
            let model = self.require_recurring(&db_tx, id).await?;
            let is_active = !model.is_active;
            let mut active: recurring::ActiveModel = model.into();
            active.is_active = ActiveValue::Set(is_active);
            active.updated_at = ActiveValue::Set(now());
            let model = active.update(&db_tx).await?;
            RecurringRule::try_from(model)
        })?;

        self.notify([LocalChange::upserted(EntityKind::RecurringRule, &rule.id)]);
        Ok(rule)
    }

    /// Delete a rule and its local execution history. Transactions it
    /// produced are kept.
    pub async fn delete_recurring(&self, id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            self.require_recurring(&db_tx, id).await?;
            recurring_history::Entity::delete_many()
                .filter(recurring_history::Column::RecurringId.eq(id))
                .exec(&db_tx)
                .await?;
            recurring::Entity::delete_by_id(id.to_string())
                .exec(&db_tx)
                .await?;
            Ok(())
        })?;

        self.notify([LocalChange::deleted(EntityKind::RecurringRule, id)]);
        Ok(())
    }

    /// Executions of a rule, most recent first.
    pub async fn recurring_history(&self, recurring_id: &str) -> ResultEngine<Vec<RecurringExecution>> {
        let models = recurring_history::Entity::find()
            .filter(recurring_history::Column::RecurringId.eq(recurring_id))
            .order_by_desc(recurring_history::Column::ExecutedAt)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(RecurringExecution::from).collect())
    }

    /// Materialize one occurrence of a due rule dated `today`, then advance
    /// the rule by exactly one period.
    ///
    /// Returns `None` when the rule is paused or not due anymore.
    pub async fn execute_recurring(
        &self,
        id: &str,
        today: NaiveDate,
    ) -> ResultEngine<Option<Transaction>> {
        let executed = with_tx!(self, |db_tx| {
            let rule = RecurringRule::try_from(self.require_recurring(&db_tx, id).await?)?;
            if !rule.is_active || rule.next_date > today {
                return Ok(None);
            }
            let at = now();

            let input = TransactionInput {
                account_id: rule.account_id.clone(),
                kind: rule.kind,
                amount_minor: rule.amount_minor,
                description: Some(auto_description(rule.description.as_deref())),
                category: rule.category.clone(),
                date: today,
                notes: None,
            };
            let tx = self
                .insert_transaction(&db_tx, input, Some(rule.id.clone()), at)
                .await?;

            let advanced = RecurringRule {
                next_date: next_date(rule.frequency, rule.next_date)?,
                last_executed: Some(at),
                updated_at: at,
                ..rule
            };
            recurring::ActiveModel::from(&advanced)
                .update(&db_tx)
                .await?;

            let execution = RecurringExecution {
                id: new_id(""),
                recurring_id: advanced.id.clone(),
                transaction_id: tx.id.clone(),
                executed_at: at,
                amount_minor: tx.amount_minor,
            };
            recurring_history::ActiveModel::from(&execution)
                .insert(&db_tx)
                .await?;
            Ok(Some(tx))
        })?;

        if let Some(tx) = &executed {
            self.notify([
                LocalChange::upserted(EntityKind::Transaction, &tx.id),
                LocalChange::upserted(EntityKind::Account, &tx.account_id),
                LocalChange::upserted(EntityKind::RecurringRule, id),
            ]);
        }
        Ok(executed)
    }
}
