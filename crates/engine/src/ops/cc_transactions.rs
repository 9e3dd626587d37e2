use api_types::{
    ledger::{CcTransaction, CcTransactionType, TransactionType},
    wallet::EntityKind,
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use tracing::warn;

use crate::{LocalChange, ResultEngine, accounts, cc_transactions, transactions};

use super::{
    Engine, TransactionInput, new_id, normalize_optional_text, now, require_positive, with_tx,
};

const DEFAULT_CATEGORY: &str = "Other";
const PAYMENT_CATEGORY: &str = "Credit Card Payment";

/// User-provided fields of a card transaction.
///
/// A `Payment` with an `account_id` withdraws the same amount from that
/// account through a linked transaction.
#[derive(Clone, Debug)]
pub struct CcTransactionInput {
    pub credit_card_id: String,
    pub kind: CcTransactionType,
    pub amount_minor: i64,
    pub description: Option<String>,
    pub category: Option<String>,
    pub date: NaiveDate,
    pub account_id: Option<String>,
    pub notes: Option<String>,
}

fn into_cc_transactions(models: Vec<cc_transactions::Model>) -> ResultEngine<Vec<CcTransaction>> {
    models.into_iter().map(CcTransaction::try_from).collect()
}

impl Engine {
    /// Record a charge or a payment on a card.
    ///
    /// A payment from an unknown account is still recorded, unlinked.
    pub async fn create_cc_transaction(
        &self,
        input: CcTransactionInput,
    ) -> ResultEngine<CcTransaction> {
        require_positive(input.amount_minor, "credit card transaction")?;
        let mut changes = Vec::new();
        let cc = with_tx!(self, |db_tx| {
            let card = self.require_credit_card(&db_tx, &input.credit_card_id).await?;
            let at = now();
            let mut cc = CcTransaction {
                id: new_id("cctxn_"),
                credit_card_id: input.credit_card_id,
                kind: input.kind,
                amount_minor: input.amount_minor,
                description: normalize_optional_text(input.description.as_deref()),
                category: normalize_optional_text(input.category.as_deref())
                    .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
                date: input.date,
                account_id: normalize_optional_text(input.account_id.as_deref()),
                linked_transaction_id: None,
                notes: normalize_optional_text(input.notes.as_deref()),
                created_at: at,
                updated_at: None,
            };

            self.adjust_card_balance(&db_tx, &cc.credit_card_id, cc.kind.signed(cc.amount_minor), at)
                .await?;
            self.link_payment(&db_tx, &mut cc, &card.name, at, &mut changes)
                .await?;
            cc_transactions::ActiveModel::from(&cc).insert(&db_tx).await?;
            Ok(cc)
        })?;

        changes.push(LocalChange::upserted(EntityKind::CreditCard, &cc.credit_card_id));
        changes.push(LocalChange::upserted(EntityKind::CcTransaction, &cc.id));
        self.notify(changes);
        Ok(cc)
    }

    /// All card transactions, newest date first.
    pub async fn cc_transactions(&self) -> ResultEngine<Vec<CcTransaction>> {
        let models = cc_transactions::Entity::find()
            .order_by_desc(cc_transactions::Column::Date)
            .order_by_desc(cc_transactions::Column::CreatedAt)
            .all(&self.database)
            .await?;
        into_cc_transactions(models)
    }

    pub async fn card_transactions(&self, credit_card_id: &str) -> ResultEngine<Vec<CcTransaction>> {
        let models = cc_transactions::Entity::find()
            .filter(cc_transactions::Column::CreditCardId.eq(credit_card_id))
            .order_by_desc(cc_transactions::Column::Date)
            .order_by_desc(cc_transactions::Column::CreatedAt)
            .all(&self.database)
            .await?;
        into_cc_transactions(models)
    }

    pub async fn cc_transaction(&self, id: &str) -> ResultEngine<CcTransaction> {
        let model = self.require_cc_transaction(&self.database, id).await?;
        CcTransaction::try_from(model)
    }

    /// Replace a card transaction.
    ///
    /// Everything the old version did is undone first (card balance, linked
    /// withdrawal), then the new version is applied as if freshly created.
    pub async fn update_cc_transaction(
        &self,
        id: &str,
        input: CcTransactionInput,
    ) -> ResultEngine<CcTransaction> {
        require_positive(input.amount_minor, "credit card transaction")?;
        let mut changes = Vec::new();
        let (cc, old_card_id) = with_tx!(self, |db_tx| {
            let old = CcTransaction::try_from(self.require_cc_transaction(&db_tx, id).await?)?;
            let card = self.require_credit_card(&db_tx, &input.credit_card_id).await?;
            let at = now();

            if !self
                .adjust_card_balance(&db_tx, &old.credit_card_id, -old.kind.signed(old.amount_minor), at)
                .await?
            {
                warn!(cc_transaction_id = %old.id, credit_card_id = %old.credit_card_id, "card missing, nothing to reverse");
            }
            self.unlink_payment(&db_tx, &old, at, &mut changes).await?;

            let mut cc = CcTransaction {
                id: old.id,
                credit_card_id: input.credit_card_id,
                kind: input.kind,
                amount_minor: input.amount_minor,
                description: normalize_optional_text(input.description.as_deref()),
                category: normalize_optional_text(input.category.as_deref())
                    .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
                date: input.date,
                account_id: normalize_optional_text(input.account_id.as_deref()),
                linked_transaction_id: None,
                notes: normalize_optional_text(input.notes.as_deref()),
                created_at: old.created_at,
                updated_at: Some(at),
            };
            self.adjust_card_balance(&db_tx, &cc.credit_card_id, cc.kind.signed(cc.amount_minor), at)
                .await?;
            self.link_payment(&db_tx, &mut cc, &card.name, at, &mut changes)
                .await?;
            cc_transactions::ActiveModel::from(&cc).update(&db_tx).await?;
            Ok((cc, old.credit_card_id))
        })?;

        if old_card_id != cc.credit_card_id {
            changes.push(LocalChange::upserted(EntityKind::CreditCard, old_card_id));
        }
        changes.push(LocalChange::upserted(EntityKind::CreditCard, &cc.credit_card_id));
        changes.push(LocalChange::upserted(EntityKind::CcTransaction, &cc.id));
        self.notify(changes);
        Ok(cc)
    }

    /// Delete a card transaction, its linked withdrawal and its effect on
    /// the card balance.
    pub async fn delete_cc_transaction(&self, id: &str) -> ResultEngine<()> {
        let mut changes = Vec::new();
        let card_id = with_tx!(self, |db_tx| {
            let cc = CcTransaction::try_from(self.require_cc_transaction(&db_tx, id).await?)?;
            let at = now();
            self.unlink_payment(&db_tx, &cc, at, &mut changes).await?;
            if !self
                .adjust_card_balance(&db_tx, &cc.credit_card_id, -cc.kind.signed(cc.amount_minor), at)
                .await?
            {
                warn!(cc_transaction_id = %cc.id, credit_card_id = %cc.credit_card_id, "card missing, nothing to reverse");
            }
            cc_transactions::Entity::delete_by_id(cc.id.clone())
                .exec(&db_tx)
                .await?;
            Ok(cc.credit_card_id)
        })?;

        changes.push(LocalChange::upserted(EntityKind::CreditCard, card_id));
        changes.push(LocalChange::deleted(EntityKind::CcTransaction, id));
        self.notify(changes);
        Ok(())
    }

    /// Create the withdrawal backing a payment and link it.
    async fn link_payment<C: ConnectionTrait>(
        &self,
        db: &C,
        cc: &mut CcTransaction,
        card_name: &str,
        at: DateTime<Utc>,
        changes: &mut Vec<LocalChange>,
    ) -> ResultEngine<()> {
        let (CcTransactionType::Payment, Some(account_id)) = (cc.kind, cc.account_id.clone())
        else {
            return Ok(());
        };
        if accounts::Entity::find_by_id(account_id.clone())
            .one(db)
            .await?
            .is_none()
        {
            warn!(cc_transaction_id = %cc.id, %account_id, "account not found for payment, keeping it unlinked");
            return Ok(());
        }

        let input = TransactionInput {
            account_id,
            kind: TransactionType::Withdraw,
            amount_minor: cc.amount_minor,
            description: Some(
                cc.description
                    .clone()
                    .unwrap_or_else(|| format!("{PAYMENT_CATEGORY} - {card_name}")),
            ),
            category: Some(PAYMENT_CATEGORY.to_string()),
            date: cc.date,
            notes: Some(
                cc.notes
                    .clone()
                    .unwrap_or_else(|| format!("Payment to {card_name}")),
            ),
        };
        let tx = self.insert_transaction(db, input, None, at).await?;
        changes.push(LocalChange::upserted(EntityKind::Transaction, &tx.id));
        changes.push(LocalChange::upserted(EntityKind::Account, &tx.account_id));
        cc.linked_transaction_id = Some(tx.id);
        Ok(())
    }

    /// Delete the withdrawal linked to `cc`, reversing its balance effect.
    async fn unlink_payment<C: ConnectionTrait>(
        &self,
        db: &C,
        cc: &CcTransaction,
        at: DateTime<Utc>,
        changes: &mut Vec<LocalChange>,
    ) -> ResultEngine<()> {
        let Some(linked_id) = &cc.linked_transaction_id else {
            return Ok(());
        };
        let Some(linked) = transactions::Entity::find_by_id(linked_id.clone())
            .one(db)
            .await?
        else {
            warn!(cc_transaction_id = %cc.id, %linked_id, "linked transaction already gone");
            return Ok(());
        };
        let account_id = linked.account_id.clone();
        self.remove_transaction(db, linked, at).await?;
        changes.push(LocalChange::deleted(EntityKind::Transaction, linked_id));
        changes.push(LocalChange::upserted(EntityKind::Account, account_id));
        Ok(())
    }
}
