use sea_orm::{ConnectionTrait, prelude::*};

use crate::{EngineError, ResultEngine, accounts, cc_transactions, credit_cards, recurring, transactions};

use super::Engine;

/// Generates a `require_*` lookup returning the model or `KeyNotFound`.
macro_rules! impl_require {
    ($require_fn:ident, $entity:path, $model:path, $label:literal) => {
        pub(super) async fn $require_fn<C: ConnectionTrait>(
            &self,
            db: &C,
            id: &str,
        ) -> ResultEngine<$model> {
            <$entity>::find_by_id(id.to_string())
                .one(db)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound(format!("{} {id}", $label)))
        }
    };
}

impl Engine {
    impl_require!(
        require_account,
        accounts::Entity,
        accounts::Model,
        "account"
    );

    impl_require!(
        require_transaction,
        transactions::Entity,
        transactions::Model,
        "transaction"
    );

    impl_require!(
        require_recurring,
        recurring::Entity,
        recurring::Model,
        "recurring rule"
    );

    impl_require!(
        require_credit_card,
        credit_cards::Entity,
        credit_cards::Model,
        "credit card"
    );

    impl_require!(
        require_cc_transaction,
        cc_transactions::Entity,
        cc_transactions::Model,
        "credit card transaction"
    );
}
