use api_types::{
    backup::ImportMode,
    ledger::{CcTransactionType, Frequency, TransactionType},
    wallet::{EntityKind, SnapshotRecord},
};
use chrono::{Duration, NaiveDate};
use sea_orm::{Database, DatabaseConnection};

use engine::{
    AccountInput, CcTransactionInput, ChangeReceiver, CreditCardInput, Engine, EngineError,
    LocalChange, RecurringInput, TransactionFilter, TransactionInput,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn engine_with_changes() -> (Engine, ChangeReceiver) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let (sender, receiver) = engine::changes::channel();
    let engine = Engine::builder()
        .database(db)
        .changes(sender)
        .build()
        .await
        .unwrap();
    (engine, receiver)
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn account_input(name: &str) -> AccountInput {
    AccountInput {
        name: name.to_string(),
        ..Default::default()
    }
}

fn tx_input(account_id: &str, kind: TransactionType, amount_minor: i64) -> TransactionInput {
    TransactionInput {
        account_id: account_id.to_string(),
        kind,
        amount_minor,
        description: None,
        category: Some("Food".to_string()),
        date: date(2025, 3, 10),
        notes: None,
    }
}

fn card_input() -> CreditCardInput {
    CreditCardInput {
        name: "Visa".to_string(),
        card_number: Some("4111111111111234".to_string()),
        max_limit_minor: 500_000,
        billing_day: 15,
        color: None,
        notes: None,
    }
}

fn payment(card_id: &str, account_id: Option<&str>, amount_minor: i64) -> CcTransactionInput {
    CcTransactionInput {
        credit_card_id: card_id.to_string(),
        kind: CcTransactionType::Payment,
        amount_minor,
        description: None,
        category: None,
        date: date(2025, 3, 12),
        account_id: account_id.map(ToString::to_string),
        notes: None,
    }
}

fn drain(receiver: &mut ChangeReceiver) -> Vec<LocalChange> {
    let mut out = Vec::new();
    while let Ok(change) = receiver.try_recv() {
        out.push(change);
    }
    out
}

#[tokio::test]
async fn transactions_move_the_account_balance() {
    let (engine, _db) = engine_with_db().await;
    let account = engine
        .create_account(account_input("Cash"), 10_000)
        .await
        .unwrap();

    let deposit = engine
        .create_transaction(tx_input(&account.id, TransactionType::Deposit, 2_500))
        .await
        .unwrap();
    engine
        .create_transaction(tx_input(&account.id, TransactionType::Withdraw, 1_000))
        .await
        .unwrap();
    assert_eq!(engine.account(&account.id).await.unwrap().balance_minor, 11_500);

    engine
        .update_transaction(&deposit.id, tx_input(&account.id, TransactionType::Withdraw, 500))
        .await
        .unwrap();
    assert_eq!(engine.account(&account.id).await.unwrap().balance_minor, 8_500);
    let updated = engine.transaction(&deposit.id).await.unwrap();
    assert_eq!(updated.kind, TransactionType::Withdraw);
    assert!(updated.updated_at.is_some());
    assert_eq!(updated.created_at, deposit.created_at);

    engine.delete_transaction(&deposit.id).await.unwrap();
    assert_eq!(engine.account(&account.id).await.unwrap().balance_minor, 9_000);
}

#[tokio::test]
async fn moving_a_transaction_updates_both_accounts() {
    let (engine, _db) = engine_with_db().await;
    let cash = engine.create_account(account_input("Cash"), 0).await.unwrap();
    let bank = engine.create_account(account_input("Bank"), 0).await.unwrap();

    let tx = engine
        .create_transaction(tx_input(&cash.id, TransactionType::Deposit, 700))
        .await
        .unwrap();
    engine
        .update_transaction(&tx.id, tx_input(&bank.id, TransactionType::Deposit, 700))
        .await
        .unwrap();

    assert_eq!(engine.account(&cash.id).await.unwrap().balance_minor, 0);
    assert_eq!(engine.account(&bank.id).await.unwrap().balance_minor, 700);
}

#[tokio::test]
async fn invalid_writes_are_rejected() {
    let (engine, _db) = engine_with_db().await;
    let account = engine.create_account(account_input("Cash"), 0).await.unwrap();

    let err = engine
        .create_transaction(tx_input(&account.id, TransactionType::Deposit, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let err = engine
        .create_transaction(tx_input("missing", TransactionType::Deposit, 10))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let err = engine
        .create_account(account_input("   "), 0)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
}

#[tokio::test]
async fn deleting_an_account_removes_its_transactions() {
    let (engine, _db) = engine_with_db().await;
    let cash = engine.create_account(account_input("Cash"), 0).await.unwrap();
    let bank = engine.create_account(account_input("Bank"), 0).await.unwrap();
    engine
        .create_transaction(tx_input(&cash.id, TransactionType::Deposit, 100))
        .await
        .unwrap();
    engine
        .create_transaction(tx_input(&bank.id, TransactionType::Deposit, 200))
        .await
        .unwrap();

    engine.delete_account(&cash.id).await.unwrap();

    let left = engine.transactions().await.unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].account_id, bank.id);
    assert!(matches!(
        engine.account(&cash.id).await,
        Err(EngineError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn filter_by_kind_and_date_range() {
    let (engine, _db) = engine_with_db().await;
    let account = engine.create_account(account_input("Cash"), 0).await.unwrap();
    for (day, kind) in [
        (1, TransactionType::Deposit),
        (5, TransactionType::Withdraw),
        (9, TransactionType::Withdraw),
    ] {
        let mut input = tx_input(&account.id, kind, 100);
        input.date = date(2025, 4, day);
        engine.create_transaction(input).await.unwrap();
    }

    let found = engine
        .filter_transactions(&TransactionFilter {
            kind: Some(TransactionType::Withdraw),
            from: Some(date(2025, 4, 2)),
            to: Some(date(2025, 4, 9)),
            ..Default::default()
        })
        .await
        .unwrap();
    let dates: Vec<NaiveDate> = found.iter().map(|tx| tx.date).collect();
    assert_eq!(dates, vec![date(2025, 4, 9), date(2025, 4, 5)]);
}

#[tokio::test]
async fn payment_cascade_delete_restores_the_account() {
    let (engine, _db) = engine_with_db().await;
    let account = engine
        .create_account(account_input("Checking"), 100_000)
        .await
        .unwrap();
    let card = engine.create_credit_card(card_input(), 30_000).await.unwrap();
    assert_eq!(card.card_number.as_deref(), Some("1234"));
    assert!(card.id.starts_with("cc_"));

    let cc = engine
        .create_cc_transaction(payment(&card.id, Some(&account.id), 20_000))
        .await
        .unwrap();
    assert!(cc.id.starts_with("cctxn_"));

    let account_txs = engine.account_transactions(&account.id).await.unwrap();
    assert_eq!(account_txs.len(), 1);
    let linked = &account_txs[0];
    assert_eq!(cc.linked_transaction_id.as_deref(), Some(linked.id.as_str()));
    assert_eq!(linked.kind, TransactionType::Withdraw);
    assert_eq!(linked.amount_minor, 20_000);
    assert_eq!(linked.category.as_deref(), Some("Credit Card Payment"));
    assert_eq!(engine.account(&account.id).await.unwrap().balance_minor, 80_000);
    assert_eq!(
        engine.credit_card(&card.id).await.unwrap().current_balance_minor,
        10_000
    );

    engine.delete_cc_transaction(&cc.id).await.unwrap();

    assert!(engine.account_transactions(&account.id).await.unwrap().is_empty());
    assert_eq!(engine.account(&account.id).await.unwrap().balance_minor, 100_000);
    assert_eq!(
        engine.credit_card(&card.id).await.unwrap().current_balance_minor,
        30_000
    );
}

#[tokio::test]
async fn payment_from_unknown_account_stays_unlinked() {
    let (engine, _db) = engine_with_db().await;
    let card = engine.create_credit_card(card_input(), 5_000).await.unwrap();

    let cc = engine
        .create_cc_transaction(payment(&card.id, Some("gone"), 2_000))
        .await
        .unwrap();

    assert_eq!(cc.linked_transaction_id, None);
    assert!(engine.transactions().await.unwrap().is_empty());
    assert_eq!(
        engine.credit_card(&card.id).await.unwrap().current_balance_minor,
        3_000
    );
}

#[tokio::test]
async fn card_balance_never_goes_negative() {
    let (engine, _db) = engine_with_db().await;
    let card = engine.create_credit_card(card_input(), 1_000).await.unwrap();

    engine
        .create_cc_transaction(payment(&card.id, None, 5_000))
        .await
        .unwrap();

    assert_eq!(
        engine.credit_card(&card.id).await.unwrap().current_balance_minor,
        0
    );
}

#[tokio::test]
async fn updating_a_payment_relinks_it() {
    let (engine, _db) = engine_with_db().await;
    let account = engine
        .create_account(account_input("Checking"), 50_000)
        .await
        .unwrap();
    let card = engine.create_credit_card(card_input(), 40_000).await.unwrap();
    let cc = engine
        .create_cc_transaction(payment(&card.id, Some(&account.id), 10_000))
        .await
        .unwrap();

    let updated = engine
        .update_cc_transaction(&cc.id, payment(&card.id, Some(&account.id), 15_000))
        .await
        .unwrap();

    let account_txs = engine.account_transactions(&account.id).await.unwrap();
    assert_eq!(account_txs.len(), 1);
    assert_eq!(account_txs[0].amount_minor, 15_000);
    assert_ne!(updated.linked_transaction_id, cc.linked_transaction_id);
    assert_eq!(engine.account(&account.id).await.unwrap().balance_minor, 35_000);
    assert_eq!(
        engine.credit_card(&card.id).await.unwrap().current_balance_minor,
        25_000
    );
}

#[tokio::test]
async fn deleting_a_card_removes_its_transactions() {
    let (engine, _db) = engine_with_db().await;
    let card = engine.create_credit_card(card_input(), 0).await.unwrap();
    let mut charge = payment(&card.id, None, 900);
    charge.kind = CcTransactionType::Charge;
    engine.create_cc_transaction(charge).await.unwrap();

    engine.delete_credit_card(&card.id).await.unwrap();

    assert!(engine.cc_transactions().await.unwrap().is_empty());
    assert!(engine.credit_cards().await.unwrap().is_empty());
}

#[tokio::test]
async fn raw_upsert_has_no_side_effects() {
    let (engine, mut changes) = engine_with_changes().await;
    let account = engine
        .create_account(account_input("Cash"), 1_000)
        .await
        .unwrap();
    let tx = engine
        .create_transaction(tx_input(&account.id, TransactionType::Deposit, 500))
        .await
        .unwrap();
    drain(&mut changes);

    let mut foreign = tx.clone();
    foreign.id = "remote-tx".to_string();
    foreign.amount_minor = 9_999;
    engine
        .raw_upsert(&SnapshotRecord::Transaction(foreign.clone()))
        .await
        .unwrap();

    let mut renamed = engine.account(&account.id).await.unwrap();
    renamed.name = "Wallet".to_string();
    renamed.updated_at += Duration::seconds(10);
    engine.raw_upsert_account(&renamed).await.unwrap();

    let stored = engine.account(&account.id).await.unwrap();
    assert_eq!(stored, renamed);
    assert_eq!(stored.balance_minor, 1_500);
    assert_eq!(engine.transaction("remote-tx").await.unwrap(), foreign);
    assert!(drain(&mut changes).is_empty());
}

#[tokio::test]
async fn cleared_ledger_is_restored_record_by_record() {
    let (engine, mut changes) = engine_with_changes().await;
    let account = engine
        .create_account(account_input("Cash"), 10_000)
        .await
        .unwrap();
    engine
        .create_transaction(tx_input(&account.id, TransactionType::Deposit, 700))
        .await
        .unwrap();
    let card = engine.create_credit_card(card_input(), 2_000).await.unwrap();
    engine
        .create_cc_transaction(payment(&card.id, Some(&account.id), 1_500))
        .await
        .unwrap();
    engine
        .create_recurring(RecurringInput {
            account_id: account.id.clone(),
            kind: TransactionType::Withdraw,
            amount_minor: 300,
            description: Some("Rent".to_string()),
            category: None,
            frequency: Frequency::Monthly,
            next_date: date(2025, 4, 1),
        })
        .await
        .unwrap();
    let before = engine.snapshot().await.unwrap();
    drain(&mut changes);

    engine.clear_all().await.unwrap();
    assert!(engine.snapshot().await.unwrap().into_records().is_empty());

    for record in &before.accounts {
        engine.raw_upsert_account(record).await.unwrap();
    }
    for record in &before.transactions {
        engine.raw_upsert_transaction(record).await.unwrap();
    }
    for record in &before.recurring {
        engine.raw_upsert_recurring(record).await.unwrap();
    }
    for record in &before.credit_cards {
        engine.raw_upsert_credit_card(record).await.unwrap();
    }
    for record in &before.cc_transactions {
        engine.raw_upsert_cc_transaction(record).await.unwrap();
    }

    assert_eq!(engine.snapshot().await.unwrap(), before);
    assert!(drain(&mut changes).is_empty());
}

#[tokio::test]
async fn user_writes_notify_after_commit() {
    let (engine, mut changes) = engine_with_changes().await;
    let account = engine.create_account(account_input("Cash"), 0).await.unwrap();
    let tx = engine
        .create_transaction(tx_input(&account.id, TransactionType::Deposit, 10))
        .await
        .unwrap();

    assert_eq!(
        drain(&mut changes),
        vec![
            LocalChange::Upserted {
                kind: EntityKind::Account,
                id: account.id.clone()
            },
            LocalChange::Upserted {
                kind: EntityKind::Transaction,
                id: tx.id.clone()
            },
            LocalChange::Upserted {
                kind: EntityKind::Account,
                id: account.id.clone()
            },
        ]
    );

    let _ = engine
        .create_transaction(tx_input("missing", TransactionType::Deposit, 10))
        .await;
    assert!(drain(&mut changes).is_empty());
}

#[tokio::test]
async fn replace_all_mirrors_the_snapshot() {
    let (source, _db) = engine_with_db().await;
    let account = source.create_account(account_input("Cash"), 300).await.unwrap();
    source
        .create_transaction(tx_input(&account.id, TransactionType::Withdraw, 100))
        .await
        .unwrap();
    let snapshot = source.snapshot().await.unwrap();

    let (target, _db) = engine_with_db().await;
    target.create_account(account_input("Old"), 0).await.unwrap();
    target.replace_all(&snapshot).await.unwrap();

    assert_eq!(target.snapshot().await.unwrap(), snapshot);
}

#[tokio::test]
async fn backup_merge_only_adds_unknown_records() {
    let (engine, _db) = engine_with_db().await;
    let account = engine.create_account(account_input("Cash"), 100).await.unwrap();
    let mut backup = engine.export_backup().await.unwrap();

    let mut changed = account.clone();
    changed.balance_minor = 42;
    backup.snapshot.accounts[0] = changed;
    let mut extra = account.clone();
    extra.id = "other".to_string();
    backup.snapshot.accounts.push(extra);

    let written = engine
        .import_backup(&backup, ImportMode::Merge)
        .await
        .unwrap();
    assert_eq!(written, 1);
    assert_eq!(engine.account(&account.id).await.unwrap().balance_minor, 100);
    assert!(engine.account("other").await.is_ok());

    let written = engine
        .import_backup(&backup, ImportMode::Replace)
        .await
        .unwrap();
    assert_eq!(written, 2);
    assert_eq!(engine.account(&account.id).await.unwrap().balance_minor, 42);
}

#[tokio::test]
async fn backup_with_unknown_version_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let mut backup = engine.export_backup().await.unwrap();
    backup.version = 99;

    let err = engine
        .import_backup(&backup, ImportMode::Replace)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidRecord(_)));
}
