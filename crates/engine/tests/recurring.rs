use std::{sync::Arc, time::Duration};

use api_types::ledger::{Frequency, TransactionType};
use chrono::{Days, Local, NaiveDate};
use sea_orm::Database;

use engine::{AccountInput, Engine, RecurringInput, RecurringProcessor};
use migration::MigratorTrait;

async fn engine_with_db() -> Arc<Engine> {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Arc::new(Engine::builder().database(db).build().await.unwrap())
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn rule(account_id: &str, frequency: Frequency, next_date: NaiveDate) -> RecurringInput {
    RecurringInput {
        account_id: account_id.to_string(),
        kind: TransactionType::Withdraw,
        amount_minor: 1_000,
        description: Some("Gym".to_string()),
        category: Some("Health".to_string()),
        frequency,
        next_date,
    }
}

async fn account(engine: &Engine) -> String {
    engine
        .create_account(
            AccountInput {
                name: "Cash".to_string(),
                ..Default::default()
            },
            10_000,
        )
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn daily_rule_catches_up_one_tick_at_a_time() {
    let engine = engine_with_db().await;
    let account_id = account(&engine).await;
    let today = date(2025, 6, 10);
    let created = engine
        .create_recurring(rule(&account_id, Frequency::Daily, date(2025, 6, 7)))
        .await
        .unwrap();
    let processor = RecurringProcessor::new(engine.clone());

    let mut next_dates = Vec::new();
    for _ in 0..4 {
        let report = processor.run_scan(today).await;
        assert_eq!(report.failed, 0);
        assert!(!report.skipped);
        next_dates.push(engine.recurring_rule(&created.id).await.unwrap().next_date);
    }

    assert_eq!(
        next_dates,
        vec![
            date(2025, 6, 8),
            date(2025, 6, 9),
            date(2025, 6, 10),
            date(2025, 6, 11),
        ]
    );
    // three past days plus today
    assert_eq!(engine.transactions().await.unwrap().len(), 4);
    assert_eq!(processor.run_scan(today).await.executed.len(), 0);
}

#[tokio::test]
async fn overlapping_scans_run_once() {
    let engine = engine_with_db().await;
    let account_id = account(&engine).await;
    let today = date(2025, 6, 10);
    engine
        .create_recurring(rule(&account_id, Frequency::Monthly, date(2025, 6, 1)))
        .await
        .unwrap();
    let processor = RecurringProcessor::new(engine.clone());

    let (first, second) = tokio::join!(processor.run_scan(today), processor.run_scan(today));
    assert!(!first.skipped);
    assert_eq!(first.executed.len(), 1);
    assert_eq!(
        second,
        engine::ScanReport {
            skipped: true,
            ..Default::default()
        }
    );
    assert!(!processor.is_processing());
    assert_eq!(engine.transactions().await.unwrap().len(), 1);
}

#[tokio::test]
async fn execution_materializes_a_transaction() {
    let engine = engine_with_db().await;
    let account_id = account(&engine).await;
    let today = date(2025, 6, 10);
    let created = engine
        .create_recurring(rule(&account_id, Frequency::Monthly, date(2025, 6, 1)))
        .await
        .unwrap();
    let processor = RecurringProcessor::new(engine.clone());

    let report = processor.run_scan(today).await;
    assert_eq!(report.executed.len(), 1);

    let tx = engine.transaction(&report.executed[0]).await.unwrap();
    assert_eq!(tx.description.as_deref(), Some("Gym (Auto)"));
    assert_eq!(tx.date, today);
    assert_eq!(tx.recurring_id.as_deref(), Some(created.id.as_str()));
    assert_eq!(tx.category.as_deref(), Some("Health"));
    assert_eq!(engine.account(&account_id).await.unwrap().balance_minor, 9_000);

    let rule = engine.recurring_rule(&created.id).await.unwrap();
    assert_eq!(rule.next_date, date(2025, 7, 1));
    assert!(rule.last_executed.is_some());
    assert!(rule.updated_at > created.updated_at);

    let history = engine.recurring_history(&created.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].transaction_id, tx.id);
    assert_eq!(history[0].amount_minor, 1_000);
}

#[tokio::test]
async fn paused_and_future_rules_are_not_due() {
    let engine = engine_with_db().await;
    let account_id = account(&engine).await;
    let today = date(2025, 6, 10);
    let paused = engine
        .create_recurring(rule(&account_id, Frequency::Weekly, date(2025, 6, 1)))
        .await
        .unwrap();
    engine.toggle_recurring(&paused.id).await.unwrap();
    engine
        .create_recurring(rule(&account_id, Frequency::Weekly, date(2025, 6, 11)))
        .await
        .unwrap();

    assert!(engine.due_recurring_rules(today).await.unwrap().is_empty());
    let processor = RecurringProcessor::new(engine.clone());
    assert!(processor.run_scan(today).await.executed.is_empty());
    assert_eq!(engine.active_recurring_rules().await.unwrap().len(), 1);
}

#[tokio::test]
async fn failing_rule_does_not_stop_the_scan() {
    let engine = engine_with_db().await;
    let account_id = account(&engine).await;
    let other_id = {
        engine
            .create_account(
                AccountInput {
                    name: "Temp".to_string(),
                    ..Default::default()
                },
                0,
            )
            .await
            .unwrap()
            .id
    };
    let today = date(2025, 6, 10);
    engine
        .create_recurring(rule(&other_id, Frequency::Daily, date(2025, 6, 1)))
        .await
        .unwrap();
    let healthy = engine
        .create_recurring(rule(&account_id, Frequency::Daily, date(2025, 6, 2)))
        .await
        .unwrap();
    engine.delete_account(&other_id).await.unwrap();

    let processor = RecurringProcessor::new(engine.clone());
    let report = processor.run_scan(today).await;

    assert_eq!(report.failed, 1);
    assert_eq!(report.executed.len(), 1);
    assert_eq!(
        engine.recurring_rule(&healthy.id).await.unwrap().next_date,
        date(2025, 6, 3)
    );
}

#[tokio::test]
async fn start_scans_immediately_and_stop_cancels() {
    let engine = engine_with_db().await;
    let account_id = account(&engine).await;
    let yesterday = Local::now()
        .date_naive()
        .checked_sub_days(Days::new(1))
        .unwrap();
    engine
        .create_recurring(rule(&account_id, Frequency::Yearly, yesterday))
        .await
        .unwrap();
    let processor = RecurringProcessor::new(engine.clone());

    processor.start(Duration::from_secs(3600));
    assert!(processor.is_running());
    for _ in 0..50 {
        if !engine.transactions().await.unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(engine.transactions().await.unwrap().len(), 1);
    assert!(processor.check_due_transactions().await.unwrap().is_empty());

    processor.stop();
    assert!(!processor.is_running());
}
