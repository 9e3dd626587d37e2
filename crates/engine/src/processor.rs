//! Materializes due recurring rules into transactions on a timer.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use api_types::ledger::RecurringRule;
use chrono::{Local, NaiveDate};
use tracing::{debug, error, info, warn};

use crate::{Engine, PeriodicTask, ResultEngine};

/// Outcome of one scan.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Ids of the transactions created.
    pub executed: Vec<String>,
    /// Rules whose execution failed.
    pub failed: usize,
    /// The scan did not run because another one was in progress.
    pub skipped: bool,
}

/// Scheduler for recurring rules.
///
/// Each scan executes every due rule once and advances it by one period, so
/// a rule that fell several periods behind catches up one tick at a time.
/// A failing rule is logged and the scan moves on.
#[derive(Debug)]
pub struct RecurringProcessor {
    engine: Arc<Engine>,
    processing: AtomicBool,
    timer: PeriodicTask,
}

/// Clears the processing flag when the scan ends, however it ends.
struct ProcessingGuard<'a>(&'a AtomicBool);

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

impl RecurringProcessor {
    pub fn new(engine: Arc<Engine>) -> Arc<Self> {
        Arc::new(Self {
            engine,
            processing: AtomicBool::new(false),
            timer: PeriodicTask::new(),
        })
    }

    /// Scan now and then every `interval`. Restarting replaces the timer.
    pub fn start(self: &Arc<Self>, interval: Duration) {
        let processor = Arc::downgrade(self);
        self.timer.start(interval, move || {
            let processor = processor.clone();
            async move {
                if let Some(processor) = processor.upgrade() {
                    processor.trigger_processing().await;
                }
            }
        });
        info!(interval_secs = interval.as_secs(), "recurring processor started");
    }

    pub fn stop(&self) {
        if self.timer.stop() {
            info!("recurring processor stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_running()
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    /// Rules that a scan would execute today, without executing them.
    pub async fn check_due_transactions(&self) -> ResultEngine<Vec<RecurringRule>> {
        self.engine.due_recurring_rules(today()).await
    }

    /// Run a scan outside the timer.
    pub async fn trigger_processing(&self) -> ScanReport {
        self.run_scan(today()).await
    }

    /// Run a scan as of `today`.
    pub async fn run_scan(&self, today: NaiveDate) -> ScanReport {
        if self
            .processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("recurring scan already in progress");
            return ScanReport {
                skipped: true,
                ..Default::default()
            };
        }
        let _guard = ProcessingGuard(&self.processing);

        let mut report = ScanReport::default();
        let due = match self.engine.due_recurring_rules(today).await {
            Ok(due) => due,
            Err(err) => {
                error!(error = %err, "cannot load due recurring rules");
                return report;
            }
        };

        for rule in due {
            match self.engine.execute_recurring(&rule.id, today).await {
                Ok(Some(tx)) => {
                    debug!(recurring_id = %rule.id, transaction_id = %tx.id, "recurring rule executed");
                    report.executed.push(tx.id);
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(recurring_id = %rule.id, error = %err, "recurring rule failed");
                    report.failed += 1;
                }
            }
        }

        if !report.executed.is_empty() || report.failed > 0 {
            info!(
                executed = report.executed.len(),
                failed = report.failed,
                "recurring scan done"
            );
        }
        report
    }
}
