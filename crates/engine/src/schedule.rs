//! A periodic background task with a single owner of its timer.

use std::{
    future::Future,
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use tokio::{
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

/// Runs an async job every `period` until stopped.
///
/// Starting a running task replaces the previous timer, so there is never
/// more than one. Each run is spawned as
/// its own task: `stop` cancels the timer but lets a run already in flight
/// finish.
#[derive(Debug, Default)]
pub struct PeriodicTask {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl PeriodicTask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `job` now and then every `period`.
    pub fn start<F, Fut>(&self, period: Duration, job: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.spawn(Instant::now(), period, job);
    }

    /// Run `job` every `period`, the first time one period from now.
    pub fn start_delayed<F, Fut>(&self, period: Duration, job: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.spawn(Instant::now() + period, period, job);
    }

    fn spawn<F, Fut>(&self, first: Instant, period: Duration, job: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let timer = tokio::spawn(async move {
            let mut interval = time::interval_at(first, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                tokio::spawn(job());
            }
        });

        if let Some(previous) = self.slot().replace(timer) {
            previous.abort();
        }
    }

    /// Cancel the timer. Returns `false` when it was not running.
    pub fn stop(&self) -> bool {
        match self.slot().take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.slot()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.handle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.stop();
    }
}
