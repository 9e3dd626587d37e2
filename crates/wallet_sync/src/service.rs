//! The sync service: one wallet per device, a push-then-pull cycle and the
//! timer that repeats it.

use std::{
    path::PathBuf,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use api_types::{SyncRecord, wallet::SnapshotRecord};
use chrono::Utc;
use engine::{ChangeReceiver, PeriodicTask};
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    Connectivity, LocalStore, NetworkStatus, SettingsFile, SyncDirection, SyncError, SyncEvent,
    SyncSettings, WalletRemote, events, merge, settings::Session, snapshot,
};

pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(30);

/// What a pull wrote locally.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PullReport {
    /// Remote records written into the local ledger.
    pub applied: usize,
    /// Remote records dropped because they did not decode or write.
    pub skipped: usize,
    /// Remote records passed over because the local copy changed during
    /// the pull and is now at least as recent.
    pub kept_local: usize,
}

enum Applied {
    Written,
    KeptLocal,
    Failed,
}

/// Result of one timer tick.
#[derive(Debug)]
pub enum TickOutcome {
    SkippedOffline,
    /// Another cycle was in flight.
    SkippedBusy,
    Completed(PullReport),
    Failed(SyncError),
}

/// Keeps the local ledger and one remote wallet eventually consistent.
///
/// A cycle pushes the full local snapshot, then pulls the remote one and
/// merges it back with last-write-wins. Cycles never overlap: the timer
/// drops its tick when one is in flight, manual and change-triggered
/// cycles wait for it.
pub struct SyncEngine {
    store: Arc<dyn LocalStore>,
    remote: Arc<dyn WalletRemote>,
    connectivity: Arc<dyn Connectivity>,
    settings_file: SettingsFile,
    settings: Mutex<Option<SyncSettings>>,
    session: Session,
    events: broadcast::Sender<SyncEvent>,
    timer: PeriodicTask,
    interval: Duration,
    initialized: AtomicBool,
    /// Bumped by every stop; a `start_sync` that sees it move stays stopped.
    generation: AtomicU64,
    /// Serializes arming the timer against stopping it.
    lifecycle: Mutex<()>,
    cycle: tokio::sync::Mutex<()>,
}

impl SyncEngine {
    pub fn builder() -> SyncEngineBuilder {
        SyncEngineBuilder::default()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub fn settings(&self) -> Option<SyncSettings> {
        self.settings_slot().clone()
    }

    /// The first cycle after enabling sync has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_running()
    }

    pub fn is_unlocked(&self) -> bool {
        self.session.get().is_some()
    }

    /// Load the persisted settings and resume syncing when the session
    /// already holds the password.
    pub async fn initialize(self: &Arc<Self>) -> Result<(), SyncError> {
        let settings = self.settings_file.load()?;
        *self.settings_slot() = settings.clone();
        self.emit(SyncEvent::SettingsChanged(settings.clone()));

        match settings {
            Some(settings) if settings.enabled => {
                if self.is_unlocked() {
                    if let Err(err) = self.start_sync().await {
                        debug!("first sync after startup failed: {err}");
                    }
                } else {
                    info!(
                        wallet_id = %settings.wallet_id,
                        "sync configured, waiting for the wallet password"
                    );
                }
            }
            _ => debug!("sync not configured on this device"),
        }
        Ok(())
    }

    pub fn shutdown(&self) {
        self.stop_sync();
        debug!("sync service shut down");
    }

    /// Publish the local ledger as a new wallet and start syncing with it.
    pub async fn create_wallet(self: &Arc<Self>, password: &str) -> Result<String, SyncError> {
        if password.is_empty() {
            return Err(SyncError::InvalidCredential);
        }

        let wallet_id = {
            let _cycle = self.cycle.lock().await;
            let wallet_id = format!("wallet_{}", Uuid::new_v4().simple());
            let snapshot = self.store.snapshot().await?;
            self.remote
                .create(&wallet_id, password, &snapshot)
                .await
                .map_err(|err| SyncError::from_remote(err, &wallet_id))?;

            let now = Utc::now();
            self.session.set(password);
            self.set_settings(Some(SyncSettings {
                enabled: true,
                wallet_id: wallet_id.clone(),
                has_password: true,
                created_at: Some(now),
                joined_at: None,
                last_sync: Some(now),
            }))?;
            info!(wallet_id = %wallet_id, records = snapshot.len(), "wallet created");
            wallet_id
        };

        if let Err(err) = self.start_sync().await {
            debug!("first sync after creating the wallet failed: {err}");
        }
        Ok(wallet_id)
    }

    /// Replace the local ledger with an existing wallet and start syncing
    /// with it.
    pub async fn join_wallet(
        self: &Arc<Self>,
        wallet_id: &str,
        password: &str,
    ) -> Result<String, SyncError> {
        let wallet_id = wallet_id.trim();
        if wallet_id.is_empty() {
            return Err(SyncError::WalletNotFound(String::new()));
        }
        if password.is_empty() {
            return Err(SyncError::InvalidCredential);
        }

        {
            let _cycle = self.cycle.lock().await;
            let document = self
                .remote
                .fetch(wallet_id, password)
                .await
                .map_err(|err| SyncError::from_remote(err, wallet_id))?;
            let decoded = snapshot::decode(document)?;
            let records = decoded.snapshot.len();
            self.store.replace_all(&decoded.snapshot).await?;

            let now = Utc::now();
            self.session.set(password);
            self.set_settings(Some(SyncSettings {
                enabled: true,
                wallet_id: wallet_id.to_string(),
                has_password: true,
                created_at: None,
                joined_at: Some(now),
                last_sync: Some(now),
            }))?;
            info!(
                wallet_id = %wallet_id,
                records,
                skipped = decoded.skipped,
                "joined wallet"
            );
            self.emit(SyncEvent::DataRefreshed { records });
        }

        if let Err(err) = self.start_sync().await {
            debug!("first sync after joining the wallet failed: {err}");
        }
        Ok(wallet_id.to_string())
    }

    /// Give the session the wallet password again after a restart.
    ///
    /// A refused password is reported; an unreachable store is not, the
    /// password is then checked by the next cycle.
    pub async fn unlock(self: &Arc<Self>, password: &str) -> Result<(), SyncError> {
        let settings = self.enabled_settings()?;
        match self.remote.fetch(&settings.wallet_id, password).await {
            Ok(_) => {}
            Err(err) => match SyncError::from_remote(err, &settings.wallet_id) {
                SyncError::Transport(reason) => {
                    warn!("could not verify the wallet password: {reason}");
                }
                err => return Err(err),
            },
        }

        self.session.set(password);
        info!(wallet_id = %settings.wallet_id, "wallet unlocked");
        if let Err(err) = self.start_sync().await {
            debug!("first sync after unlock failed: {err}");
        }
        Ok(())
    }

    /// Send the local snapshot, replacing the remote document.
    pub async fn push_to_server(&self) -> Result<(), SyncError> {
        let _cycle = self.cycle.lock().await;
        let result = match self.started() {
            Ok(()) => self.push().await,
            Err(err) => Err(err),
        };
        self.report(result)
    }

    /// Merge the remote snapshot into the local ledger.
    pub async fn pull_from_server(&self) -> Result<PullReport, SyncError> {
        let _cycle = self.cycle.lock().await;
        let result = match self.started() {
            Ok(()) => self.pull().await,
            Err(err) => Err(err),
        };
        self.report(result)
    }

    /// Run one cycle, waiting for an in-flight one first.
    pub async fn sync_now(&self) -> Result<PullReport, SyncError> {
        let _cycle = self.cycle.lock().await;
        self.run_cycle().await
    }

    /// The timer body.
    pub async fn tick(&self) -> TickOutcome {
        if !self.connectivity.is_online() {
            debug!("offline, skipping sync tick");
            return TickOutcome::SkippedOffline;
        }
        let Ok(_cycle) = self.cycle.try_lock() else {
            debug!("sync cycle in flight, skipping tick");
            return TickOutcome::SkippedBusy;
        };
        match self.run_cycle().await {
            Ok(report) => TickOutcome::Completed(report),
            Err(err) => TickOutcome::Failed(err),
        }
    }

    /// Run a cycle now, then arm the timer. Restarting replaces the timer.
    ///
    /// The timer is armed even when the first cycle fails; its result is
    /// returned. A `stop_sync` or `disconnect` issued while the first cycle
    /// runs wins: the timer is then left disarmed.
    pub async fn start_sync(self: &Arc<Self>) -> Result<PullReport, SyncError> {
        self.credentials()?;
        let generation = self.generation.load(Ordering::Acquire);
        self.timer.stop();

        let result = {
            let _cycle = self.cycle.lock().await;
            self.run_cycle().await
        };

        {
            let _lifecycle = self.lifecycle_slot();
            if self.generation.load(Ordering::Acquire) != generation
                || self.credentials().is_err()
            {
                debug!("sync stopped during the first cycle, timer not armed");
                return result;
            }
            self.initialized.store(true, Ordering::Release);

            let engine = Arc::downgrade(self);
            self.timer.start_delayed(self.interval, move || {
                let engine = engine.clone();
                async move {
                    if let Some(engine) = engine.upgrade() {
                        engine.tick().await;
                    }
                }
            });
        }
        info!(interval_secs = self.interval.as_secs(), "periodic sync started");
        self.emit(SyncEvent::Active);
        result
    }

    /// Cancel the timer, keeping settings and password. An in-flight cycle
    /// completes.
    pub fn stop_sync(&self) {
        let stopped = {
            let _lifecycle = self.lifecycle_slot();
            self.generation.fetch_add(1, Ordering::AcqRel);
            self.initialized.store(false, Ordering::Release);
            self.timer.stop()
        };
        if stopped {
            info!("periodic sync stopped");
            self.emit(SyncEvent::Paused);
        }
    }

    /// Forget the wallet on this device.
    pub async fn disconnect(&self) -> Result<(), SyncError> {
        self.stop_sync();
        let _cycle = self.cycle.lock().await;
        self.session.clear();
        if self.settings().is_some() {
            self.set_settings(None)?;
            info!("disconnected from wallet");
        }
        Ok(())
    }

    /// Delete the remote wallet, then disconnect.
    pub async fn delete_wallet(&self) -> Result<(), SyncError> {
        let (settings, password) = self.credentials()?;
        {
            let _cycle = self.cycle.lock().await;
            self.remote
                .delete(&settings.wallet_id, &password)
                .await
                .map_err(|err| SyncError::from_remote(err, &settings.wallet_id))?;
        }
        info!(wallet_id = %settings.wallet_id, "wallet deleted");
        self.disconnect().await
    }

    /// Sync after local writes. A burst of changes queued while a cycle
    /// runs is folded into a single cycle.
    pub fn spawn_change_listener(self: &Arc<Self>, mut changes: ChangeReceiver) -> JoinHandle<()> {
        let service = Arc::downgrade(self);
        tokio::spawn(async move {
            while let Some(change) = changes.recv().await {
                let mut burst = 1;
                while changes.try_recv().is_ok() {
                    burst += 1;
                }
                let Some(engine) = service.upgrade() else {
                    break;
                };
                if engine.credentials().is_err() || !engine.connectivity.is_online() {
                    continue;
                }

                debug!(?change, burst, "local change, syncing");
                let _cycle = engine.cycle.lock().await;
                let _ = engine.run_cycle().await;
            }
            debug!("change listener stopped");
        })
    }

    /// Push then pull. The caller holds the cycle guard.
    async fn run_cycle(&self) -> Result<PullReport, SyncError> {
        let result = self.cycle().await;
        self.report(result)
    }

    async fn cycle(&self) -> Result<PullReport, SyncError> {
        self.started()?;
        self.push().await?;
        self.pull().await
    }

    /// Check the preconditions and announce the start of a sync.
    fn started(&self) -> Result<(), SyncError> {
        self.credentials()?;
        self.emit(SyncEvent::Started);
        Ok(())
    }

    async fn push(&self) -> Result<(), SyncError> {
        let (settings, password) = self.credentials()?;
        let snapshot = self.store.snapshot().await?;
        self.remote
            .replace(&settings.wallet_id, &password, &snapshot)
            .await
            .map_err(|err| SyncError::from_remote(err, &settings.wallet_id))?;
        debug!(wallet_id = %settings.wallet_id, records = snapshot.len(), "pushed snapshot");

        self.touch_last_sync(&settings.wallet_id)?;
        self.emit(SyncEvent::Succeeded {
            direction: SyncDirection::Push,
        });
        Ok(())
    }

    async fn pull(&self) -> Result<PullReport, SyncError> {
        let (settings, password) = self.credentials()?;
        let document = self
            .remote
            .fetch(&settings.wallet_id, &password)
            .await
            .map_err(|err| SyncError::from_remote(err, &settings.wallet_id))?;
        let decoded = snapshot::decode(document)?;
        let local = self.store.snapshot().await?;

        let mut report = PullReport {
            skipped: decoded.skipped,
            ..Default::default()
        };
        for record in merge::plan(&local, decoded.snapshot) {
            match self.apply(&record).await {
                Applied::Written => report.applied += 1,
                Applied::KeptLocal => report.kept_local += 1,
                Applied::Failed => report.skipped += 1,
            }
        }
        debug!(
            wallet_id = %settings.wallet_id,
            applied = report.applied,
            skipped = report.skipped,
            kept_local = report.kept_local,
            "pulled snapshot"
        );

        self.touch_last_sync(&settings.wallet_id)?;
        self.emit(SyncEvent::Succeeded {
            direction: SyncDirection::Pull,
        });
        if report.applied > 0 {
            self.emit(SyncEvent::DataRefreshed {
                records: report.applied,
            });
        }
        Ok(report)
    }

    /// Write one planned record, unless a local write made it stale since
    /// the plan was computed.
    async fn apply(&self, record: &SnapshotRecord) -> Applied {
        let kind = record.kind();
        let current = match self.store.find(record).await {
            Ok(current) => current,
            Err(err) => {
                warn!(?kind, id = record.id(), "skipping remote record: {err}");
                return Applied::Failed;
            }
        };
        let local_at = current.as_ref().map(|local| local.modified_at());
        if !merge::adopt_remote(local_at, record.modified_at()) {
            debug!(?kind, id = record.id(), "local record changed during pull, keeping it");
            return Applied::KeptLocal;
        }

        match self.store.raw_upsert(record).await {
            Ok(()) => Applied::Written,
            Err(err) => {
                warn!(?kind, id = record.id(), "skipping remote record: {err}");
                Applied::Failed
            }
        }
    }

    fn credentials(&self) -> Result<(SyncSettings, String), SyncError> {
        let settings = self.enabled_settings()?;
        let password = self.session.get().ok_or(SyncError::CredentialMissing)?;
        Ok((settings, password))
    }

    fn enabled_settings(&self) -> Result<SyncSettings, SyncError> {
        self.settings()
            .filter(|settings| settings.enabled)
            .ok_or(SyncError::SyncDisabled)
    }

    /// Configuration errors stay quiet; everything else is signalled.
    fn report<T>(&self, result: Result<T, SyncError>) -> Result<T, SyncError> {
        if let Err(err) = &result {
            if err.is_configuration() {
                debug!("sync skipped: {err}");
            } else {
                error!("sync failed: {err}");
                self.emit(SyncEvent::Failed {
                    error: err.to_string(),
                });
            }
        }
        result
    }

    fn touch_last_sync(&self, wallet_id: &str) -> Result<(), SyncError> {
        let Some(mut settings) = self.settings() else {
            return Ok(());
        };
        if settings.wallet_id != wallet_id {
            return Ok(());
        }
        settings.last_sync = Some(Utc::now());
        self.set_settings(Some(settings))
    }

    fn set_settings(&self, settings: Option<SyncSettings>) -> Result<(), SyncError> {
        match &settings {
            Some(settings) => self.settings_file.save(settings)?,
            None => self.settings_file.clear()?,
        }
        *self.settings_slot() = settings.clone();
        self.emit(SyncEvent::SettingsChanged(settings));
        Ok(())
    }

    fn settings_slot(&self) -> MutexGuard<'_, Option<SyncSettings>> {
        self.settings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lifecycle_slot(&self) -> MutexGuard<'_, ()> {
        self.lifecycle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: SyncEvent) {
        // no subscriber is not an error
        let _ = self.events.send(event);
    }
}

/// The builder for `SyncEngine`
#[derive(Default)]
pub struct SyncEngineBuilder {
    store: Option<Arc<dyn LocalStore>>,
    remote: Option<Arc<dyn WalletRemote>>,
    connectivity: Option<Arc<dyn Connectivity>>,
    settings_path: Option<PathBuf>,
    interval: Option<Duration>,
}

impl SyncEngineBuilder {
    /// The local ledger.
    pub fn store(mut self, store: Arc<dyn LocalStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// The wallet store client.
    pub fn remote(mut self, remote: Arc<dyn WalletRemote>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Defaults to always online.
    pub fn connectivity(mut self, connectivity: Arc<dyn Connectivity>) -> Self {
        self.connectivity = Some(connectivity);
        self
    }

    /// Where the sync settings are persisted.
    pub fn settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn build(self) -> Result<Arc<SyncEngine>, SyncError> {
        let store = self
            .store
            .ok_or_else(|| SyncError::Settings("a local store is required".to_string()))?;
        let remote = self
            .remote
            .ok_or_else(|| SyncError::Settings("a wallet remote is required".to_string()))?;
        let settings_path = self
            .settings_path
            .ok_or_else(|| SyncError::Settings("a settings path is required".to_string()))?;
        let interval = self.interval.unwrap_or(DEFAULT_SYNC_INTERVAL);
        if interval.is_zero() {
            return Err(SyncError::Settings(
                "sync interval must be positive".to_string(),
            ));
        }

        Ok(Arc::new(SyncEngine {
            store,
            remote,
            connectivity: self
                .connectivity
                .unwrap_or_else(|| Arc::new(NetworkStatus::default())),
            settings_file: SettingsFile::new(settings_path),
            settings: Mutex::new(None),
            session: Session::default(),
            events: events::channel(),
            timer: PeriodicTask::new(),
            interval,
            initialized: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            lifecycle: Mutex::new(()),
            cycle: tokio::sync::Mutex::new(()),
        }))
    }
}
