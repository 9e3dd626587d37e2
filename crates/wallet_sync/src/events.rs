use tokio::sync::broadcast;

use crate::SyncSettings;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncDirection {
    Push,
    Pull,
}

/// What observers of the sync service are told.
#[derive(Clone, Debug, PartialEq)]
pub enum SyncEvent {
    Started,
    Succeeded { direction: SyncDirection },
    /// Configuration problems (sync off, locked session) are not reported.
    Failed { error: String },
    /// `None` once the device disconnected from its wallet.
    SettingsChanged(Option<SyncSettings>),
    /// A pull wrote `records` records into the local ledger.
    DataRefreshed { records: usize },
    Active,
    Paused,
}

const EVENT_CAPACITY: usize = 64;

pub(crate) fn channel() -> broadcast::Sender<SyncEvent> {
    broadcast::channel(EVENT_CAPACITY).0
}
