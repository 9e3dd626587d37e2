//! Offline-first synchronization of a device ledger with a shared wallet.
//!
//! A wallet is one snapshot document on the wallet store, shared by every
//! device that knows its id and password. [`SyncEngine`] pushes the whole
//! local ledger, pulls the document back and merges it record by record
//! with last-write-wins (see [`merge`]). Deletions are never propagated.

pub use connectivity::{Connectivity, NetworkStatus};
pub use error::{RemoteError, SyncError};
pub use events::{SyncDirection, SyncEvent};
pub use remote::{HttpWalletRemote, WalletRemote};
pub use service::{
    DEFAULT_SYNC_INTERVAL, PullReport, SyncEngine, SyncEngineBuilder, TickOutcome,
};
pub use settings::{SettingsFile, SyncSettings};
pub use store::LocalStore;

pub mod merge;
pub mod snapshot;

mod connectivity;
mod error;
mod events;
mod remote;
mod service;
mod settings;
mod store;
