//! Per-device sync settings, persisted as a small JSON file.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::SyncError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSettings {
    pub enabled: bool,
    pub wallet_id: String,
    pub has_password: bool,
    /// Set on the device that created the wallet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Set on devices that joined an existing wallet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug)]
pub struct SettingsFile {
    path: PathBuf,
}

impl SettingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` when sync was never configured on this device.
    pub fn load(&self) -> Result<Option<SyncSettings>, SyncError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(self.error(err)),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|err| self.error(err))
    }

    pub fn save(&self, settings: &SyncSettings) -> Result<(), SyncError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| self.error(err))?;
        }
        let payload = serde_json::to_string_pretty(settings).map_err(|err| self.error(err))?;
        fs::write(&self.path, payload).map_err(|err| self.error(err))
    }

    pub fn clear(&self) -> Result<(), SyncError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(self.error(err)),
        }
    }

    fn error(&self, err: impl fmt::Display) -> SyncError {
        SyncError::Settings(format!("{}: {err}", self.path.display()))
    }
}

/// The wallet password, kept in memory for the lifetime of the process only.
#[derive(Default)]
pub(crate) struct Session {
    password: Mutex<Option<String>>,
}

impl Session {
    fn slot(&self) -> MutexGuard<'_, Option<String>> {
        self.password
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn set(&self, password: &str) {
        *self.slot() = Some(password.to_string());
    }

    pub(crate) fn get(&self) -> Option<String> {
        self.slot().clone()
    }

    pub(crate) fn clear(&self) {
        self.slot().take();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.slot().is_some() { "unlocked" } else { "locked" };
        f.debug_struct("Session").field("state", &state).finish()
    }
}
