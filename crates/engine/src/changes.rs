//! Notifications emitted after every committed user write.
//!
//! Internal writes (raw upserts, snapshot replacement) never emit, so a
//! consumer that writes back through that path cannot loop on itself.

use api_types::wallet::EntityKind;
use tokio::sync::mpsc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LocalChange {
    Upserted { kind: EntityKind, id: String },
    Deleted { kind: EntityKind, id: String },
    /// A backup was imported; `records` is how many were written.
    Imported { records: usize },
}

impl LocalChange {
    pub(crate) fn upserted(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::Upserted {
            kind,
            id: id.into(),
        }
    }

    pub(crate) fn deleted(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::Deleted {
            kind,
            id: id.into(),
        }
    }
}

pub type ChangeSender = mpsc::UnboundedSender<LocalChange>;
pub type ChangeReceiver = mpsc::UnboundedReceiver<LocalChange>;

pub fn channel() -> (ChangeSender, ChangeReceiver) {
    mpsc::unbounded_channel()
}
