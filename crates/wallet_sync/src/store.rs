use api_types::wallet::{Snapshot, SnapshotRecord};
use async_trait::async_trait;
use engine::{Engine, EngineError};

/// The local side of a sync: read everything, write records verbatim.
///
/// Writes through this seam must not emit local change notifications.
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn snapshot(&self) -> Result<Snapshot, EngineError>;

    async fn find(&self, record: &SnapshotRecord) -> Result<Option<SnapshotRecord>, EngineError>;

    async fn raw_upsert(&self, record: &SnapshotRecord) -> Result<(), EngineError>;

    async fn replace_all(&self, snapshot: &Snapshot) -> Result<(), EngineError>;
}

#[async_trait]
impl LocalStore for Engine {
    async fn snapshot(&self) -> Result<Snapshot, EngineError> {
        Engine::snapshot(self).await
    }

    async fn find(&self, record: &SnapshotRecord) -> Result<Option<SnapshotRecord>, EngineError> {
        self.find_record(record).await
    }

    async fn raw_upsert(&self, record: &SnapshotRecord) -> Result<(), EngineError> {
        Engine::raw_upsert(self, record).await
    }

    async fn replace_all(&self, snapshot: &Snapshot) -> Result<(), EngineError> {
        Engine::replace_all(self, snapshot).await
    }
}
