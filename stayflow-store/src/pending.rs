use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use stayflow_core::models::PendingBookingPayload;
use stayflow_core::store::PendingStore;
use tokio::sync::RwLock;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// In-process pending store. Used in tests and anywhere the flow does not
/// cross a process boundary.
#[derive(Default)]
pub struct MemoryPendingStore {
    slot: RwLock<Option<PendingBookingPayload>>,
}

impl MemoryPendingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PendingStore for MemoryPendingStore {
    async fn put(&self, payload: &PendingBookingPayload) -> Result<(), BoxError> {
        *self.slot.write().await = Some(payload.clone());
        Ok(())
    }

    async fn get(&self) -> Result<Option<PendingBookingPayload>, BoxError> {
        Ok(self.slot.read().await.clone())
    }

    async fn clear(&self) -> Result<(), BoxError> {
        *self.slot.write().await = None;
        Ok(())
    }
}

/// Pending store backed by one JSON file in a session-scoped directory.
///
/// Outlives the process (the processor-redirect boundary) but not the session
/// directory itself. A payload orphaned by an abandoned session is an
/// accepted leak: it is keyed to that session and never reused.
pub struct FilePendingStore {
    path: PathBuf,
}

impl FilePendingStore {
    const FILE_NAME: &'static str = "pending_booking.json";

    pub fn new(session_dir: impl AsRef<Path>) -> Self {
        Self {
            path: session_dir.as_ref().join(Self::FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PendingStore for FilePendingStore {
    async fn put(&self, payload: &PendingBookingPayload) -> Result<(), BoxError> {
        let bytes = serde_json::to_vec(payload)?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, bytes).await?;
        tracing::debug!(path = %self.path.display(), "persisted pending booking payload");
        Ok(())
    }

    async fn get(&self) -> Result<Option<PendingBookingPayload>, BoxError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn clear(&self) -> Result<(), BoxError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
