use crate::models::PendingBookingPayload;
use async_trait::async_trait;

/// Durable, session-scoped slot for the one in-flight booking payload.
///
/// Single slot: `put` overwrites any prior uncompleted payload
/// (last-writer-wins, no queue). The slot is cleared exactly once, on
/// successful finalize; it is deliberately retained on finalize failure so a
/// retry resubmits the payload payment was authorized against.
#[async_trait]
pub trait PendingStore: Send + Sync {
    async fn put(
        &self,
        payload: &PendingBookingPayload,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn get(
        &self,
    ) -> Result<Option<PendingBookingPayload>, Box<dyn std::error::Error + Send + Sync>>;

    async fn clear(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
