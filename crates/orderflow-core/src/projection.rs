//! Projection abstraction.

use async_trait::async_trait;

use crate::error::DomainError;
use crate::event::StoredEvent;

/// A named subscriber that folds the global log into some durable state.
///
/// `apply` is called in strict offset order and may see the same event more
/// than once after a restart, so every write it performs must be an
/// idempotent upsert. Event types it does not care about are skipped with
/// `Ok(())`.
#[async_trait]
pub trait Projection: Send + Sync {
    /// Stable name used as the checkpoint key and metrics label.
    fn name(&self) -> &str;

    /// Apply one event.
    async fn apply(&self, event: &StoredEvent) -> Result<(), DomainError>;
}
