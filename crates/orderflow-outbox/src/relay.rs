//! Event-to-outbox bridge.

use async_trait::async_trait;
use orderflow_core::error::DomainError;
use orderflow_core::event::StoredEvent;
use orderflow_core::projection::Projection;
use orderflow_ordering::domain::events::{ORDER_CREATED_EVENT_TYPE, PAYMENT_REQUESTED_EVENT_TYPE};
use tracing::debug;

use crate::store::SqliteOutboxStore;

/// Checkpoint name of the outbox relay.
pub const OUTBOX_RELAY_NAME: &str = "outbox-relay";

/// Event types that leave the system as integration messages.
const INTEGRATION_EVENT_TYPES: [&str; 2] = [ORDER_CREATED_EVENT_TYPE, PAYMENT_REQUESTED_EVENT_TYPE];

/// Projection that stages integration events in the outbox.
///
/// Run under its own projector so every qualifying event is enqueued once
/// its offset is checkpointed. Replays are absorbed by the idempotent insert.
#[derive(Clone)]
pub struct OutboxRelay {
    store: SqliteOutboxStore,
}

impl OutboxRelay {
    /// Creates a relay that enqueues into `store`.
    #[must_use]
    pub fn new(store: SqliteOutboxStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Projection for OutboxRelay {
    fn name(&self) -> &str {
        OUTBOX_RELAY_NAME
    }

    async fn apply(&self, event: &StoredEvent) -> Result<(), DomainError> {
        if !INTEGRATION_EVENT_TYPES.contains(&event.event_type.as_str()) {
            return Ok(());
        }
        let inserted = self.store.add_from_event(event).await?;
        debug!(
            event_id = %event.event_id(),
            event_type = %event.event_type,
            inserted,
            "integration event staged"
        );
        Ok(())
    }
}
