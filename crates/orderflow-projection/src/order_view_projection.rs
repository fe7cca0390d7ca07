//! Projection of order events into `order_views`.

use async_trait::async_trait;
use orderflow_core::error::DomainError;
use orderflow_core::event::StoredEvent;
use orderflow_core::projection::Projection;
use orderflow_ordering::domain::events::{OrderEvent, OrderEventKind};

use crate::order_view_store::SqliteOrderViewStore;

/// Checkpoint name of the order read-model projector.
pub const ORDER_PROJECTOR_NAME: &str = "order-sqlite-projector";

/// Applies `order.created` and `payment.requested` to the read model and
/// ignores every other event type.
#[derive(Debug, Clone)]
pub struct OrderViewProjection {
    store: SqliteOrderViewStore,
}

impl OrderViewProjection {
    /// Creates a projection writing to `store`.
    #[must_use]
    pub fn new(store: SqliteOrderViewStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Projection for OrderViewProjection {
    fn name(&self) -> &str {
        ORDER_PROJECTOR_NAME
    }

    async fn apply(&self, event: &StoredEvent) -> Result<(), DomainError> {
        let event = OrderEvent::from_stored(event)?;
        match &event.kind {
            OrderEventKind::OrderCreated(created) => {
                self.store.upsert_created(created, &event.metadata).await
            }
            OrderEventKind::PaymentRequested(requested) => {
                self.store
                    .mark_payment_requested(requested, &event.metadata)
                    .await
            }
            OrderEventKind::Unrecognized { .. } => Ok(()),
        }
    }
}
