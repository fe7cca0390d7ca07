//! `clientRequestId -> orderId` index over the event log.
//!
//! Built lazily on first use and advanced from its own high-water offset
//! before every lookup, so orders appended by other writers are still seen.
//! Holding the guard returned by [`ClientRequestIndex::lock`] across the
//! lookup and the append makes check-then-create atomic within a process.

use std::collections::HashMap;

use futures::TryStreamExt;
use orderflow_core::error::DomainError;
use orderflow_core::event::StoredEvent;
use orderflow_core::event_log::EventLog;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::domain::events::{ORDER_CREATED_EVENT_TYPE, OrderCreated};

/// Shared index of created orders by idempotency key.
#[derive(Debug, Default)]
pub struct ClientRequestIndex {
    inner: Mutex<RequestIndexState>,
}

/// The index contents, reachable only through [`ClientRequestIndex::lock`].
#[derive(Debug, Default)]
pub struct RequestIndexState {
    entries: HashMap<Uuid, String>,
    next_offset: u64,
}

impl ClientRequestIndex {
    /// Creates an empty index positioned at offset 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires exclusive access to the index.
    pub async fn lock(&self) -> MutexGuard<'_, RequestIndexState> {
        self.inner.lock().await
    }
}

impl RequestIndexState {
    /// Reads every record appended since the last catch-up.
    ///
    /// # Errors
    ///
    /// Returns the log's error if reading fails. Records read before the
    /// failure stay indexed.
    pub async fn catch_up(&mut self, log: &dyn EventLog) -> Result<(), DomainError> {
        let mut stream = log.stream(self.next_offset);
        while let Some(event) = stream.try_next().await? {
            self.observe(&event);
        }
        Ok(())
    }

    /// Indexes one record. The first `order.created` per key wins.
    pub fn observe(&mut self, event: &StoredEvent) {
        self.next_offset = self.next_offset.max(event.offset + 1);
        if event.event_type != ORDER_CREATED_EVENT_TYPE {
            return;
        }
        match serde_json::from_value::<OrderCreated>(event.payload.clone()) {
            Ok(created) => {
                self.entries
                    .entry(created.client_request_id)
                    .or_insert(created.order_id);
            }
            Err(e) => {
                tracing::warn!(
                    offset = event.offset,
                    error = %e,
                    "skipping malformed order.created record"
                );
            }
        }
    }

    /// Returns the order created for `client_request_id`, if any.
    #[must_use]
    pub fn order_for(&self, client_request_id: Uuid) -> Option<&str> {
        self.entries.get(&client_request_id).map(String::as_str)
    }

    /// Offset of the next record this index has not seen.
    #[must_use]
    pub fn next_offset(&self) -> u64 {
        self.next_offset
    }
}

#[cfg(test)]
mod tests {
    use orderflow_core::event::{DomainEvent, EventMetadata};
    use orderflow_test_support::InMemoryEventLog;
    use serde_json::json;

    use super::*;

    fn order_created(client_request_id: Uuid, order_id: &str) -> DomainEvent {
        DomainEvent {
            event_type: ORDER_CREATED_EVENT_TYPE.to_owned(),
            payload: json!({
                "orderId": order_id,
                "clientRequestId": client_request_id,
                "customerId": Uuid::new_v4(),
                "items": [{"sku": "A", "quantity": 1, "unitPrice": 1.0}],
                "totalAmount": 1.0,
                "currency": "USD"
            }),
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                aggregate_id: order_id.to_owned(),
                version: 1,
                ts: "2026-01-15T10:00:00.000Z".to_owned(),
            },
        }
    }

    #[tokio::test]
    async fn test_catch_up_indexes_existing_orders() {
        let log = InMemoryEventLog::new();
        let key = Uuid::new_v4();
        log.append(order_created(key, "order-1")).await.unwrap();
        let index = ClientRequestIndex::new();

        let mut state = index.lock().await;
        state.catch_up(&log).await.unwrap();

        assert_eq!(state.order_for(key), Some("order-1"));
        assert_eq!(state.order_for(Uuid::new_v4()), None);
        assert_eq!(state.next_offset(), 1);
    }

    #[tokio::test]
    async fn test_catch_up_sees_records_appended_later() {
        let log = InMemoryEventLog::new();
        let index = ClientRequestIndex::new();
        index.lock().await.catch_up(&log).await.unwrap();
        let key = Uuid::new_v4();
        log.append(order_created(key, "order-2")).await.unwrap();

        let mut state = index.lock().await;
        state.catch_up(&log).await.unwrap();

        assert_eq!(state.order_for(key), Some("order-2"));
    }

    #[tokio::test]
    async fn test_first_order_for_a_key_wins() {
        let log = InMemoryEventLog::new();
        let key = Uuid::new_v4();
        log.append(order_created(key, "first")).await.unwrap();
        log.append(order_created(key, "second")).await.unwrap();
        let index = ClientRequestIndex::new();

        let mut state = index.lock().await;
        state.catch_up(&log).await.unwrap();

        assert_eq!(state.order_for(key), Some("first"));
    }

    #[tokio::test]
    async fn test_malformed_record_is_skipped() {
        let log = InMemoryEventLog::new();
        let mut bad = order_created(Uuid::new_v4(), "bad");
        bad.payload = json!({"orderId": 7});
        log.append(bad).await.unwrap();
        let index = ClientRequestIndex::new();

        let mut state = index.lock().await;
        state.catch_up(&log).await.unwrap();

        assert_eq!(state.next_offset(), 1);
        assert!(state.entries.is_empty());
    }
}
