//! Shared fixtures for outbox integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use orderflow_core::error::DomainError;
use orderflow_core::event::{DomainEvent, EventMetadata, StoredEvent};
use orderflow_outbox::{IntegrationEventPublisher, OutboxMessage, SqliteOutboxStore};
use orderflow_test_support::FixedClock;
use sqlx::SqlitePool;
use uuid::Uuid;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
}

pub fn at_millis(offset_ms: i64) -> DateTime<Utc> {
    t0() + TimeDelta::milliseconds(offset_ms)
}

/// An outbox store whose clock is pinned to `at`.
pub fn store_at(pool: &SqlitePool, at: DateTime<Utc>) -> SqliteOutboxStore {
    SqliteOutboxStore::new(pool.clone(), Arc::new(FixedClock(at)))
}

pub fn stored_event(event_type: &str, aggregate_id: &str, offset: u64) -> StoredEvent {
    StoredEvent::new(
        DomainEvent {
            event_type: event_type.to_owned(),
            payload: serde_json::json!({"orderId": aggregate_id}),
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                aggregate_id: aggregate_id.to_owned(),
                version: 1,
                ts: "2026-01-15T10:00:00.000Z".to_owned(),
            },
        },
        offset,
    )
}

/// Accepts every message and remembers it.
#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<OutboxMessage>>,
}

impl RecordingPublisher {
    pub fn published(&self) -> Vec<OutboxMessage> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl IntegrationEventPublisher for RecordingPublisher {
    async fn publish(&self, message: &OutboxMessage) -> Result<(), DomainError> {
        self.published.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Rejects every message.
pub struct FailingPublisher;

#[async_trait]
impl IntegrationEventPublisher for FailingPublisher {
    async fn publish(&self, _message: &OutboxMessage) -> Result<(), DomainError> {
        Err(DomainError::Delivery("broker down".to_owned()))
    }
}
