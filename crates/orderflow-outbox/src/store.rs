//! SQLite outbox store.
//!
//! Timestamps are stored as Unix milliseconds so the due-message query
//! compares integers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use orderflow_core::clock::Clock;
use orderflow_core::error::DomainError;
use orderflow_core::event::StoredEvent;
use serde::Serialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::message::{OutboxMessage, OutboxStatus};

/// Number of messages per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    /// Messages awaiting delivery.
    pub pending: u64,
    /// Delivered messages.
    pub sent: u64,
    /// Messages that exhausted their attempts.
    pub failed: u64,
}

/// Durable table of integration messages and their delivery state.
#[derive(Clone)]
pub struct SqliteOutboxStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

#[derive(sqlx::FromRow)]
struct OutboxRow {
    message_id: String,
    event_json: String,
    status: String,
    attempts: i64,
    next_attempt_at: i64,
    last_attempt_at: Option<i64>,
    last_error: Option<String>,
}

impl TryFrom<OutboxRow> for OutboxMessage {
    type Error = DomainError;

    fn try_from(row: OutboxRow) -> Result<Self, Self::Error> {
        Ok(Self {
            message_id: Uuid::parse_str(&row.message_id).map_err(|e| {
                DomainError::Serialization(format!("invalid message id {}: {e}", row.message_id))
            })?,
            event: serde_json::from_str(&row.event_json)?,
            status: row.status.parse()?,
            attempts: u32::try_from(row.attempts).map_err(|_| {
                DomainError::Serialization(format!("invalid attempt count {}", row.attempts))
            })?,
            next_attempt_at: from_millis(row.next_attempt_at)?,
            last_attempt_at: row.last_attempt_at.map(from_millis).transpose()?,
            last_error: row.last_error,
        })
    }
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>, DomainError> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| DomainError::Serialization(format!("timestamp {millis} out of range")))
}

fn sql_error(action: &str, err: &sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("failed to {action}: {err}"))
}

const SELECT_COLUMNS: &str = "SELECT message_id, event_json, status, attempts, next_attempt_at, \
     last_attempt_at, last_error FROM outbox_messages";

impl SqliteOutboxStore {
    /// Creates a store over `pool`, reading the current time from `clock`.
    #[must_use]
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    fn now_millis(&self) -> i64 {
        self.clock.now().timestamp_millis()
    }

    /// Enqueues `event` as a pending message, due immediately. Returns
    /// `false` if a message with the same event id already exists.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the insert fails.
    pub async fn add_from_event(&self, event: &StoredEvent) -> Result<bool, DomainError> {
        let now = self.now_millis();
        let result = sqlx::query(
            "INSERT INTO outbox_messages (
                message_id, aggregate_id, event_type, event_json, status, attempts,
                next_attempt_at, created_at, updated_at
             ) VALUES (?, ?, ?, ?, 'pending', 0, ?, ?, ?)
             ON CONFLICT(message_id) DO NOTHING",
        )
        .bind(event.event_id().to_string())
        .bind(&event.metadata.aggregate_id)
        .bind(&event.event_type)
        .bind(serde_json::to_string(event)?)
        .bind(now)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| sql_error("enqueue outbox message", &e))?;
        Ok(result.rows_affected() == 1)
    }

    /// Returns up to `limit` pending messages that are due, oldest
    /// `next_attempt_at` first.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the query fails, or
    /// `DomainError::Serialization` if a stored row is corrupt.
    pub async fn get_pending_messages(&self, limit: u32) -> Result<Vec<OutboxMessage>, DomainError> {
        let rows: Vec<OutboxRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE status = 'pending' AND next_attempt_at <= ? \
             ORDER BY next_attempt_at ASC LIMIT ?"
        ))
        .bind(self.now_millis())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| sql_error("load due outbox messages", &e))?;

        rows.into_iter().map(OutboxMessage::try_from).collect()
    }

    /// Marks a pending message as delivered. Messages already `sent` or
    /// `failed` are left untouched.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the update fails.
    pub async fn mark_as_sent(&self, message_id: Uuid) -> Result<(), DomainError> {
        let now = self.now_millis();
        sqlx::query(
            "UPDATE outbox_messages SET status = 'sent', sent_at = ?, updated_at = ?
             WHERE message_id = ? AND status = 'pending'",
        )
        .bind(now)
        .bind(now)
        .bind(message_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| sql_error("mark outbox message sent", &e))?;
        Ok(())
    }

    /// Records a failed attempt and reschedules the message. Only pending
    /// messages are touched.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the update fails.
    pub async fn record_dispatch_error(
        &self,
        message_id: Uuid,
        attempts: u32,
        next_attempt_at: DateTime<Utc>,
        error: &str,
    ) -> Result<(), DomainError> {
        let now = self.now_millis();
        sqlx::query(
            "UPDATE outbox_messages
             SET attempts = ?, next_attempt_at = ?, last_attempt_at = ?, last_error = ?,
                 updated_at = ?
             WHERE message_id = ? AND status = 'pending'",
        )
        .bind(i64::from(attempts))
        .bind(next_attempt_at.timestamp_millis())
        .bind(now)
        .bind(error)
        .bind(now)
        .bind(message_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| sql_error("record outbox dispatch error", &e))?;
        Ok(())
    }

    /// Parks a pending message as permanently failed.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the update fails.
    pub async fn mark_as_failed(
        &self,
        message_id: Uuid,
        attempts: u32,
        error: &str,
    ) -> Result<(), DomainError> {
        let now = self.now_millis();
        sqlx::query(
            "UPDATE outbox_messages
             SET status = 'failed', attempts = ?, last_attempt_at = ?, last_error = ?,
                 updated_at = ?
             WHERE message_id = ? AND status = 'pending'",
        )
        .bind(i64::from(attempts))
        .bind(now)
        .bind(error)
        .bind(now)
        .bind(message_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| sql_error("mark outbox message failed", &e))?;
        Ok(())
    }

    /// Looks up one message regardless of status.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the query fails, or
    /// `DomainError::Serialization` if the row is corrupt.
    pub async fn get_message(&self, message_id: Uuid) -> Result<Option<OutboxMessage>, DomainError> {
        let row: Option<OutboxRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE message_id = ?"))
                .bind(message_id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| sql_error("load outbox message", &e))?;

        row.map(OutboxMessage::try_from).transpose()
    }

    /// Counts messages per status.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the query fails.
    pub async fn count_by_status(&self) -> Result<StatusCounts, DomainError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM outbox_messages GROUP BY status")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| sql_error("count outbox messages", &e))?;

        let mut counts = StatusCounts::default();
        for (status, count) in rows {
            let count = u64::try_from(count).unwrap_or_default();
            match status.parse::<OutboxStatus>()? {
                OutboxStatus::Pending => counts.pending = count,
                OutboxStatus::Sent => counts.sent = count,
                OutboxStatus::Failed => counts.failed = count,
            }
        }
        Ok(counts)
    }
}
