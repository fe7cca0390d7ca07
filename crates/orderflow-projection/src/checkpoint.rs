//! Projector checkpoints.

use std::sync::Arc;

use orderflow_core::clock::{Clock, to_event_timestamp};
use orderflow_core::error::DomainError;
use sqlx::SqlitePool;

/// Persists the last processed log offset per projector name.
#[derive(Clone)]
pub struct SqliteCheckpointStore {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl SqliteCheckpointStore {
    /// Creates a store over `pool`, stamping rows with `clock`.
    #[must_use]
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    /// Returns the last offset `projector` saved, or `None` if it never ran.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the query fails, or
    /// `DomainError::Serialization` if the stored offset is negative.
    pub async fn get_last_offset(&self, projector: &str) -> Result<Option<u64>, DomainError> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT last_offset FROM projection_checkpoints WHERE projector_name = ?",
        )
        .bind(projector)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::Infrastructure(format!("failed to load checkpoint: {e}")))?;

        row.map(|(offset,)| {
            u64::try_from(offset).map_err(|_| {
                DomainError::Serialization(format!("negative checkpoint {offset} for {projector}"))
            })
        })
        .transpose()
    }

    /// Records `offset` as the last one `projector` processed.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the write fails.
    pub async fn save_last_offset(&self, projector: &str, offset: u64) -> Result<(), DomainError> {
        let offset = i64::try_from(offset)
            .map_err(|_| DomainError::Infrastructure(format!("offset {offset} out of range")))?;

        sqlx::query(
            "INSERT INTO projection_checkpoints (projector_name, last_offset, updated_at) \
             VALUES (?, ?, ?) \
             ON CONFLICT(projector_name) DO UPDATE SET \
                 last_offset = excluded.last_offset, \
                 updated_at = excluded.updated_at",
        )
        .bind(projector)
        .bind(offset)
        .bind(to_event_timestamp(self.clock.now()))
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::Infrastructure(format!("failed to save checkpoint: {e}")))?;
        Ok(())
    }
}
