//! Generic catch-up projector loop.

use std::sync::Arc;
use std::time::Duration;

use futures::TryStreamExt;
use orderflow_core::clock::Clock;
use orderflow_core::error::DomainError;
use orderflow_core::event::StoredEvent;
use orderflow_core::event_log::EventLog;
use orderflow_core::metrics::{LagRecorder, clamp_lag};
use orderflow_core::projection::Projection;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::checkpoint::SqliteCheckpointStore;

/// Default delay between polls of an exhausted log.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Replays the event log into a [`Projection`] from its last checkpoint.
///
/// The checkpoint advances only after an event has been applied, so a crash
/// between the two reapplies that event on restart.
pub struct Projector<P> {
    projection: P,
    log: Arc<dyn EventLog>,
    checkpoints: SqliteCheckpointStore,
    lag: Arc<dyn LagRecorder>,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
}

impl<P: Projection> Projector<P> {
    /// Creates a projector polling every [`DEFAULT_POLL_INTERVAL`].
    #[must_use]
    pub fn new(
        projection: P,
        log: Arc<dyn EventLog>,
        checkpoints: SqliteCheckpointStore,
        lag: Arc<dyn LagRecorder>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            projection,
            log,
            checkpoints,
            lag,
            clock,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Sets the delay between polls of an exhausted log.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Returns the projection's name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.projection.name()
    }

    /// Runs one pass: streams every event after the checkpoint through the
    /// projection. Returns how many events were processed.
    ///
    /// # Errors
    ///
    /// Returns the first error from the log, the projection or the
    /// checkpoint store. Events processed before it stay checkpointed.
    pub async fn catch_up(&self) -> Result<usize, DomainError> {
        let name = self.projection.name();
        let from_offset = self
            .checkpoints
            .get_last_offset(name)
            .await?
            .map_or(0, |offset| offset + 1);

        let mut stream = self.log.stream(from_offset);
        let mut processed = 0;
        while let Some(event) = stream.try_next().await? {
            if let Err(err) = self.projection.apply(&event).await {
                error!(
                    projector = name,
                    offset = event.offset,
                    event_type = %event.event_type,
                    event_id = %event.event_id(),
                    error = %err,
                    "failed to project event"
                );
                return Err(err);
            }
            self.checkpoints.save_last_offset(name, event.offset).await?;
            self.record_lag(&event);
            processed += 1;
        }
        Ok(processed)
    }

    #[allow(clippy::cast_precision_loss)]
    fn record_lag(&self, event: &StoredEvent) {
        let Some(occurred_at) = event.metadata.occurred_at() else {
            debug!(
                projector = self.projection.name(),
                offset = event.offset,
                ts = %event.metadata.ts,
                "unparseable event timestamp, lag not updated"
            );
            return;
        };
        let lag_ms = (self.clock.now() - occurred_at).num_milliseconds();
        self.lag
            .record_lag(self.projection.name(), clamp_lag(lag_ms as f64 / 1000.0));
    }

    /// Runs [`catch_up`](Self::catch_up) until `token` is cancelled. Errors are
    /// logged and retried after the poll interval; the pass in progress
    /// always completes before this returns.
    pub async fn run(&self, token: CancellationToken) {
        let name = self.projection.name();
        info!(projector = name, "projector started");
        while !token.is_cancelled() {
            let idle = match self.catch_up().await {
                Ok(0) => true,
                Ok(processed) => {
                    debug!(projector = name, processed, "projector caught up");
                    false
                }
                Err(err) => {
                    error!(projector = name, error = %err, "projector iteration failed");
                    true
                }
            };
            if idle {
                tokio::select! {
                    () = token.cancelled() => break,
                    () = tokio::time::sleep(self.poll_interval) => {}
                }
            }
        }
        info!(projector = name, "projector stopped");
    }
}
