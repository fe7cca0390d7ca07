//! Outbox dispatcher loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use orderflow_core::clock::Clock;
use orderflow_core::error::DomainError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::message::OutboxMessage;
use crate::publisher::IntegrationEventPublisher;
use crate::store::SqliteOutboxStore;

/// Dispatcher tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Delay between polls when nothing is due.
    pub poll_interval: Duration,
    /// Maximum messages fetched per iteration.
    pub batch_size: u32,
    /// Attempts after which a message is parked as failed.
    pub max_attempts: u32,
    /// Backoff after the first failed attempt.
    pub base_backoff: Duration,
    /// Upper bound on any backoff.
    pub max_backoff: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            batch_size: 10,
            max_attempts: 5,
            base_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl DispatcherConfig {
    /// Delay before retrying a message that has failed `attempts` times:
    /// `base * 2^(attempts - 1)`, capped at `max_backoff`.
    #[must_use]
    pub fn calculate_backoff(&self, attempts: u32) -> Duration {
        2u32.checked_pow(attempts.saturating_sub(1))
            .and_then(|factor| self.base_backoff.checked_mul(factor))
            .map_or(self.max_backoff, |backoff| backoff.min(self.max_backoff))
    }
}

/// Test-only switches that force publish failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaultInjection {
    /// Fail the first publish attempt of this dispatcher, once.
    pub fail_once: bool,
    /// Fail every publish of events with this type.
    pub fail_event_type: Option<String>,
    /// Fail while a message has fewer than this many recorded attempts.
    pub fail_until_attempts: Option<u32>,
}

impl FaultInjection {
    /// Returns `true` if any switch is set.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.fail_once || self.fail_event_type.is_some() || self.fail_until_attempts.is_some()
    }
}

/// Polls the outbox for due messages and publishes them.
pub struct OutboxDispatcher {
    store: SqliteOutboxStore,
    publisher: Arc<dyn IntegrationEventPublisher>,
    config: DispatcherConfig,
    faults: FaultInjection,
    clock: Arc<dyn Clock>,
    fail_once_pending: AtomicBool,
}

impl OutboxDispatcher {
    /// Creates a dispatcher with fault injection disabled.
    #[must_use]
    pub fn new(
        store: SqliteOutboxStore,
        publisher: Arc<dyn IntegrationEventPublisher>,
        config: DispatcherConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            publisher,
            config,
            faults: FaultInjection::default(),
            clock,
            fail_once_pending: AtomicBool::new(false),
        }
    }

    /// Enables forced failures.
    #[must_use]
    pub fn with_faults(mut self, faults: FaultInjection) -> Self {
        self.fail_once_pending = AtomicBool::new(faults.fail_once);
        self.faults = faults;
        self
    }

    fn injected_fault(&self, message: &OutboxMessage) -> Option<String> {
        if self.fail_once_pending.swap(false, Ordering::SeqCst) {
            return Some("injected failure: fail once".to_owned());
        }
        if self
            .faults
            .fail_event_type
            .as_deref()
            .is_some_and(|event_type| event_type == message.event.event_type)
        {
            return Some(format!(
                "injected failure for event type {}",
                message.event.event_type
            ));
        }
        if let Some(threshold) = self.faults.fail_until_attempts {
            if message.attempts < threshold {
                return Some(format!(
                    "injected failure until {threshold} attempts (at {})",
                    message.attempts
                ));
            }
        }
        None
    }

    async fn publish(&self, message: &OutboxMessage) -> Result<(), String> {
        if let Some(fault) = self.injected_fault(message) {
            return Err(fault);
        }
        self.publisher
            .publish(message)
            .await
            .map_err(|err| err.to_string())
    }

    fn retry_at(&self, backoff: Duration) -> DateTime<Utc> {
        let now = self.clock.now();
        TimeDelta::from_std(backoff)
            .ok()
            .and_then(|delay| now.checked_add_signed(delay))
            .unwrap_or(now)
    }

    /// Runs one iteration: publishes every due message in one batch and
    /// records the outcome of each. Returns how many messages were handled.
    ///
    /// # Errors
    ///
    /// Returns the first store error. Publish failures are recorded on the
    /// message and never returned.
    pub async fn dispatch_batch(&self) -> Result<usize, DomainError> {
        let messages = self
            .store
            .get_pending_messages(self.config.batch_size)
            .await?;

        for message in &messages {
            match self.publish(message).await {
                Ok(()) => {
                    self.store.mark_as_sent(message.message_id).await?;
                    info!(
                        message_id = %message.message_id,
                        event_type = %message.event.event_type,
                        aggregate_id = %message.event.metadata.aggregate_id,
                        "outbox message sent"
                    );
                }
                Err(reason) => self.record_failure(message, &reason).await?,
            }
        }
        Ok(messages.len())
    }

    async fn record_failure(&self, message: &OutboxMessage, reason: &str) -> Result<(), DomainError> {
        let attempts = message.attempts.saturating_add(1);
        if attempts >= self.config.max_attempts {
            self.store
                .mark_as_failed(message.message_id, attempts, reason)
                .await?;
            error!(
                message_id = %message.message_id,
                event_type = %message.event.event_type,
                attempts,
                error = reason,
                "outbox message failed permanently"
            );
            return Ok(());
        }

        let backoff = self.config.calculate_backoff(attempts);
        self.store
            .record_dispatch_error(message.message_id, attempts, self.retry_at(backoff), reason)
            .await?;
        warn!(
            message_id = %message.message_id,
            event_type = %message.event.event_type,
            attempts,
            backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
            error = reason,
            "outbox dispatch failed, retry scheduled"
        );
        Ok(())
    }

    /// Runs [`dispatch_batch`](Self::dispatch_batch) until `token` is
    /// cancelled. Store errors are logged and retried after the poll
    /// interval. The batch in progress always completes before this returns.
    pub async fn run(&self, token: CancellationToken) {
        info!(
            batch_size = self.config.batch_size,
            max_attempts = self.config.max_attempts,
            faults = self.faults.is_enabled(),
            "outbox dispatcher started"
        );
        while !token.is_cancelled() {
            let idle = match self.dispatch_batch().await {
                Ok(0) => true,
                Ok(handled) => {
                    debug!(handled, "outbox batch dispatched");
                    false
                }
                Err(err) => {
                    error!(error = %err, "outbox dispatch iteration failed");
                    true
                }
            };
            if idle {
                tokio::select! {
                    () = token.cancelled() => break,
                    () = tokio::time::sleep(self.config.poll_interval) => {}
                }
            }
        }
        info!("outbox dispatcher stopped");
    }
}
