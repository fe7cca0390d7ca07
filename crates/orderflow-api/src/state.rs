//! Shared application state.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use orderflow_core::clock::Clock;
use orderflow_core::event_log::EventLog;
use orderflow_ordering::application::request_index::ClientRequestIndex;
use orderflow_ordering::domain::ports::OrderViewRepository;
use orderflow_outbox::SqliteOutboxStore;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Injectable clock.
    pub clock: Arc<dyn Clock>,
    /// Global event log commands append to.
    pub event_log: Arc<dyn EventLog>,
    /// `clientRequestId → orderId` index guarding order creation.
    pub request_index: Arc<ClientRequestIndex>,
    /// Order read model.
    pub order_views: Arc<dyn OrderViewRepository>,
    /// Outbox, for delivery statistics.
    pub outbox: SqliteOutboxStore,
    /// Renders the installed Prometheus recorder.
    pub metrics: PrometheusHandle,
}

impl AppState {
    /// Create new application state with an empty request index.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        event_log: Arc<dyn EventLog>,
        order_views: Arc<dyn OrderViewRepository>,
        outbox: SqliteOutboxStore,
        metrics: PrometheusHandle,
    ) -> Self {
        Self {
            clock,
            event_log,
            request_index: Arc::new(ClientRequestIndex::new()),
            order_views,
            outbox,
            metrics,
        }
    }
}
