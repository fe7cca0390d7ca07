//! Prometheus scrape endpoint.

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::{Router, routing::get};

use crate::error::ApiError;
use crate::http_metrics::{PROMETHEUS_CONTENT_TYPE, record_outbox_counts};
use crate::state::AppState;

/// GET /metrics
///
/// Refreshes the outbox gauges, then renders every series in the Prometheus
/// text format.
async fn metrics(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    record_outbox_counts(&state.outbox.count_by_status().await?);
    Ok((
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        state.metrics.render(),
    ))
}

/// Returns the metrics router.
pub fn router() -> Router<AppState> {
    Router::new().route("/metrics", get(metrics))
}
