//! Prometheus recorder and HTTP request metrics.

use std::time::Instant;

use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use orderflow_core::metrics::PROJECTOR_LAG_METRIC;
use orderflow_outbox::StatusCounts;

use crate::error::AppError;

/// Histogram of request durations, labelled by `method`, `route` and
/// `status`.
pub const HTTP_REQUEST_DURATION_METRIC: &str = "http_server_request_duration_seconds";
/// Counter of responses, labelled by `method`, `route` and `status_class`.
pub const HTTP_RESPONSES_METRIC: &str = "http_server_responses_total";
/// Gauge of outbox messages, labelled by `status`.
pub const OUTBOX_MESSAGES_METRIC: &str = "outbox_messages";

/// Content type of the Prometheus text exposition format.
pub const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

const DURATION_BUCKETS: [f64; 9] = [0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0];

/// Installs the process-wide Prometheus recorder and describes every series.
///
/// # Errors
///
/// Returns `AppError::Telemetry` if a recorder is already installed.
pub fn install_recorder() -> Result<PrometheusHandle, AppError> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(HTTP_REQUEST_DURATION_METRIC.to_owned()),
            &DURATION_BUCKETS,
        )
        .and_then(PrometheusBuilder::install_recorder)
        .map_err(|e| AppError::Telemetry(format!("metrics recorder: {e}")))?;

    ::metrics::describe_histogram!(
        HTTP_REQUEST_DURATION_METRIC,
        ::metrics::Unit::Seconds,
        "HTTP server request duration in seconds"
    );
    ::metrics::describe_counter!(
        HTTP_RESPONSES_METRIC,
        "Total HTTP responses grouped by status class"
    );
    ::metrics::describe_gauge!(
        PROJECTOR_LAG_METRIC,
        ::metrics::Unit::Seconds,
        "Lag in seconds between the latest processed event and now"
    );
    ::metrics::describe_gauge!(OUTBOX_MESSAGES_METRIC, "Outbox messages per delivery status");

    Ok(handle)
}

/// Records the duration and status class of every routed request.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().as_str().to_owned();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path().to_owned(), |path| path.as_str().to_owned());

    let response = next.run(request).await;

    let status = response.status().as_u16();
    ::metrics::histogram!(
        HTTP_REQUEST_DURATION_METRIC,
        "method" => method.clone(),
        "route" => route.clone(),
        "status" => status.to_string()
    )
    .record(start.elapsed().as_secs_f64());
    ::metrics::counter!(
        HTTP_RESPONSES_METRIC,
        "method" => method,
        "route" => route,
        "status_class" => status_class(status)
    )
    .increment(1);

    response
}

/// Sets the outbox gauges from a fresh count.
#[allow(clippy::cast_precision_loss)]
pub fn record_outbox_counts(counts: &StatusCounts) {
    for (status, count) in [
        ("pending", counts.pending),
        ("sent", counts.sent),
        ("failed", counts.failed),
    ] {
        ::metrics::gauge!(OUTBOX_MESSAGES_METRIC, "status" => status).set(count as f64);
    }
}

fn status_class(status: u16) -> &'static str {
    match status {
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        500..=599 => "5xx",
        _ => "other",
    }
}
