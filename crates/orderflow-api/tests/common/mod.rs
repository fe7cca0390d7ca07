//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::{Arc, OnceLock};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use orderflow_core::clock::Clock;
use metrics_exporter_prometheus::PrometheusHandle;
use orderflow_core::metrics::MetricsLagRecorder;
use orderflow_outbox::SqliteOutboxStore;
use orderflow_projection::{
    OrderViewProjection, Projector, SqliteCheckpointStore, SqliteOrderViewStore,
};
use orderflow_test_support::{FixedClock, InMemoryEventLog};
use sqlx::SqlitePool;
use tower::ServiceExt;

use orderflow_api::{http_metrics, routes};
use orderflow_api::state::AppState;

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

/// The process-wide recorder, installed by whichever test gets here first.
pub fn metrics_handle() -> PrometheusHandle {
    static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
    HANDLE
        .get_or_init(|| http_metrics::install_recorder().unwrap())
        .clone()
}

/// One wired application: in-memory event log, SQLite read model and outbox
/// on the test pool, and the order projector that feeds the read model.
pub struct TestApp {
    pub state: AppState,
    pub log: Arc<InMemoryEventLog>,
    pub outbox: SqliteOutboxStore,
    pub projector: Projector<OrderViewProjection>,
}

impl TestApp {
    pub fn new(pool: SqlitePool) -> Self {
        let clock = fixed_clock();
        let log = Arc::new(InMemoryEventLog::new());
        let views = SqliteOrderViewStore::new(pool.clone());
        let outbox = SqliteOutboxStore::new(pool.clone(), Arc::clone(&clock));
        let projector = Projector::new(
            OrderViewProjection::new(views.clone()),
            log.clone(),
            SqliteCheckpointStore::new(pool, Arc::clone(&clock)),
            Arc::new(MetricsLagRecorder),
            Arc::clone(&clock),
        );
        let state = AppState::new(
            clock,
            log.clone(),
            Arc::new(views),
            outbox.clone(),
            metrics_handle(),
        );
        Self {
            state,
            log,
            outbox,
            projector,
        }
    }

    /// Build the app router, as `main.rs` does minus the tower-http layers.
    pub fn router(&self) -> Router {
        routes::router().with_state(self.state.clone())
    }

    /// Runs one projector pass so reads observe earlier writes.
    pub async fn project(&self) {
        self.projector.catch_up().await.unwrap();
    }
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a GET request and return the status, content type and text body.
pub async fn get_text(app: Router, uri: &str) -> (StatusCode, Option<String>, String) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get("content-type")
        .map(|value| value.to_str().unwrap().to_owned());
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();

    (status, content_type, String::from_utf8(body_bytes.to_vec()).unwrap())
}

/// Value of the first sample of `metric` whose labels include every one of
/// `labels` (each written as `name="value"`).
pub fn sample(body: &str, metric: &str, labels: &[&str]) -> Option<f64> {
    let prefix = format!("{metric}{{");
    body.lines()
        .filter(|line| line.starts_with(&prefix))
        .find(|line| labels.iter().all(|label| line.contains(label)))
        .and_then(|line| line.rsplit(' ').next())
        .map(|value| value.parse().unwrap())
}
