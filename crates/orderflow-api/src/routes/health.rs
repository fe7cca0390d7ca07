//! Health check endpoint.

use axum::extract::State;
use axum::{Json, Router, routing::get};
use orderflow_core::clock::to_event_timestamp;
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Always `true` while the process serves requests.
    pub ok: bool,
    /// Service name.
    pub service: &'static str,
    /// Current server time.
    pub ts: String,
}

/// GET /healthz
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        service: env!("CARGO_PKG_NAME"),
        ts: to_event_timestamp(state.clock.now()),
    })
}

/// Returns the health check router.
pub fn router() -> Router<AppState> {
    Router::new().route("/healthz", get(health_check))
}
