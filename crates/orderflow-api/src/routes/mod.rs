//! Route modules.

pub mod health;
pub mod metrics;
pub mod orders;

use axum::Router;
use axum::middleware;

use crate::http_metrics::track_requests;
use crate::state::AppState;

/// Every route, with request metrics recorded per matched route.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(metrics::router())
        .merge(orders::router())
        .route_layer(middleware::from_fn(track_requests))
}
