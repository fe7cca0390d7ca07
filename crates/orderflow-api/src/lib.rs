//! Orderflow: HTTP API, configuration and process bootstrap.

pub mod config;
pub mod error;
pub mod http_metrics;
pub mod routes;
pub mod state;
pub mod telemetry;
