//! Orderflow API server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use orderflow_api::config::AppConfig;
use orderflow_api::error::AppError;
use orderflow_api::state::AppState;
use orderflow_api::{http_metrics, routes, telemetry};
use orderflow_core::clock::{Clock, SystemClock};
use orderflow_core::event_log::EventLog;
use orderflow_core::metrics::{LagRecorder, MetricsLagRecorder};
use orderflow_event_store::FileEventLog;
use orderflow_outbox::{OutboxDispatcher, OutboxRelay, RabbitMqPublisher, SqliteOutboxStore};
use orderflow_projection::db::{connect, run_migrations};
use orderflow_projection::{OrderViewProjection, Projector, SqliteCheckpointStore, SqliteOrderViewStore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Read configuration from environment.
    let config = AppConfig::from_env()?;
    let tracer_provider = telemetry::init(config.otlp_endpoint.as_deref())?;
    let metrics = http_metrics::install_recorder()?;

    tracing::info!("Starting Orderflow API server");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let lag: Arc<dyn LagRecorder> = Arc::new(MetricsLagRecorder);
    let event_log: Arc<dyn EventLog> = Arc::new(FileEventLog::new(&config.event_log_path));

    // Create database connection pools.
    let read_model_pool = connect(&config.read_model_database_url).await?;
    run_migrations(&read_model_pool).await?;
    let outbox_pool = connect(&config.outbox_database_url).await?;
    run_migrations(&outbox_pool).await?;

    let order_views = SqliteOrderViewStore::new(read_model_pool.clone());
    let outbox = SqliteOutboxStore::new(outbox_pool.clone(), Arc::clone(&clock));

    let order_projector = Projector::new(
        OrderViewProjection::new(order_views.clone()),
        Arc::clone(&event_log),
        SqliteCheckpointStore::new(read_model_pool, Arc::clone(&clock)),
        Arc::clone(&lag),
        Arc::clone(&clock),
    )
    .with_poll_interval(config.projector_poll_interval);

    let outbox_relay = Projector::new(
        OutboxRelay::new(outbox.clone()),
        Arc::clone(&event_log),
        SqliteCheckpointStore::new(outbox_pool, Arc::clone(&clock)),
        Arc::clone(&lag),
        Arc::clone(&clock),
    )
    .with_poll_interval(config.projector_poll_interval);

    let publisher = Arc::new(
        RabbitMqPublisher::new(&config.rabbitmq_url, &config.rabbitmq_queue)
            .map_err(|e| AppError::Config(format!("RABBITMQ_URL: {e}")))?,
    );
    // The dispatcher reconnects on every attempt until the broker comes up.
    if let Err(err) = publisher.connect().await {
        tracing::warn!(error = %err, queue = publisher.queue(), "broker not ready");
    }
    if config.faults.is_enabled() {
        tracing::warn!(faults = ?config.faults, "outbox fault injection enabled");
    }
    let dispatcher = OutboxDispatcher::new(
        outbox.clone(),
        publisher.clone(),
        config.dispatcher.clone(),
        Arc::clone(&clock),
    )
    .with_faults(config.faults.clone());

    // Start background loops.
    let shutdown = CancellationToken::new();
    let mut loops = JoinSet::new();
    loops.spawn({
        let token = shutdown.clone();
        async move { order_projector.run(token).await }
    });
    loops.spawn({
        let token = shutdown.clone();
        async move { outbox_relay.run(token).await }
    });
    loops.spawn({
        let token = shutdown.clone();
        async move { dispatcher.run(token).await }
    });

    // Build application state.
    let app_state = AppState::new(
        clock,
        event_log,
        Arc::new(order_views),
        outbox,
        metrics,
    );

    // Build router.
    let app = routes::router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server.
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let each loop finish its current iteration.
    shutdown.cancel();
    while let Some(joined) = loops.join_next().await {
        if let Err(err) = joined {
            tracing::error!(error = %err, "background loop panicked");
        }
    }
    publisher.close().await;

    tracing::info!("Server shutdown complete");
    telemetry::shutdown(tracer_provider);
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
