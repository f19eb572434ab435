//! pulse-gateway server entry point.
//!
//! Wires the persistence-backed or in-memory collaborators, starts the
//! periodic collector loops, and serves the HTTP + WebSocket endpoints
//! until shutdown.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use pulse_gateway::api;
use pulse_gateway::app_state::AppState;
use pulse_gateway::collaborators::jwt::JwtSessionVerifier;
use pulse_gateway::collaborators::memory::{
    InMemoryActivityStore, InMemoryMetricStore, InMemoryUserDirectory, StaticProbe,
};
use pulse_gateway::collaborators::sysinfo::SysinfoMetricsSource;
use pulse_gateway::collaborators::{
    ActivityStore, MetricStore, MetricsSource, ServiceProbe, SessionVerifier, UserDirectory,
};
use pulse_gateway::config::GatewayConfig;
use pulse_gateway::domain::ConnectionGateway;
use pulse_gateway::persistence::{
    self, DatabaseProbe, PostgresActivityStore, PostgresMetricStore, PostgresUserDirectory,
};
use pulse_gateway::service::{
    ActivityRelay, AuthHandshake, Broadcaster, MetricsCollector, PresenceService,
};
use pulse_gateway::ws::handler::ws_handler;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = GatewayConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting pulse-gateway");

    // Build domain layer
    let gateway = Arc::new(ConnectionGateway::new(config.event_buffer_size));

    // Wire collaborators: durable stores when persistence is enabled,
    // in-memory fallbacks otherwise.
    let mut probes: Vec<Arc<dyn ServiceProbe>> =
        vec![Arc::new(StaticProbe::new("gateway", true))];
    let (directory, metric_store, activity_store): (
        Arc<dyn UserDirectory>,
        Arc<dyn MetricStore>,
        Arc<dyn ActivityStore>,
    ) = if config.persistence_enabled {
        let pool = persistence::connect(&config).await?;
        persistence::run_migrations(&pool).await?;
        probes.push(Arc::new(DatabaseProbe::new(pool.clone())));
        (
            Arc::new(PostgresUserDirectory::new(pool.clone())),
            Arc::new(PostgresMetricStore::new(pool.clone())),
            Arc::new(PostgresActivityStore::new(pool)),
        )
    } else {
        tracing::warn!("persistence disabled; presence flags and activity will not survive restarts");
        (
            Arc::new(InMemoryUserDirectory::new()),
            Arc::new(InMemoryMetricStore::new()),
            Arc::new(InMemoryActivityStore::new()),
        )
    };

    let verifier: Arc<dyn SessionVerifier> = Arc::new(JwtSessionVerifier::new(&config.jwt_secret));
    let metrics_source: Arc<dyn MetricsSource> = Arc::new(SysinfoMetricsSource::new(probes));

    // Build service layer
    let presence = Arc::new(PresenceService::new(
        Arc::clone(&gateway),
        Arc::clone(&directory),
    ));
    if let Err(e) = presence.seed().await {
        tracing::warn!(error = %e, "failed to reset online flags at startup");
    }
    let auth = Arc::new(AuthHandshake::new(
        Arc::clone(&gateway),
        verifier,
        Arc::clone(&presence),
    ));
    let relay = Arc::new(ActivityRelay::new(
        Arc::clone(&gateway),
        Arc::clone(&activity_store),
    ));
    let broadcaster = Broadcaster::new(Arc::clone(&gateway));

    // Start periodic loops
    let collector = Arc::new(MetricsCollector::new(
        Arc::clone(&gateway),
        Arc::clone(&metrics_source),
        metric_store,
        activity_store,
        Arc::clone(&presence),
        Duration::from_secs(config.metrics_interval_secs),
        Duration::from_secs(config.activity_catchup_interval_secs),
    ));
    let collector_handle = collector.start();

    // Build application state
    let app_state = AppState {
        gateway,
        auth,
        presence,
        relay,
        broadcaster,
        metrics_source,
        auth_timeout: Duration::from_secs(config.auth_timeout_secs),
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    collector_handle.shutdown().await;
    tracing::info!("gateway stopped");

    Ok(())
}

/// Resolves when the process receives Ctrl-C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
