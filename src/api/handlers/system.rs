//! System endpoints: health check and gateway statistics.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;
use crate::domain::Role;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
}

/// `GET /health` — Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, and current timestamp.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

/// Gateway statistics response.
#[derive(Debug, Serialize, ToSchema)]
struct StatsResponse {
    timestamp: String,
    /// Open WebSocket connections, authenticated or not.
    connections: usize,
    /// Distinct identities currently online.
    online_users: usize,
    /// Connections bound to an admin identity.
    admin_connections: usize,
}

/// `GET /stats` — Live gateway statistics.
///
/// Operator-facing: deploy behind ingress access control.
#[utoipa::path(
    get,
    path = "/stats",
    tag = "System",
    summary = "Gateway statistics",
    description = "Returns live connection, presence, and admin counts.",
    responses(
        (status = 200, description = "Current gateway counts", body = StatsResponse),
    )
)]
pub async fn stats_handler(State(state): State<AppState>) -> impl IntoResponse {
    let connections = state.gateway.connection_count().await;
    let online_users = state.presence.online_count().await;
    let admin_connections = state.gateway.connections_with_role(Role::Admin).await.len();
    (
        StatusCode::OK,
        Json(StatsResponse {
            timestamp: Utc::now().to_rfc3339(),
            connections,
            online_users,
            admin_connections,
        }),
    )
}

/// System routes mounted at the root level.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
}
