//! REST endpoint handlers.
//!
//! The gateway's HTTP surface is deliberately small: dashboards talk to
//! the WebSocket endpoint, and HTTP exists for probes and operators.

pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all REST routes.
pub fn routes() -> Router<AppState> {
    Router::new().merge(system::routes())
}
