//! Shared application state injected into all Axum handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::collaborators::MetricsSource;
use crate::domain::ConnectionGateway;
use crate::service::{ActivityRelay, AuthHandshake, Broadcaster, PresenceService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Clone)]
pub struct AppState {
    /// Connection and room bookkeeping.
    pub gateway: Arc<ConnectionGateway>,
    /// Authentication handshake flow.
    pub auth: Arc<AuthHandshake>,
    /// Presence tracking.
    pub presence: Arc<PresenceService>,
    /// Activity event relay.
    pub relay: Arc<ActivityRelay>,
    /// Stateless fanout façade.
    pub broadcaster: Broadcaster,
    /// System sampler for on-demand metric requests.
    pub metrics_source: Arc<dyn MetricsSource>,
    /// How long an anonymous connection may idle before being closed.
    pub auth_timeout: Duration,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("auth_timeout", &self.auth_timeout)
            .finish()
    }
}
