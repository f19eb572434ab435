//! Post-connection authentication handshake.
//!
//! Connections open anonymously; the client then submits an opaque
//! session token. [`AuthHandshake`] verifies it through the
//! [`SessionVerifier`] collaborator, binds the identity to the
//! connection, joins the standard rooms, and counts the connection
//! toward the user's presence. Every outcome is answered on the wire:
//! `authenticated` on success, `authentication-error` otherwise, and
//! the connection always stays open.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::collaborators::{SessionIdentity, SessionVerifier};
use crate::domain::gateway::BindOutcome;
use crate::domain::{ConnectionGateway, ConnectionId, ServerEvent};
use crate::service::presence::PresenceService;

/// Drives the authenticate flow for one token submission.
#[derive(Clone)]
pub struct AuthHandshake {
    gateway: Arc<ConnectionGateway>,
    verifier: Arc<dyn SessionVerifier>,
    presence: Arc<PresenceService>,
}

impl std::fmt::Debug for AuthHandshake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthHandshake").finish()
    }
}

impl AuthHandshake {
    /// Creates a handshake service.
    #[must_use]
    pub fn new(
        gateway: Arc<ConnectionGateway>,
        verifier: Arc<dyn SessionVerifier>,
        presence: Arc<PresenceService>,
    ) -> Self {
        Self {
            gateway,
            verifier,
            presence,
        }
    }

    /// Verifies `token` and binds the resulting identity to `conn`.
    ///
    /// Returns `true` when the connection ends up authenticated (fresh
    /// bind or repeat of the same identity).
    pub async fn authenticate(&self, conn: ConnectionId, token: &str) -> bool {
        let identity = match self.verifier.verify(token).await {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                self.reject(conn, "invalid or expired session token").await;
                return false;
            }
            Err(e) => {
                error!(conn_id = %conn, error = %e, "session verification failed");
                self.reject(conn, "session verification unavailable").await;
                return false;
            }
        };

        match self
            .gateway
            .bind_identity(conn, identity.user_id, identity.role)
            .await
        {
            BindOutcome::Bound => {
                self.presence.connection_opened(identity.user_id).await;
                self.acknowledge(conn, &identity).await;
                info!(conn_id = %conn, user_id = %identity.user_id, role = %identity.role, "connection authenticated");
                true
            }
            // Same identity again: acknowledge without re-counting.
            BindOutcome::AlreadyBoundSame => {
                self.acknowledge(conn, &identity).await;
                true
            }
            BindOutcome::AlreadyBoundOther => {
                warn!(conn_id = %conn, "rejected identity switch on bound connection");
                self.reject(conn, "connection is already authenticated as another user")
                    .await;
                false
            }
            BindOutcome::Gone => false,
        }
    }

    async fn acknowledge(&self, conn: ConnectionId, identity: &SessionIdentity) {
        let event = ServerEvent::Authenticated {
            success: true,
            user_id: identity.user_id,
            role: identity.role,
        };
        self.gateway.emit_to_connection(conn, &event).await;
    }

    async fn reject(&self, conn: ConnectionId, message: &str) {
        let event = ServerEvent::AuthenticationError {
            message: message.to_string(),
        };
        self.gateway.emit_to_connection(conn, &event).await;
    }
}
