//! Collaborator contracts the gateway depends on.
//!
//! Session verification, user directory updates, system sampling, and
//! durable stores are all reached through the traits in this module.
//! The gateway never talks to a database driver or token library
//! directly: production wiring injects [`jwt::JwtSessionVerifier`],
//! [`sysinfo::SysinfoMetricsSource`], and the PostgreSQL stores from
//! [`crate::persistence`], while tests and persistence-disabled
//! deployments use the in-memory implementations from [`memory`].

pub mod jwt;
pub mod memory;
pub mod sysinfo;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{ActivityEvent, MetricSnapshot, Role, SystemSample, UserId};
use crate::error::GatewayError;

/// Identity extracted from a verified session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionIdentity {
    /// Verified user ID.
    pub user_id: UserId,
    /// Role granted to the session.
    pub role: Role,
}

/// Verifies opaque session tokens presented during the handshake.
///
/// `Ok(None)` means the token was checked and rejected (malformed,
/// expired, bad signature); `Err` is reserved for infrastructure
/// failures while checking. Callers surface both to the client as an
/// authentication error, but only the latter is logged as a failure of
/// the gateway itself.
#[async_trait]
pub trait SessionVerifier: Send + Sync {
    /// Verifies `token` and returns the session identity it carries.
    ///
    /// # Errors
    ///
    /// Returns an error when the verification machinery itself fails;
    /// a rejected token is `Ok(None)`, not an error.
    async fn verify(&self, token: &str) -> Result<Option<SessionIdentity>, GatewayError>;
}

/// Records user online/offline flags in the platform's user directory.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Persists a user's online flag together with a last-seen timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] when the directory is
    /// unreachable.
    async fn set_online_status(
        &self,
        user: UserId,
        online: bool,
        at: DateTime<Utc>,
    ) -> Result<(), GatewayError>;

    /// Returns the users currently flagged online.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] when the directory is
    /// unreachable.
    async fn online_user_ids(&self) -> Result<Vec<UserId>, GatewayError>;

    /// Clears every online flag, returning how many were set.
    ///
    /// Run once at startup: flags surviving a crash would otherwise show
    /// users online that no live connection backs.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] when the directory is
    /// unreachable.
    async fn reset_online_flags(&self) -> Result<u64, GatewayError>;
}

/// Samples the host the gateway runs on.
///
/// Capacity figures (total memory, disk size, core count) come from the
/// source itself on every sample, so the gateway never bakes in numbers
/// for a machine it happens to have been deployed to once.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Takes one sample of the current system state.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Collection`] when the host cannot be
    /// sampled.
    async fn sample(&self) -> Result<SystemSample, GatewayError>;
}

/// Health probe for one named platform service, folded into each
/// sample's service list.
#[async_trait]
pub trait ServiceProbe: Send + Sync {
    /// Service name as shown on the dashboard.
    fn name(&self) -> &str;

    /// Returns `true` when the service currently responds.
    async fn probe(&self) -> bool;
}

/// Durable store for periodic metric snapshots.
#[async_trait]
pub trait MetricStore: Send + Sync {
    /// Appends one snapshot to the metrics history.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] when the write fails.
    async fn append(&self, snapshot: &MetricSnapshot) -> Result<(), GatewayError>;
}

/// Durable store for activity events.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Records one activity event.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] when the write fails.
    async fn record(&self, event: &ActivityEvent) -> Result<(), GatewayError>;

    /// Returns events recorded strictly after `since`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Persistence`] when the query fails.
    async fn recorded_since(&self, since: DateTime<Utc>) -> Result<Vec<ActivityEvent>, GatewayError>;
}
