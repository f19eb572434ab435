//! Server→client wire events.
//!
//! [`ServerEvent`] is the complete outbound event catalog. On the wire
//! every event is an envelope `{"event": "<kebab-case name>", "data":
//! <payload>}` with camelCase payload fields, which is what the dashboard
//! clients speak. Events are cloned per fanout, so payloads stay small.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::activity::ActivityEvent;
use super::metrics::SystemSample;
use super::presence::{PresenceStatus, UserPresence};
use super::{Role, UserId};

/// Outbound event envelope delivered to connections.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
#[serde(rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Successful authentication acknowledgement.
    Authenticated {
        /// Always `true`; failures use [`ServerEvent::AuthenticationError`].
        success: bool,
        /// Bound identity.
        user_id: UserId,
        /// Bound role.
        role: Role,
    },

    /// Authentication or authorization failure. The connection stays open
    /// and anonymous connections may retry.
    AuthenticationError {
        /// Human-readable reason.
        message: String,
    },

    /// Reply to `request-dashboard-data`, sent to the requester only.
    DashboardDataUpdate {
        /// Server timestamp.
        timestamp: DateTime<Utc>,
        /// Identities currently online.
        online_users: usize,
        /// Open connections (authenticated or not).
        connections: usize,
        /// Per-user presence entries; admin requesters only.
        #[serde(skip_serializing_if = "Option::is_none")]
        presence: Option<Vec<UserPresence>>,
    },

    /// Sampled system telemetry, broadcast to the monitoring room on each
    /// collector tick and sent directly on admin request.
    SystemMetricsUpdate(SystemSample),

    /// A freshly relayed activity event, broadcast to the admin room.
    NewActivity(ActivityEvent),

    /// Catch-up batch of recent activity events for the admin room.
    ActivityUpdates(Vec<ActivityEvent>),

    /// Presence transition, broadcast to the admin room.
    UserStatusUpdate {
        /// Identity whose status changed.
        user_id: UserId,
        /// New status.
        status: PresenceStatus,
        /// When the transition happened.
        timestamp: DateTime<Utc>,
    },

    /// Failed `log-activity` submission (validation or persistence),
    /// sent to the submitter only.
    ActivityError {
        /// Human-readable reason.
        message: String,
    },
}

impl ServerEvent {
    /// Returns the wire-level event name.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Authenticated { .. } => "authenticated",
            Self::AuthenticationError { .. } => "authentication-error",
            Self::DashboardDataUpdate { .. } => "dashboard-data-update",
            Self::SystemMetricsUpdate(_) => "system-metrics-update",
            Self::NewActivity(_) => "new-activity",
            Self::ActivityUpdates(_) => "activity-updates",
            Self::UserStatusUpdate { .. } => "user-status-update",
            Self::ActivityError { .. } => "activity-error",
        }
    }

    /// Builds the `user-status-update` event for a presence transition.
    #[must_use]
    pub const fn status_update(
        user_id: UserId,
        status: PresenceStatus,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::UserStatusUpdate {
            user_id,
            status,
            timestamp,
        }
    }
}
