//! Identity-keyed presence ledger.
//!
//! Presence is derived from the number of open authenticated connections
//! per identity, not from per-connection boolean flips: a user with three
//! tabs open is online once, and goes offline exactly when the last tab
//! closes. [`PresenceLedger`] is the pure state machine — it mutates no
//! external state and returns [`PresenceTransition`] values for the
//! service layer to persist and broadcast.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;

/// Online/away/busy/offline classification of an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    /// At least one authenticated connection, no explicit status set.
    Online,
    /// Explicitly set by the client (idle tab, stepped away).
    Away,
    /// Explicitly set by the client (in an interview session).
    Busy,
    /// Zero authenticated connections.
    Offline,
}

impl PresenceStatus {
    /// Returns the wire-level string for this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Away => "away",
            Self::Busy => "busy",
            Self::Offline => "offline",
        }
    }
}

impl std::fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A presence state change that must be persisted and broadcast.
///
/// Produced only when an identity's visible status actually changes —
/// opening a second tab or closing one of several produces no transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceTransition {
    /// Identity whose status changed.
    pub user_id: UserId,
    /// The new status.
    pub status: PresenceStatus,
    /// When the change happened (server clock).
    pub at: DateTime<Utc>,
}

/// Live per-identity entry.
#[derive(Debug, Clone)]
struct PresenceEntry {
    status: PresenceStatus,
    connections: u32,
    last_activity: DateTime<Utc>,
}

/// Point-in-time view of one identity's presence, for dashboard reads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPresence {
    /// Identity.
    pub user_id: UserId,
    /// Current status.
    pub status: PresenceStatus,
    /// Last time any of the identity's connections showed activity.
    pub last_activity: DateTime<Utc>,
    /// Open authenticated connection count.
    pub connections: u32,
}

/// Reference-counting presence state machine.
///
/// Identities with zero connections are absent from the map; absence is
/// OFFLINE. All methods are synchronous — callers hold whatever lock
/// guards the ledger and never suspend while doing so.
#[derive(Debug, Default)]
pub struct PresenceLedger {
    entries: HashMap<UserId, PresenceEntry>,
}

impl PresenceLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one more authenticated connection for `user`.
    ///
    /// Returns `Some(ONLINE transition)` only when the reference count
    /// crosses 0→1.
    pub fn connection_opened(
        &mut self,
        user: UserId,
        at: DateTime<Utc>,
    ) -> Option<PresenceTransition> {
        match self.entries.get_mut(&user) {
            Some(entry) => {
                entry.connections = entry.connections.saturating_add(1);
                entry.last_activity = at;
                None
            }
            None => {
                self.entries.insert(
                    user,
                    PresenceEntry {
                        status: PresenceStatus::Online,
                        connections: 1,
                        last_activity: at,
                    },
                );
                Some(PresenceTransition {
                    user_id: user,
                    status: PresenceStatus::Online,
                    at,
                })
            }
        }
    }

    /// Records one closed connection for `user`.
    ///
    /// Returns `Some(OFFLINE transition)` only when the reference count
    /// crosses 1→0. Unknown identities are a no-op (e.g. an anonymous
    /// connection closing).
    pub fn connection_closed(
        &mut self,
        user: UserId,
        at: DateTime<Utc>,
    ) -> Option<PresenceTransition> {
        let entry = self.entries.get_mut(&user)?;
        entry.connections = entry.connections.saturating_sub(1);
        if entry.connections > 0 {
            return None;
        }
        self.entries.remove(&user);
        Some(PresenceTransition {
            user_id: user,
            status: PresenceStatus::Offline,
            at,
        })
    }

    /// Applies an explicit client-issued status update.
    ///
    /// Only identities with at least one open connection can change
    /// status, and OFFLINE cannot be set explicitly — it is derived from
    /// the reference count. Setting the current status again produces no
    /// transition.
    pub fn set_status(
        &mut self,
        user: UserId,
        status: PresenceStatus,
        at: DateTime<Utc>,
    ) -> Option<PresenceTransition> {
        if status == PresenceStatus::Offline {
            return None;
        }
        let entry = self.entries.get_mut(&user)?;
        entry.last_activity = at;
        if entry.status == status {
            return None;
        }
        entry.status = status;
        Some(PresenceTransition {
            user_id: user,
            status,
            at,
        })
    }

    /// Updates `last_activity` for an identity, if it has connections.
    pub fn touch(&mut self, user: UserId, at: DateTime<Utc>) {
        if let Some(entry) = self.entries.get_mut(&user) {
            entry.last_activity = at;
        }
    }

    /// Returns the current status of `user` (OFFLINE when unknown).
    #[must_use]
    pub fn status(&self, user: UserId) -> PresenceStatus {
        self.entries
            .get(&user)
            .map_or(PresenceStatus::Offline, |e| e.status)
    }

    /// Returns `true` if `user` has at least one open connection.
    #[must_use]
    pub fn is_online(&self, user: UserId) -> bool {
        self.entries.contains_key(&user)
    }

    /// Returns the number of identities with at least one connection.
    #[must_use]
    pub fn online_count(&self) -> usize {
        self.entries.len()
    }

    /// Returns a snapshot of every present identity, for dashboard reads.
    #[must_use]
    pub fn snapshot(&self) -> Vec<UserPresence> {
        self.entries
            .iter()
            .map(|(user_id, entry)| UserPresence {
                user_id: *user_id,
                status: entry.status,
                last_activity: entry.last_activity,
                connections: entry.connections,
            })
            .collect()
    }
}
