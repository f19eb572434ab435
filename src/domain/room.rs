//! Named broadcast rooms.
//!
//! A [`Room`] is a logical channel: emitting to it delivers the event to
//! every connection currently joined. Room names follow a fixed scheme —
//! `user:<uuid>` for per-identity rooms plus the three well-known rooms
//! `global`, `admin`, and `monitoring`.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::UserId;

/// Name of the room every authenticated connection joins.
const GLOBAL: &str = "global";
/// Name of the admin-broadcast room.
const ADMIN: &str = "admin";
/// Name of the system-monitoring room (periodic metric fanout).
const MONITORING: &str = "monitoring";
/// Prefix for per-identity rooms.
const USER_PREFIX: &str = "user:";

/// A named broadcast group.
///
/// Cheap to clone and hashable; used as the key in the
/// [`super::RoomRegistry`]. Construct through the well-known constructors
/// rather than raw strings so the naming scheme stays in one place.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Room(String);

impl Room {
    /// The global room joined by every authenticated connection.
    #[must_use]
    pub fn global() -> Self {
        Self(GLOBAL.to_string())
    }

    /// The admin-broadcast room (presence transitions, activity fanout).
    #[must_use]
    pub fn admin() -> Self {
        Self(ADMIN.to_string())
    }

    /// The system-monitoring room (periodic metric snapshots).
    #[must_use]
    pub fn monitoring() -> Self {
        Self(MONITORING.to_string())
    }

    /// The per-identity room `user:<id>`.
    #[must_use]
    pub fn user(id: UserId) -> Self {
        Self(format!("{USER_PREFIX}{id}"))
    }

    /// Returns the room name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if this is a per-identity `user:<id>` room.
    #[must_use]
    pub fn is_user_room(&self) -> bool {
        self.0.starts_with(USER_PREFIX)
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
