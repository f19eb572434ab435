//! Type-safe connection and user identifiers.
//!
//! [`ConnectionId`] and [`UserId`] are newtype wrappers around
//! [`uuid::Uuid`] so that transport-session identifiers and account
//! identifiers cannot be confused with each other or with other UUIDs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for one transport-level connection.
///
/// Generated by the [`super::ConnectionGateway`] when a transport session
/// is registered and invalid after the session closes. A reconnecting
/// client always receives a fresh `ConnectionId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(uuid::Uuid);

impl ConnectionId {
    /// Creates a new random `ConnectionId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Creates a `ConnectionId` from an existing [`uuid::Uuid`].
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a platform user account.
///
/// Long-lived, assigned by the account service and carried in verified
/// session credentials. Used as the presence ledger key and embedded in
/// per-user room names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(uuid::Uuid);

impl UserId {
    /// Creates a new random `UserId` (UUID v4). Mostly useful in tests;
    /// production identifiers come from verified credentials.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Creates a `UserId` from an existing [`uuid::Uuid`].
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<uuid::Uuid> for UserId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}

impl From<UserId> for uuid::Uuid {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl std::str::FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn connection_ids_are_unique() {
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn user_id_display_is_uuid_format() {
        let id = UserId::new();
        let s = format!("{id}");
        assert_eq!(s.len(), 36);
        assert!(s.contains('-'));
    }

    #[test]
    fn user_id_parses_from_str() {
        let id = UserId::new();
        let parsed: Result<UserId, _> = id.to_string().parse();
        let Ok(parsed) = parsed else {
            panic!("round-trip parse failed");
        };
        assert_eq!(id, parsed);
    }

    #[test]
    fn from_uuid_round_trip() {
        let uuid = uuid::Uuid::new_v4();
        assert_eq!(*ConnectionId::from_uuid(uuid).as_uuid(), uuid);
        assert_eq!(*UserId::from_uuid(uuid).as_uuid(), uuid);
        assert_eq!(uuid::Uuid::from(UserId::from_uuid(uuid)), uuid);
    }

    #[test]
    fn user_id_serde_round_trip() {
        let id = UserId::new();
        let json = serde_json::to_string(&id).ok();
        let Some(json) = json else {
            panic!("serialization failed");
        };
        let deserialized: Option<UserId> = serde_json::from_str(&json).ok();
        assert_eq!(deserialized, Some(id));
    }

    #[test]
    fn ids_work_as_map_keys() {
        use std::collections::HashMap;
        let conn = ConnectionId::new();
        let mut map = HashMap::new();
        map.insert(conn, 1u32);
        assert_eq!(map.get(&conn), Some(&1));
    }
}
