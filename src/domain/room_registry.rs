//! Room membership bookkeeping.
//!
//! [`RoomRegistry`] maintains the bidirectional mapping between rooms and
//! connections: room → members for O(room size) fanout enumeration, and
//! connection → rooms so that [`RoomRegistry::remove_connection`] can
//! atomically clear every membership on disconnect. It is a plain data
//! structure with no interior locking — the
//! [`super::ConnectionGateway`] guards it together with the connection
//! table so membership and connection state never diverge.

use std::collections::{HashMap, HashSet};

use super::{ConnectionId, Room};

/// Bidirectional room↔connection membership index.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    /// Room → member connections (fanout direction).
    members: HashMap<Room, HashSet<ConnectionId>>,
    /// Connection → joined rooms (cleanup direction).
    joined: HashMap<ConnectionId, HashSet<Room>>,
}

impl RoomRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `conn` to `room`. Joining a room twice is a no-op.
    pub fn join(&mut self, conn: ConnectionId, room: Room) {
        self.members.entry(room.clone()).or_default().insert(conn);
        self.joined.entry(conn).or_default().insert(room);
    }

    /// Removes `conn` from `room`. Empty rooms are dropped from the index.
    pub fn leave(&mut self, conn: ConnectionId, room: &Room) {
        if let Some(members) = self.members.get_mut(room) {
            members.remove(&conn);
            if members.is_empty() {
                self.members.remove(room);
            }
        }
        if let Some(rooms) = self.joined.get_mut(&conn) {
            rooms.remove(room);
            if rooms.is_empty() {
                self.joined.remove(&conn);
            }
        }
    }

    /// Removes `conn` from every room it was in, returning those rooms.
    ///
    /// This is the disconnect cleanup path: afterwards no room holds a
    /// reference to the connection.
    pub fn remove_connection(&mut self, conn: ConnectionId) -> Vec<Room> {
        let rooms = self.joined.remove(&conn).unwrap_or_default();
        for room in &rooms {
            if let Some(members) = self.members.get_mut(room) {
                members.remove(&conn);
                if members.is_empty() {
                    self.members.remove(room);
                }
            }
        }
        rooms.into_iter().collect()
    }

    /// Returns `true` if `conn` is currently a member of `room`.
    #[must_use]
    pub fn contains(&self, room: &Room, conn: ConnectionId) -> bool {
        self.members
            .get(room)
            .is_some_and(|members| members.contains(&conn))
    }

    /// Returns the members of `room` (empty when the room has none).
    #[must_use]
    pub fn members(&self, room: &Room) -> Vec<ConnectionId> {
        self.members
            .get(room)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Returns the rooms `conn` has joined.
    #[must_use]
    pub fn rooms_of(&self, conn: ConnectionId) -> Vec<Room> {
        self.joined
            .get(&conn)
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the member count of `room`.
    #[must_use]
    pub fn member_count(&self, room: &Room) -> usize {
        self.members.get(room).map_or(0, HashSet::len)
    }

    /// Returns the number of rooms with at least one member.
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.members.len()
    }
}
