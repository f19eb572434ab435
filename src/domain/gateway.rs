//! Transport-independent connection gateway.
//!
//! [`ConnectionGateway`] owns every live connection: the per-connection
//! outbound channel, the identity/role bound after authentication, and
//! the [`RoomRegistry`]. Connection table and room index live behind a
//! single [`tokio::sync::RwLock`] so each mutation — register, bind,
//! join, disconnect — is one atomic step with no partially-updated
//! membership visible to readers.
//!
//! Any transport can drive the gateway: the bundled axum WebSocket loop
//! holds the [`mpsc::Receiver`] side of a registered connection, but a
//! test (or an SSE/long-poll transport) can do exactly the same. The
//! transport task must call [`ConnectionGateway::disconnect`] when it
//! ends, whatever the reason; the call is idempotent, so a late duplicate
//! signal is a no-op.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, warn};

use super::event::ServerEvent;
use super::room_registry::RoomRegistry;
use super::{ConnectionId, Role, Room, UserId};

/// One live connection entry.
#[derive(Debug)]
struct ConnectionEntry {
    identity: Option<UserId>,
    role: Option<Role>,
    connected_at: DateTime<Utc>,
    sender: mpsc::Sender<ServerEvent>,
}

/// Combined connection table + room index, guarded as one unit.
#[derive(Debug, Default)]
struct GatewayState {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    rooms: RoomRegistry,
}

/// Outcome of binding an identity to a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    /// Fresh bind: identity and role stored, standard rooms joined.
    Bound,
    /// The connection was already bound to this same identity.
    AlreadyBoundSame,
    /// The connection is bound to a different identity; binding refused.
    AlreadyBoundOther,
    /// The connection no longer exists (disconnected mid-handshake).
    Gone,
}

/// Metadata returned when a connection is removed.
#[derive(Debug, Clone)]
pub struct ClosedConnection {
    /// Identity bound to the connection, if it had authenticated.
    pub identity: Option<UserId>,
    /// Role bound to the connection, if it had authenticated.
    pub role: Option<Role>,
    /// When the transport session was registered.
    pub connected_at: DateTime<Utc>,
}

/// Read-only view of one connection's binding.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionInfo {
    /// Bound identity, `None` while anonymous.
    pub identity: Option<UserId>,
    /// Bound role, `None` while anonymous.
    pub role: Option<Role>,
    /// When the transport session was registered.
    pub connected_at: DateTime<Utc>,
}

impl ConnectionInfo {
    /// Returns `true` once an identity is bound.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Returns `true` for a connection bound to an admin.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role.is_some_and(|r| r.is_admin())
    }
}

/// Connection bookkeeping and emission primitives.
#[derive(Debug)]
pub struct ConnectionGateway {
    state: RwLock<GatewayState>,
    buffer_size: usize,
}

impl ConnectionGateway {
    /// Creates a gateway whose per-connection outbound channels hold up
    /// to `buffer_size` pending events.
    #[must_use]
    pub fn new(buffer_size: usize) -> Self {
        Self {
            state: RwLock::new(GatewayState::default()),
            buffer_size: buffer_size.max(1),
        }
    }

    /// Registers a new anonymous connection.
    ///
    /// Returns the assigned [`ConnectionId`] and the receiver half of its
    /// outbound channel, which the transport task owns until close.
    pub async fn register(&self) -> (ConnectionId, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(self.buffer_size);
        let id = ConnectionId::new();
        let mut state = self.state.write().await;
        state.connections.insert(
            id,
            ConnectionEntry {
                identity: None,
                role: None,
                connected_at: Utc::now(),
                sender: tx,
            },
        );
        debug!(conn_id = %id, total = state.connections.len(), "connection registered");
        (id, rx)
    }

    /// Removes a connection and every room membership it held, atomically.
    ///
    /// Idempotent: returns `None` when the connection was already removed,
    /// so a transport-close signal and an emit-failure signal folding into
    /// the same path cannot double-run cleanup.
    pub async fn disconnect(&self, conn: ConnectionId) -> Option<ClosedConnection> {
        let mut state = self.state.write().await;
        let entry = state.connections.remove(&conn)?;
        let rooms = state.rooms.remove_connection(conn);
        debug!(
            conn_id = %conn,
            rooms = rooms.len(),
            authenticated = entry.identity.is_some(),
            "connection removed"
        );
        Some(ClosedConnection {
            identity: entry.identity,
            role: entry.role,
            connected_at: entry.connected_at,
        })
    }

    /// Binds `user`/`role` to a connection and joins the standard rooms:
    /// `user:<id>`, `global`, and for admins also `admin` + `monitoring`.
    ///
    /// The first successful bind wins; a later attempt for the same
    /// identity is acknowledged without changes and an attempt for a
    /// different identity is refused — a client must reconnect to switch
    /// identity.
    pub async fn bind_identity(&self, conn: ConnectionId, user: UserId, role: Role) -> BindOutcome {
        let mut state = self.state.write().await;
        let Some(entry) = state.connections.get_mut(&conn) else {
            return BindOutcome::Gone;
        };
        match entry.identity {
            Some(existing) if existing == user => return BindOutcome::AlreadyBoundSame,
            Some(_) => return BindOutcome::AlreadyBoundOther,
            None => {}
        }
        entry.identity = Some(user);
        entry.role = Some(role);

        state.rooms.join(conn, Room::user(user));
        state.rooms.join(conn, Room::global());
        if role.is_admin() {
            state.rooms.join(conn, Room::admin());
            state.rooms.join(conn, Room::monitoring());
        }
        debug!(conn_id = %conn, user_id = %user, %role, "identity bound");
        BindOutcome::Bound
    }

    /// Adds an authenticated connection to `room`.
    ///
    /// Returns `false` for unknown or still-anonymous connections:
    /// an unauthenticated connection belongs to zero rooms.
    pub async fn join(&self, conn: ConnectionId, room: Room) -> bool {
        let mut state = self.state.write().await;
        let authenticated = state
            .connections
            .get(&conn)
            .is_some_and(|e| e.identity.is_some());
        if !authenticated {
            return false;
        }
        state.rooms.join(conn, room);
        true
    }

    /// Removes a connection from `room`.
    pub async fn leave(&self, conn: ConnectionId, room: &Room) {
        let mut state = self.state.write().await;
        state.rooms.leave(conn, room);
    }

    /// Emits an event to every current member of `room`, in emission
    /// order per receiver. Returns the number of connections the event
    /// was queued for.
    ///
    /// A closed outbound channel means the transport task is already
    /// tearing down and will run the disconnect path itself, so the send
    /// is skipped. A full buffer drops the event for that connection
    /// only.
    pub async fn emit_to_room(&self, room: &Room, event: &ServerEvent) -> usize {
        let senders: Vec<(ConnectionId, mpsc::Sender<ServerEvent>)> = {
            let state = self.state.read().await;
            state
                .rooms
                .members(room)
                .into_iter()
                .filter_map(|id| {
                    state
                        .connections
                        .get(&id)
                        .map(|entry| (id, entry.sender.clone()))
                })
                .collect()
        };

        let mut delivered = 0;
        for (id, sender) in senders {
            if Self::try_deliver(id, &sender, event) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Emits an event to one specific connection.
    pub async fn emit_to_connection(&self, conn: ConnectionId, event: &ServerEvent) -> bool {
        let sender = {
            let state = self.state.read().await;
            state.connections.get(&conn).map(|e| e.sender.clone())
        };
        match sender {
            Some(sender) => Self::try_deliver(conn, &sender, event),
            None => false,
        }
    }

    fn try_deliver(
        id: ConnectionId,
        sender: &mpsc::Sender<ServerEvent>,
        event: &ServerEvent,
    ) -> bool {
        match sender.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(conn_id = %id, event = event.event_name(), "outbound buffer full, event dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(conn_id = %id, event = event.event_name(), "send to closing connection skipped");
                false
            }
        }
    }

    /// Returns the binding view of one connection.
    pub async fn info(&self, conn: ConnectionId) -> Option<ConnectionInfo> {
        let state = self.state.read().await;
        state.connections.get(&conn).map(|entry| ConnectionInfo {
            identity: entry.identity,
            role: entry.role,
            connected_at: entry.connected_at,
        })
    }

    /// Returns all connections currently bound to `role`.
    pub async fn connections_with_role(&self, role: Role) -> Vec<ConnectionId> {
        let state = self.state.read().await;
        state
            .connections
            .iter()
            .filter(|(_, entry)| entry.role == Some(role))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Returns the total number of open connections.
    pub async fn connection_count(&self) -> usize {
        self.state.read().await.connections.len()
    }

    /// Returns the number of distinct authenticated identities.
    pub async fn connected_user_count(&self) -> usize {
        let state = self.state.read().await;
        let mut users: Vec<UserId> = state
            .connections
            .values()
            .filter_map(|entry| entry.identity)
            .collect();
        users.sort_unstable_by_key(|u| *u.as_uuid());
        users.dedup();
        users.len()
    }

    /// Returns the member count of `room`.
    pub async fn room_member_count(&self, room: &Room) -> usize {
        self.state.read().await.rooms.member_count(room)
    }

    /// Returns the rooms a connection has joined (for diagnostics).
    pub async fn rooms_of(&self, conn: ConnectionId) -> Vec<Room> {
        self.state.read().await.rooms.rooms_of(conn)
    }
}
