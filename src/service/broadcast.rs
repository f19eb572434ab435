//! Stateless broadcast façade.
//!
//! [`Broadcaster`] is the surface other subsystems use to push events
//! without touching connection internals: everything is expressed as a
//! room lookup (or role scan) plus gateway emission.

use std::sync::Arc;

use crate::domain::{ConnectionGateway, Role, Room, ServerEvent, UserId};

/// Room-lookup-plus-emit broadcast operations.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    gateway: Arc<ConnectionGateway>,
}

impl Broadcaster {
    /// Creates a broadcaster over the given gateway.
    #[must_use]
    pub fn new(gateway: Arc<ConnectionGateway>) -> Self {
        Self { gateway }
    }

    /// Emits to every connection of one user (all tabs/devices).
    ///
    /// Returns the number of connections the event was queued for.
    pub async fn broadcast_to_user(&self, user: UserId, event: &ServerEvent) -> usize {
        self.gateway.emit_to_room(&Room::user(user), event).await
    }

    /// Emits to every connection bound to `role`.
    ///
    /// Admins are a room of their own; other roles are resolved by
    /// scanning current bindings.
    pub async fn broadcast_to_role(&self, role: Role, event: &ServerEvent) -> usize {
        if role.is_admin() {
            return self.gateway.emit_to_room(&Room::admin(), event).await;
        }
        let mut delivered = 0;
        for conn in self.gateway.connections_with_role(role).await {
            if self.gateway.emit_to_connection(conn, event).await {
                delivered += 1;
            }
        }
        delivered
    }

    /// Emits to every authenticated connection via the global room.
    pub async fn broadcast_to_all(&self, event: &ServerEvent) -> usize {
        self.gateway.emit_to_room(&Room::global(), event).await
    }

    /// Returns the number of distinct authenticated users connected.
    pub async fn connected_user_count(&self) -> usize {
        self.gateway.connected_user_count().await
    }
}
