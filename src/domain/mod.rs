//! Domain layer: identities, rooms, presence, and the connection gateway.
//!
//! This module contains the transport-independent core of the dashboard
//! broadcast subsystem: connection and user identity, the room registry
//! with its bidirectional membership index, the presence ledger, the
//! wire event catalog, and the gateway that ties connections to rooms.

pub mod activity;
pub mod event;
pub mod gateway;
pub mod ids;
pub mod metrics;
pub mod presence;
pub mod role;
pub mod room;
pub mod room_registry;

pub use activity::{ActivityEvent, Severity};
pub use event::ServerEvent;
pub use gateway::{BindOutcome, ClosedConnection, ConnectionGateway, ConnectionInfo};
pub use ids::{ConnectionId, UserId};
pub use metrics::{MetricSnapshot, SystemSample};
pub use presence::{PresenceLedger, PresenceStatus, PresenceTransition, UserPresence};
pub use role::Role;
pub use room::Room;
pub use room_registry::RoomRegistry;
