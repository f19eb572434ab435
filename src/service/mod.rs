//! Service layer: handshake, presence, activity, and periodic tasks.
//!
//! Services orchestrate the domain gateway and the external
//! collaborators: [`AuthHandshake`] binds verified identities,
//! [`PresenceService`] tracks reference-counted presence,
//! [`ActivityRelay`] validates and fans out submitted events,
//! [`MetricsCollector`] owns the two periodic timers, and
//! [`Broadcaster`] is the stateless fanout façade.

pub mod activity;
pub mod auth;
pub mod broadcast;
pub mod collector;
pub mod presence;

pub use activity::{ActivityRelay, ActivitySubmission};
pub use auth::AuthHandshake;
pub use broadcast::Broadcaster;
pub use collector::{CollectorHandle, MetricsCollector};
pub use presence::PresenceService;
