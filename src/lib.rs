//! # pulse-gateway
//!
//! Real-time dashboard gateway for the Pulse interview-practice platform.
//!
//! This crate is the broadcast subsystem between the platform's web
//! dashboards and its server-side state: browsers connect over WebSocket,
//! authenticate in-band with a session token, and from then on receive
//! room-scoped events — presence transitions, relayed activity, and
//! periodically sampled system telemetry. Business logic lives elsewhere
//! on the platform; this service is a fanout and presence layer.
//!
//! ## Architecture
//!
//! ```text
//! Browsers (WebSocket)            Operators (HTTP)
//!     │                               │
//!     ├── WS Handler (ws/)            ├── REST Handlers (api/)
//!     │
//!     ├── AuthHandshake, PresenceService,
//!     │   ActivityRelay, MetricsCollector (service/)
//!     │
//!     ├── ConnectionGateway + rooms (domain/)
//!     │
//!     ├── SessionVerifier, MetricsSource,
//!     │   stores (collaborators/)
//!     │
//!     └── PostgreSQL persistence (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod collaborators;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod ws;
