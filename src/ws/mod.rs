//! WebSocket layer: upgrade handling, message parsing, the per-connection
//! read/write loop.
//!
//! The WebSocket endpoint at `/ws` is the only client-facing surface of
//! the gateway. Connections arrive anonymous, authenticate in-band, and
//! from then on receive room-scoped server events.

pub mod connection;
pub mod handler;
pub mod messages;
