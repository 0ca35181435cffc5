//! Shotforge event bus.
//!
//! In-process publish/subscribe for timeline and generation lifecycle
//! events, backed by `tokio::sync::broadcast`:
//!
//! - [`EventBus`] -- the shared fan-out hub.
//! - [`ShotEvent`] -- the canonical event envelope.
//!
//! The API layer publishes events as shots move through dispatch and
//! reconciliation; the WebSocket layer subscribes and forwards them to
//! connected clients.

pub mod bus;

pub use bus::{EventBus, ShotEvent};
