//! `squares_server`
//!
//! Server-side systems:
//! - Entity store keyed by square hash
//! - Single broadcast room
//! - Relay task: connect / movement / disconnect, gravity on every update
//! - HTTP surface: client page, WebSocket relay, status
//!
//! Concurrency model:
//! - One relay task owns all mutable state and consumes events in order.
//! - Connection tasks only post events and drain their own outbox.

pub mod relay;
pub mod room;
pub mod server;
pub mod store;

pub use relay::Relay;
pub use server::SquaresServer;
