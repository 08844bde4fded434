//! `squares_client`
//!
//! Client-side pieces for the square relay:
//! - WebSocket connection and `joined` handshake
//! - Sending `movementUpdate`
//! - Tracking peers from `updatedMovement` / `left`
//!
//! Rendering and interpolation belong to the browser page.

pub mod client;

pub use client::{ws_url, SquaresClient};
