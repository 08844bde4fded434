//! `squares_shared`
//!
//! Types shared by the relay server and the headless client.
//!
//! Design goals:
//! - One fixed-shape square record on the wire and in the store.
//! - Gravity behind a trait so the relay can run with or without it.
//! - No `unsafe`.

pub mod config;
pub mod net;
pub mod physics;
pub mod square;

pub mod prelude {
    //! Commonly used exports.

    pub use crate::config::*;
    pub use crate::net::*;
    pub use crate::physics::*;
    pub use crate::square::*;
}
