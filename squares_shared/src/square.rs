//! Square record and identity generation.
//!
//! A square is the per-connection entity relayed between peers. The record is
//! replaced wholesale by client updates; only `hash` is owned by the server.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};
use twox_hash::XxHash32;

use crate::net::ConnectionId;

/// Seed for the identity hash.
pub const HASH_SEED: u32 = 0xDEAD_BEEF;

/// Spawn column range (half-open).
pub const SPAWN_X_MIN: u32 = 50;
pub const SPAWN_X_MAX: u32 = 450;

/// Fixed square dimensions.
pub const SQUARE_SIZE: f64 = 100.0;

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Opaque per-connection identity, rendered as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SquareHash(pub String);

impl SquareHash {
    /// xxHash32 of `"{conn}{timestamp_ms}"`.
    pub fn generate(conn: ConnectionId, timestamp_ms: i64) -> Self {
        let input = format!("{conn}{timestamp_ms}");
        let digest = XxHash32::oneshot(HASH_SEED, input.as_bytes());
        SquareHash(format!("{digest:x}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SquareHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Entity state record. Field names follow the wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Square {
    pub hash: SquareHash,
    /// Epoch milliseconds of the last server-side change.
    pub last_update: i64,
    pub x: f64,
    pub y: f64,
    pub prev_x: f64,
    pub prev_y: f64,
    pub dest_x: f64,
    pub dest_y: f64,
    /// Interpolation fraction between prev and dest. Not enforced.
    pub alpha: f64,
    pub height: f64,
    pub width: f64,
    /// `#RRGGBB`.
    pub color: String,
}

impl Square {
    /// Builds a freshly spawned square at column `x_position`.
    pub fn new(hash: SquareHash, x_position: f64, color: String, now: i64) -> Self {
        Self {
            hash,
            last_update: now,
            x: x_position,
            y: 0.0,
            prev_x: 0.0,
            prev_y: 0.0,
            dest_x: x_position,
            dest_y: 0.0,
            alpha: 0.0,
            height: SQUARE_SIZE,
            width: SQUARE_SIZE,
            color,
        }
    }

    /// Spawns a square for `conn` with a random column and color.
    pub fn spawn<R: Rng + ?Sized>(conn: ConnectionId, rng: &mut R) -> Self {
        let now = now_ms();
        let x_position = rng.gen_range(SPAWN_X_MIN..SPAWN_X_MAX);
        Self::new(
            SquareHash::generate(conn, now),
            f64::from(x_position),
            random_color(rng),
            now,
        )
    }

    /// Refreshes `last_update`, never going backwards or standing still.
    pub fn touch(&mut self) {
        self.last_update = now_ms().max(self.last_update.saturating_add(1));
    }
}

/// Uniform color over the 24-bit space, uppercase hex.
pub fn random_color<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("#{:06X}", rng.gen_range(0..=0x00FF_FFFFu32))
}
