//! Server-authoritative gravity.
//!
//! Applied to every accepted update before it is stored and relayed.

use crate::square::Square;

/// Default floor for `destY`.
pub const GRAVITY_FLOOR: f64 = 400.0;
/// Default per-update drop.
pub const GRAVITY_STEP: f64 = 4.0;

/// Correction rule applied to a candidate square.
pub trait Physics: Send + Sync {
    /// Mutates `square` in place; returns true if anything changed.
    fn apply(&self, square: &mut Square) -> bool;
}

/// Advances `destY` by `step` while `destY <= floor` (screen y grows downward).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloorGravity {
    pub floor: f64,
    pub step: f64,
}

impl Default for FloorGravity {
    fn default() -> Self {
        Self {
            floor: GRAVITY_FLOOR,
            step: GRAVITY_STEP,
        }
    }
}

impl Physics for FloorGravity {
    fn apply(&self, square: &mut Square) -> bool {
        // `<=` is intentional: a square sitting exactly on the floor still drops once more.
        if square.dest_y <= self.floor {
            square.dest_y += self.step;
            square.touch();
            true
        } else {
            false
        }
    }
}

/// Never corrects.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPhysics;

impl Physics for NullPhysics {
    fn apply(&self, _square: &mut Square) -> bool {
        false
    }
}
