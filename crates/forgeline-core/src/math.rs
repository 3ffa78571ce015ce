//! Fixed-point 2D vector math for world-space positions.
//!
//! Everything here is deterministic: square roots go through a binary search
//! on [`Fixed64`] rather than floating point, so homing vectors and range
//! checks produce identical bits on every platform. Range comparisons should
//! prefer [`Vec2::distance_squared`] to avoid the sqrt entirely.

use serde::{Deserialize, Serialize};

use crate::fixed::Fixed64;

/// A 2D vector / point in world units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: Fixed64,
    pub y: Fixed64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 {
        x: Fixed64::ZERO,
        y: Fixed64::ZERO,
    };

    pub fn new(x: Fixed64, y: Fixed64) -> Self {
        Self { x, y }
    }

    /// Construct from integer world units. Convenience for tests and setup.
    pub fn from_int(x: i32, y: i32) -> Self {
        Self {
            x: Fixed64::from_num(x),
            y: Fixed64::from_num(y),
        }
    }

    /// Squared Euclidean distance. Cheaper than [`Vec2::distance`]; use this
    /// for range comparisons against a squared radius.
    pub fn distance_squared(self, other: Vec2) -> Fixed64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Euclidean distance via deterministic fixed-point sqrt.
    pub fn distance(self, other: Vec2) -> Fixed64 {
        fixed_sqrt(self.distance_squared(other))
    }

    /// Vector length.
    pub fn length(self) -> Fixed64 {
        fixed_sqrt(self.x * self.x + self.y * self.y)
    }

    /// Unit vector in this direction, or zero if the vector is zero.
    pub fn normalized(self) -> Vec2 {
        let len = self.length();
        if len == Fixed64::ZERO {
            return Vec2::ZERO;
        }
        Vec2 {
            x: self.x / len,
            y: self.y / len,
        }
    }

    /// Scale by a scalar factor.
    pub fn scaled(self, k: Fixed64) -> Vec2 {
        Vec2 {
            x: self.x * k,
            y: self.y * k,
        }
    }

    /// Linear interpolation from `self` to `target` at `t` in [0, 1].
    pub fn lerp(self, target: Vec2, t: Fixed64) -> Vec2 {
        Vec2 {
            x: self.x + (target.x - self.x) * t,
            y: self.y + (target.y - self.y) * t,
        }
    }
}

impl std::ops::Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2 {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2 {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

/// Deterministic square root by binary search on the fixed-point lattice.
///
/// Returns 0 for non-positive inputs. 48 halvings bring the bracket below
/// Q32.32 resolution for the magnitudes the simulation uses.
pub fn fixed_sqrt(v: Fixed64) -> Fixed64 {
    if v <= Fixed64::ZERO {
        return Fixed64::ZERO;
    }
    let mut lo = Fixed64::ZERO;
    let mut hi = if v < Fixed64::ONE { Fixed64::ONE } else { v };
    for _ in 0..48 {
        let mid: Fixed64 = (lo + hi) >> 1;
        match mid.checked_mul(mid) {
            Some(sq) if sq <= v => lo = mid,
            _ => hi = mid,
        }
    }
    lo
}

/// Axis-aligned bounding-box overlap test for two square boxes given by
/// center and half-extent. Touching edges count as overlap.
pub fn aabb_overlap(a: Vec2, half_a: Fixed64, b: Vec2, half_b: Fixed64) -> bool {
    let reach = half_a + half_b;
    (a.x - b.x).abs() <= reach && (a.y - b.y).abs() <= reach
}
