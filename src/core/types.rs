//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};

/// Stable unit identity. Allocated monotonically and never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitId(pub u32);

/// Position of a unit inside the unit table.
///
/// Only valid until the next removal: swap-removal moves the last unit into
/// the vacated slot, so holders must be rebound during cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitIndex(pub usize);

impl UnitIndex {
    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

/// Allegiance of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Side(pub u8);

/// Game tick counter (simulation time unit)
pub type Tick = u64;

/// Identifier of the peer that issued a command (lockstep ordering key)
pub type PlayerId = u8;

/// 2D position
///
/// Only arithmetic and `sqrt` are used on these values. `sqrt` is correctly
/// rounded under IEEE 754, so results are identical on every platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Self) -> f32 {
        self.distance_sq(other).sqrt()
    }

    pub fn distance_sq(&self, other: &Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > 0.0001 {
            Self { x: self.x / len, y: self.y / len }
        } else {
            Self::default()
        }
    }

    /// Linear interpolation, `t` in [0, 1]
    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// Move toward `target` by at most `max_step`. Returns the new point and
    /// whether the target was reached.
    pub fn step_toward(&self, target: &Self, max_step: f32) -> (Self, bool) {
        let dist = self.distance(target);
        if dist <= max_step || dist <= f32::EPSILON {
            (*target, true)
        } else {
            (self.lerp(target, max_step / dist), false)
        }
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self { x: self.x + rhs.x, y: self.y + rhs.y }
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self { x: self.x - rhs.x, y: self.y - rhs.y }
    }
}

impl std::ops::Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self { x: self.x * rhs, y: self.y * rhs }
    }
}

/// Direction a unit is oriented toward (unit vector, or zero for "any")
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Facing(pub Vec2);

impl Facing {
    pub fn toward(from: Vec2, to: Vec2) -> Self {
        Self((to - from).normalize())
    }

    pub fn away_from(from: Vec2, threat: Vec2) -> Self {
        Self((from - threat).normalize())
    }
}
