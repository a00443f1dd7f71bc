//! Terrain collaborator
//!
//! The simulation only asks terrain pure questions through [`Terrain`].
//! [`TerrainGrid`] is the in-memory implementation the scheduler owns.

pub mod grid;
pub mod pathfinding;

use serde::{Deserialize, Serialize};

use crate::core::types::Vec2;
use crate::unit::state::Posture;

pub use grid::{Structure, TerrainGrid, TerrainKind};
pub use pathfinding::find_path;

/// Cover a position offers, by posture extreme
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverValues {
    pub standing: f32,
    pub prone: f32,
}

impl CoverValues {
    pub const NONE: CoverValues = CoverValues { standing: 0.0, prone: 0.0 };

    pub fn new(standing: f32, prone: f32) -> Self {
        Self { standing, prone }
    }

    /// Crouched is the midpoint of standing and prone
    pub fn for_posture(&self, posture: Posture) -> f32 {
        let value = match posture {
            Posture::Standing => self.standing,
            Posture::Prone => self.prone,
            Posture::Crouched => (self.standing + self.prone) * 0.5,
        };
        value.clamp(0.0, 1.0)
    }

    pub fn halved(&self) -> Self {
        Self {
            standing: self.standing * 0.5,
            prone: self.prone * 0.5,
        }
    }

    /// Higher of the two per posture
    pub fn max(&self, other: &Self) -> Self {
        Self {
            standing: self.standing.max(other.standing),
            prone: self.prone.max(other.prone),
        }
    }
}

/// Pure terrain queries
pub trait Terrain: Send + Sync {
    /// Movement cost multiplier at `pos`; `None` when impassable or off-map
    fn movement_cost(&self, pos: Vec2) -> Option<f32>;

    fn cover_values(&self, pos: Vec2) -> CoverValues;

    /// Whether `pos` blocks sight outright
    fn blocks_vision(&self, pos: Vec2) -> bool;

    /// Opacity per cell crossed at `pos`
    fn opacity(&self, pos: Vec2) -> f32;

    /// Side length of one terrain cell in world units
    fn cell_size(&self) -> f32;

    fn cover_value(&self, pos: Vec2, posture: Posture) -> f32 {
        self.cover_values(pos).for_posture(posture)
    }

    fn is_passable(&self, pos: Vec2) -> bool {
        self.movement_cost(pos).is_some()
    }

    fn cell_of(&self, pos: Vec2) -> (i32, i32) {
        let size = self.cell_size();
        ((pos.x / size).floor() as i32, (pos.y / size).floor() as i32)
    }

    fn cell_center(&self, cell: (i32, i32)) -> Vec2 {
        let size = self.cell_size();
        Vec2::new((cell.0 as f32 + 0.5) * size, (cell.1 as f32 + 0.5) * size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crouch_is_midpoint() {
        let cover = CoverValues::new(0.2, 0.6);
        assert_eq!(cover.for_posture(Posture::Standing), 0.2);
        assert_eq!(cover.for_posture(Posture::Prone), 0.6);
        assert!((cover.for_posture(Posture::Crouched) - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_cover_is_clamped() {
        let cover = CoverValues::new(1.4, -0.2);
        assert_eq!(cover.for_posture(Posture::Standing), 1.0);
        assert_eq!(cover.for_posture(Posture::Prone), 0.0);
    }
}
