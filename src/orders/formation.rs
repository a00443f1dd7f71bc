//! Squad formation offsets
//!
//! Converts a squad slot into an offset from the ordered destination so
//! members of one move order spread out instead of stacking on one point.

use serde::{Deserialize, Serialize};

use crate::core::types::Vec2;

/// Formation shape for squad moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formation {
    /// Abreast, alternating right and left of the leader
    Line,
    /// Single file behind the leader
    Column,
    /// Echelons back and out on both flanks
    Wedge,
}

impl Formation {
    /// Offset of `slot` relative to the leader's destination.
    ///
    /// `heading` is the unit vector of travel. Slot 0 is the leader.
    pub fn slot_offset(&self, slot: u8, spacing: f32, heading: Vec2) -> Vec2 {
        if slot == 0 {
            return Vec2::ZERO;
        }
        let heading = if heading.length() > 0.0 { heading.normalize() } else { Vec2::new(1.0, 0.0) };
        let right = Vec2::new(-heading.y, heading.x);
        let back = heading * -1.0;

        // 1 -> +1, 2 -> -1, 3 -> +2, 4 -> -2 ...
        let rank = f32::from(slot.div_ceil(2));
        let side = if slot % 2 == 1 { 1.0 } else { -1.0 };

        match self {
            Formation::Line => right * (side * rank * spacing),
            Formation::Column => back * (f32::from(slot) * spacing),
            Formation::Wedge => right * (side * rank * spacing) + back * (rank * spacing),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leader_has_no_offset() {
        for f in [Formation::Line, Formation::Column, Formation::Wedge] {
            assert_eq!(f.slot_offset(0, 2.0, Vec2::new(1.0, 0.0)), Vec2::ZERO);
        }
    }

    #[test]
    fn test_line_alternates_flanks() {
        let heading = Vec2::new(1.0, 0.0);
        let a = Formation::Line.slot_offset(1, 2.0, heading);
        let b = Formation::Line.slot_offset(2, 2.0, heading);
        assert_eq!(a, Vec2::new(0.0, 2.0));
        assert_eq!(b, Vec2::new(0.0, -2.0));
    }

    #[test]
    fn test_column_trails_behind() {
        let heading = Vec2::new(1.0, 0.0);
        let off = Formation::Column.slot_offset(3, 1.5, heading);
        assert_eq!(off, Vec2::new(-4.5, 0.0));
    }

    #[test]
    fn test_wedge_is_back_and_out() {
        let heading = Vec2::new(0.0, 1.0);
        let off = Formation::Wedge.slot_offset(1, 1.0, heading);
        assert!(off.y < 0.0);
        assert!(off.x != 0.0);
    }
}
