//! Cover evaluation

use crate::core::types::Vec2;
use crate::terrain::Terrain;
use crate::unit::state::Posture;

/// Cover at a position for a posture, in `[0, 1]`
pub fn cover_at<T: Terrain + ?Sized>(terrain: &T, position: Vec2, posture: Posture) -> f32 {
    terrain.cover_value(position, posture)
}

/// Cover of a target against fire from `shooter`.
///
/// The better of the target's own cell and the cell immediately toward the
/// shooter, so a unit lying behind a low wall benefits from it.
pub fn cover_against<T: Terrain + ?Sized>(terrain: &T, target: Vec2, posture: Posture, shooter: Vec2) -> f32 {
    let own = cover_at(terrain, target, posture);
    let toward = (shooter - target).normalize();
    if toward == Vec2::ZERO || target.distance(&shooter) <= terrain.cell_size() {
        return own;
    }
    let screen = target + toward * terrain.cell_size();
    own.max(cover_at(terrain, screen, posture))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::{Structure, TerrainGrid};

    #[test]
    fn test_posture_blend() {
        let grid = TerrainGrid::from_ascii("T", 1.0).unwrap();
        let pos = Vec2::new(0.5, 0.5);
        let standing = cover_at(&grid, pos, Posture::Standing);
        let crouched = cover_at(&grid, pos, Posture::Crouched);
        let prone = cover_at(&grid, pos, Posture::Prone);
        assert!(standing < crouched && crouched < prone);
        assert!((crouched - (standing + prone) / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_low_wall_screens_toward_shooter() {
        let mut grid = TerrainGrid::open(6, 1, 1.0);
        grid.place_structure((2, 0), Structure::low_wall());
        let target = Vec2::new(1.5, 0.5);

        let from_east = cover_against(&grid, target, Posture::Prone, Vec2::new(5.5, 0.5));
        let from_west = cover_against(&grid, Vec2::new(3.5, 0.5), Posture::Prone, Vec2::new(5.5, 0.5));

        assert!((from_east - 0.8).abs() < 1e-6);
        assert!(from_west < 0.2);
    }
}
