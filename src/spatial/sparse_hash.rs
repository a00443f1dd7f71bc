//! Sparse hash grid for spatial queries over unit indices

use ahash::AHashMap;

use crate::core::types::{UnitIndex, Vec2};

/// Uniform grid keyed by `floor(position / cell_size)`.
///
/// A derived cache of unit positions: the unit table stays the source of
/// truth, and the scheduler keeps this in step on every move and removal.
#[derive(Debug, Clone)]
pub struct SparseHashGrid {
    cell_size: f32,
    cells: AHashMap<(i32, i32), Vec<UnitIndex>>,
}

impl SparseHashGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            cells: AHashMap::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    #[inline]
    pub fn cell_coord(&self, pos: Vec2) -> (i32, i32) {
        (
            (pos.x / self.cell_size).floor() as i32,
            (pos.y / self.cell_size).floor() as i32,
        )
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn len(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.values().all(Vec::is_empty)
    }

    pub fn insert(&mut self, unit: UnitIndex, pos: Vec2) {
        let coord = self.cell_coord(pos);
        self.cells.entry(coord).or_default().push(unit);
    }

    pub fn remove(&mut self, unit: UnitIndex, pos: Vec2) -> bool {
        let coord = self.cell_coord(pos);
        let Some(cell) = self.cells.get_mut(&coord) else {
            return false;
        };
        let Some(slot) = cell.iter().position(|&u| u == unit) else {
            return false;
        };
        cell.swap_remove(slot);
        if cell.is_empty() {
            self.cells.remove(&coord);
        }
        true
    }

    /// Move a unit between cells; a no-op while it stays in one cell
    pub fn relocate(&mut self, unit: UnitIndex, from: Vec2, to: Vec2) {
        if self.cell_coord(from) == self.cell_coord(to) {
            return;
        }
        self.remove(unit, from);
        self.insert(unit, to);
    }

    /// Point an entry at a new index after the unit table swap-removed
    pub fn rename(&mut self, from: UnitIndex, to: UnitIndex, pos: Vec2) {
        let coord = self.cell_coord(pos);
        if let Some(cell) = self.cells.get_mut(&coord) {
            for entry in cell.iter_mut() {
                if *entry == from {
                    *entry = to;
                }
            }
        }
    }

    pub fn contains(&self, unit: UnitIndex, pos: Vec2) -> bool {
        self.cells
            .get(&self.cell_coord(pos))
            .is_some_and(|cell| cell.contains(&unit))
    }

    /// Units within `radius` of `center`.
    ///
    /// Visits only the cells overlapping the query square, then filters by
    /// exact distance. The result is unordered; sort before relying on it.
    pub fn query_radius(
        &self,
        center: Vec2,
        radius: f32,
        position_of: impl Fn(UnitIndex) -> Option<Vec2>,
    ) -> Vec<UnitIndex> {
        let radius_sq = radius * radius;
        let (min_x, min_y) = self.cell_coord(Vec2::new(center.x - radius, center.y - radius));
        let (max_x, max_y) = self.cell_coord(Vec2::new(center.x + radius, center.y + radius));

        let mut found = Vec::new();
        for cx in min_x..=max_x {
            for cy in min_y..=max_y {
                let Some(cell) = self.cells.get(&(cx, cy)) else {
                    continue;
                };
                for &unit in cell {
                    if position_of(unit).is_some_and(|pos| pos.distance_sq(&center) <= radius_sq) {
                        found.push(unit);
                    }
                }
            }
        }
        found
    }

    /// Rebuild grid from positions
    pub fn rebuild(&mut self, units: impl Iterator<Item = (UnitIndex, Vec2)>) {
        self.clear();
        for (unit, pos) in units {
            self.insert(unit, pos);
        }
    }
}
