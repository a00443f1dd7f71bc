//! A* pathfinding over terrain cells
//!
//! 8-neighbor moves weighted by movement cost. Diagonals may not cut a
//! corner past an impassable orthogonal neighbor, so straight segments
//! between consecutive waypoints stay on passable ground.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::core::types::Vec2;
use crate::terrain::Terrain;

/// Cheapest movement cost of any terrain; keeps the heuristic admissible
const MIN_STEP_COST: f32 = 0.8;

/// Upper bound on expanded cells for one search
const MAX_EXPANSIONS: usize = 65_536;

type Cell = (i32, i32);

#[derive(Debug, Clone)]
struct PathNode {
    cell: Cell,
    f_cost: f32, // g_cost + heuristic
}

impl PartialEq for PathNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PathNode {}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap, cell breaks ties
        other
            .f_cost
            .partial_cmp(&self.f_cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.cell.cmp(&self.cell))
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

const NEIGHBORS: [(i32, i32); 8] = [(1, 0), (-1, 0), (0, 1), (0, -1), (1, 1), (1, -1), (-1, 1), (-1, -1)];

fn octile(a: Cell, b: Cell) -> f32 {
    let dx = (a.0 - b.0).abs() as f32;
    let dy = (a.1 - b.1).abs() as f32;
    let (lo, hi) = if dx < dy { (dx, dy) } else { (dy, dx) };
    (hi - lo + lo * std::f32::consts::SQRT_2) * MIN_STEP_COST
}

fn cell_cost<T: Terrain + ?Sized>(terrain: &T, cell: Cell) -> Option<f32> {
    terrain.movement_cost(terrain.cell_center(cell))
}

/// Find a path from `start` to `goal`.
///
/// Returns waypoints (centers of the cells after the start cell, with the
/// last one replaced by `goal` itself), or `None` if no path exists.
pub fn find_path<T: Terrain + ?Sized>(terrain: &T, start: Vec2, goal: Vec2) -> Option<Vec<Vec2>> {
    if !terrain.is_passable(goal) {
        return None;
    }
    let start_cell = terrain.cell_of(start);
    let goal_cell = terrain.cell_of(goal);
    if start_cell == goal_cell {
        return Some(vec![goal]);
    }

    let mut open_set = BinaryHeap::new();
    let mut came_from: HashMap<Cell, Cell> = HashMap::new();
    let mut g_scores: HashMap<Cell, f32> = HashMap::new();

    g_scores.insert(start_cell, 0.0);
    open_set.push(PathNode {
        cell: start_cell,
        f_cost: octile(start_cell, goal_cell),
    });

    let mut expansions = 0;
    while let Some(current) = open_set.pop() {
        if current.cell == goal_cell {
            let cells = reconstruct_path(&came_from, current.cell);
            let mut waypoints: Vec<Vec2> = cells[1..].iter().map(|&c| terrain.cell_center(c)).collect();
            if let Some(last) = waypoints.last_mut() {
                *last = goal;
            }
            return Some(waypoints);
        }

        expansions += 1;
        if expansions > MAX_EXPANSIONS {
            tracing::debug!("Path search exceeded {} expansions", MAX_EXPANSIONS);
            return None;
        }

        let current_g = *g_scores.get(&current.cell).unwrap_or(&f32::INFINITY);

        for (dx, dy) in NEIGHBORS {
            let neighbor = (current.cell.0 + dx, current.cell.1 + dy);
            let Some(move_cost) = cell_cost(terrain, neighbor) else {
                continue;
            };

            let diagonal = dx != 0 && dy != 0;
            if diagonal {
                let side_a = cell_cost(terrain, (current.cell.0 + dx, current.cell.1));
                let side_b = cell_cost(terrain, (current.cell.0, current.cell.1 + dy));
                if side_a.is_none() || side_b.is_none() {
                    continue;
                }
            }

            let step = if diagonal { std::f32::consts::SQRT_2 } else { 1.0 };
            let tentative_g = current_g + move_cost * step;
            let neighbor_g = *g_scores.get(&neighbor).unwrap_or(&f32::INFINITY);

            if tentative_g < neighbor_g {
                came_from.insert(neighbor, current.cell);
                g_scores.insert(neighbor, tentative_g);
                open_set.push(PathNode {
                    cell: neighbor,
                    f_cost: tentative_g + octile(neighbor, goal_cell),
                });
            }
        }
    }

    None
}

fn reconstruct_path(came_from: &HashMap<Cell, Cell>, mut current: Cell) -> Vec<Cell> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::TerrainGrid;

    #[test]
    fn test_straight_line() {
        let grid = TerrainGrid::open(10, 10, 1.0);
        let path = find_path(&grid, Vec2::new(0.5, 0.5), Vec2::new(5.5, 0.5)).unwrap();
        assert_eq!(path.len(), 5);
        assert_eq!(path.last(), Some(&Vec2::new(5.5, 0.5)));
    }

    #[test]
    fn test_same_cell() {
        let grid = TerrainGrid::open(4, 4, 2.0);
        let path = find_path(&grid, Vec2::new(0.2, 0.2), Vec2::new(1.8, 1.1)).unwrap();
        assert_eq!(path, vec![Vec2::new(1.8, 1.1)]);
    }

    #[test]
    fn test_around_wall() {
        let grid = TerrainGrid::from_ascii(
            "
            .....
            .###.
            .....
            ",
            1.0,
        )
        .unwrap();
        let path = find_path(&grid, Vec2::new(2.5, 0.5), Vec2::new(2.5, 2.5)).unwrap();
        for waypoint in &path {
            assert!(grid.is_passable(*waypoint));
        }
        assert_eq!(path.last(), Some(&Vec2::new(2.5, 2.5)));
    }

    #[test]
    fn test_no_path_when_enclosed() {
        let grid = TerrainGrid::from_ascii(
            "
            .....
            .###.
            .#.#.
            .###.
            ",
            1.0,
        )
        .unwrap();
        assert!(find_path(&grid, Vec2::new(0.5, 0.5), Vec2::new(2.5, 2.5)).is_none());
    }

    #[test]
    fn test_no_corner_cutting() {
        let grid = TerrainGrid::from_ascii(
            "
            .#
            #.
            ",
            1.0,
        )
        .unwrap();
        assert!(find_path(&grid, Vec2::new(0.5, 0.5), Vec2::new(1.5, 1.5)).is_none());
    }

    #[test]
    fn test_impassable_goal() {
        let grid = TerrainGrid::from_ascii("..W", 1.0).unwrap();
        assert!(find_path(&grid, Vec2::new(0.5, 0.5), Vec2::new(2.5, 0.5)).is_none());
    }
}
