//! Line-of-sight regression against a fixed terrain fixture
//!
//! Sight lines are sampled from the canonically smaller endpoint, so
//! `can_see(a, b)` and `can_see(b, a)` agree exactly: the tolerance is zero.

use lockstep_tactics::core::types::Vec2;
use lockstep_tactics::sight::{can_see, SightParams};
use lockstep_tactics::terrain::TerrainGrid;

// y = 0 open, y = 1 wall at x = 4, y = 2 three forest cells,
// y = 3 two forest cells, y = 4 house at x = 2
const FIXTURE: &str = "
...........
....#......
...TTT.....
.....TT....
..H........
";

fn fixture() -> TerrainGrid {
    TerrainGrid::from_ascii(FIXTURE, 1.0).unwrap()
}

#[test]
fn test_visibility_table() {
    let terrain = fixture();
    let params = SightParams::default();
    let table = [
        ((0.5, 0.5), (10.5, 0.5), true),
        ((0.5, 1.5), (10.5, 1.5), false),
        ((0.5, 2.5), (10.5, 2.5), false),
        ((0.5, 3.5), (10.5, 3.5), true),
        ((0.5, 4.5), (10.5, 4.5), false),
        // Inside the always-visible radius the wall is ignored
        ((3.5, 1.5), (5.5, 1.5), true),
        ((6.5, 0.5), (10.5, 4.5), true),
    ];
    for ((ax, ay), (bx, by), expected) in table {
        let a = Vec2::new(ax, ay);
        let b = Vec2::new(bx, by);
        assert_eq!(can_see(&terrain, a, b, &params), expected, "({ax}, {ay}) -> ({bx}, {by})");
    }
}

#[test]
fn test_sight_is_symmetric_over_fixture() {
    let terrain = fixture();
    let params = SightParams::default();
    let points: Vec<Vec2> = (0..11)
        .flat_map(|x| (0..5).map(move |y| Vec2::new(x as f32 + 0.5, y as f32 + 0.5)))
        .chain([Vec2::new(0.1, 2.9), Vec2::new(10.9, 2.1), Vec2::new(5.0, 3.0)])
        .collect();
    for &a in &points {
        for &b in &points {
            assert_eq!(
                can_see(&terrain, a, b, &params),
                can_see(&terrain, b, a, &params),
                "asymmetric sight between {a:?} and {b:?}"
            );
        }
    }
}
