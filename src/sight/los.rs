//! Line-of-sight sampling
//!
//! A sight line is sampled at the midpoints of `n = ceil(length / interval)`
//! equal steps. Each sample adds the terrain's opacity scaled by the step
//! length in cells, or 1.0 where the terrain blocks vision outright. Sight
//! is blocked once the total reaches the opacity threshold.
//!
//! Samples are always taken from the lexicographically smaller endpoint, so
//! `can_see(a, b) == can_see(b, a)` exactly: the direction tolerance is zero.

use std::cmp::Ordering;

use crate::core::config::SimulationConfig;
use crate::core::types::Vec2;
use crate::terrain::Terrain;

/// Sampling parameters, copied out of the config
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SightParams {
    pub sample_interval: f32,
    pub opacity_threshold: f32,
    pub always_visible_radius: f32,
}

impl SightParams {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            sample_interval: config.sight_sample_interval,
            opacity_threshold: config.opacity_threshold,
            always_visible_radius: config.always_visible_radius,
        }
    }
}

impl Default for SightParams {
    fn default() -> Self {
        Self::from_config(&SimulationConfig::default())
    }
}

fn canonical(a: Vec2, b: Vec2) -> (Vec2, Vec2) {
    let order = a.x.total_cmp(&b.x).then_with(|| a.y.total_cmp(&b.y));
    if order == Ordering::Greater {
        (b, a)
    } else {
        (a, b)
    }
}

/// Walk the samples of a sight line, stopping early once `limit` is reached
fn sample_opacity<T: Terrain + ?Sized>(terrain: &T, from: Vec2, to: Vec2, interval: f32, limit: f32) -> f32 {
    let (start, end) = canonical(from, to);
    let length = start.distance(&end);
    if length <= 0.0 {
        return 0.0;
    }

    let samples = (length / interval).ceil().max(1.0) as usize;
    let step = (end - start) * (1.0 / samples as f32);
    let weight = (length / samples as f32) / terrain.cell_size();

    let mut total = 0.0;
    for k in 0..samples {
        let point = start + step * (k as f32 + 0.5);
        total += if terrain.blocks_vision(point) {
            1.0
        } else {
            terrain.opacity(point) * weight
        };
        if total >= limit {
            break;
        }
    }
    total
}

/// Total opacity along the segment, without early exit
pub fn accumulated_opacity<T: Terrain + ?Sized>(terrain: &T, from: Vec2, to: Vec2, interval: f32) -> f32 {
    sample_opacity(terrain, from, to, interval, f32::INFINITY)
}

/// Can a unit at `from` see a unit at `to`?
pub fn can_see<T: Terrain + ?Sized>(terrain: &T, from: Vec2, to: Vec2, params: &SightParams) -> bool {
    let near = params.always_visible_radius;
    if from.distance_sq(&to) <= near * near {
        return true;
    }
    sample_opacity(terrain, from, to, params.sample_interval, params.opacity_threshold) < params.opacity_threshold
}
