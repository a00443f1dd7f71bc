//! Reactive decision layer
//!
//! A priority selector evaluated per unit per tick. Evaluation only reads
//! the snapshot, so it runs in parallel for large tables; messages are
//! collected in unit-index order either way.

pub mod context;
pub mod selector;

use rayon::prelude::*;

use crate::core::types::UnitIndex;
use crate::simulation::messages::Message;

pub use context::{DecisionContext, ThreatLevel};
pub use selector::{decide, step_plan};

/// Decide for every unit, returning messages in index order
pub fn evaluate_all(ctx: &DecisionContext<'_>) -> Vec<Message> {
    let count = ctx.world.units.len();
    if count >= ctx.config().parallel_threshold {
        (0..count)
            .into_par_iter()
            .map(|i| decide(ctx, UnitIndex(i)))
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect()
    } else {
        (0..count).flat_map(|i| decide(ctx, UnitIndex(i))).collect()
    }
}
