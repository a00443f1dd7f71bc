//! Lockstep Tactics - deterministic simulation core for squad-level combat
//!
//! Every peer running the same seed, content and command stream produces
//! bit-identical state at every tick. [`simulation::Simulation`] is the
//! entry point.

pub mod content;
pub mod core;
pub mod decision;
pub mod orders;
pub mod perception;
pub mod sight;
pub mod simulation;
pub mod spatial;
pub mod terrain;
pub mod unit;

pub use crate::core::{SimError, SimulationConfig};
pub use crate::simulation::{Simulation, TickOutcome};
