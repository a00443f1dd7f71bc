pub mod config;
pub mod error;
pub mod types;

pub use config::SimulationConfig;
pub use error::{ConfigError, Rejection, Result, SimError, TransitionError};
pub use types::{Facing, PlayerId, Side, Tick, UnitId, UnitIndex, Vec2};
