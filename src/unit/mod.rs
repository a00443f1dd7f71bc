//! Capability/state model
//!
//! [`Unit`] is the atomic simulated actor. It is owned by [`UnitTable`] and
//! referenced elsewhere only by [`crate::core::types::UnitIndex`].

pub mod capability;
pub mod model;
pub mod state;
pub mod table;

pub use capability::{Capability, CapabilitySet, Condition, ConditionSet};
pub use model::{Ammo, CrewSlots, Health, Mobility, SquadLink, Unit};
pub use state::{Behavior, BehaviorKind, FireTarget, Gesture, GestureKind, Path, Phase, Posture};
pub use table::{Relocation, Removal, UnitTable};
