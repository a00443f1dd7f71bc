//! State-mutation messages
//!
//! The decision layer never writes to the unit table. It returns messages,
//! and the scheduler applies them in unit-index order at the end of the
//! decision step.

use crate::core::error::Rejection;
use crate::core::types::{Facing, UnitIndex, Vec2};
use crate::orders::actions::ActionId;
use crate::orders::plan::ActivePlan;
use crate::unit::state::{Behavior, Gesture};

/// Why a behavior transition was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionCause {
    /// Following the queued order
    Order,
    /// Decision layer overriding the order (threat response, auto-engage)
    Override,
    /// Nothing to do
    Idle,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Transition {
        unit: UnitIndex,
        behavior: Behavior,
        cause: TransitionCause,
    },
    /// Replace (or drop) the plan being executed
    SetPlan { unit: UnitIndex, plan: Option<ActivePlan> },
    /// The front step is done
    AdvancePlan { unit: UnitIndex },
    /// Apply an action's capability effect and mark the front step started
    StartStep { unit: UnitIndex, action: ActionId },
    /// Pop the head order; it finished
    CompleteOrder { unit: UnitIndex },
    /// Pop the head order; it can no longer be carried out
    RejectOrder { unit: UnitIndex, reason: Rejection },
    StartGesture { unit: UnitIndex, gesture: Gesture },
    Move {
        unit: UnitIndex,
        to: Vec2,
        waypoint: usize,
        facing: Facing,
    },
    Face { unit: UnitIndex, facing: Facing },
}

impl Message {
    pub fn unit(&self) -> UnitIndex {
        match self {
            Message::Transition { unit, .. }
            | Message::SetPlan { unit, .. }
            | Message::AdvancePlan { unit }
            | Message::StartStep { unit, .. }
            | Message::CompleteOrder { unit }
            | Message::RejectOrder { unit, .. }
            | Message::StartGesture { unit, .. }
            | Message::Move { unit, .. }
            | Message::Face { unit, .. } => *unit,
        }
    }
}
