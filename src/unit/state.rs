//! Three-level unit state: phase (minutes), behavior (seconds), gesture (ticks)
//!
//! Behavior changes are checked against a static table of legal pairs.
//! Dead is absorbing, as are the terminal phases.

use serde::{Deserialize, Serialize};

use crate::core::error::TransitionError;
use crate::core::types::{Facing, Side, Tick, UnitIndex, Vec2};
use crate::unit::capability::{Capability, CapabilitySet};

/// Game-level phase shared by every unit of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Deployment,
    Battle,
    Victory(Side),
    Defeat(Side),
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Victory(_) | Phase::Defeat(_))
    }

    /// Deployment -> Battle -> Victory | Defeat, nothing else
    pub fn advance_to(&self, next: Phase) -> Result<Phase, TransitionError> {
        let legal = matches!(
            (self, next),
            (Phase::Deployment, Phase::Battle)
                | (Phase::Battle, Phase::Victory(_))
                | (Phase::Battle, Phase::Defeat(_))
        );
        if legal {
            Ok(next)
        } else {
            Err(TransitionError::InvalidPhase { from: *self, to: next })
        }
    }
}

/// Body posture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Posture {
    #[default]
    Standing,
    Crouched,
    Prone,
}

impl Posture {
    /// Capability bit that marks this posture
    pub fn capability(&self) -> Capability {
        match self {
            Posture::Standing => Capability::IsStanding,
            Posture::Crouched => Capability::IsCrouched,
            Posture::Prone => Capability::IsProne,
        }
    }

    /// Read the posture back out of a capability set. Prone wins over
    /// crouched wins over standing; no posture bit reads as standing.
    pub fn from_capabilities(caps: CapabilitySet) -> Posture {
        if caps.has(Capability::IsProne) {
            Posture::Prone
        } else if caps.has(Capability::IsCrouched) {
            Posture::Crouched
        } else {
            Posture::Standing
        }
    }
}

/// Waypoints of a move, cell centers from the pathfinder
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub waypoints: Vec<Vec2>,
}

impl Path {
    pub fn new(waypoints: Vec<Vec2>) -> Self {
        Self { waypoints }
    }

    pub fn destination(&self) -> Option<Vec2> {
        self.waypoints.last().copied()
    }
}

/// Tactical behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Behavior {
    Idle(Posture),
    MoveTo(Path),
    Defend(Facing),
    EngageTarget(UnitIndex),
    Hide(Facing),
    Panicked,
    Dead,
}

impl Default for Behavior {
    fn default() -> Self {
        Behavior::Idle(Posture::Standing)
    }
}

/// Payload-free discriminant of [`Behavior`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum BehaviorKind {
    Idle = 0,
    MoveTo = 1,
    Defend = 2,
    EngageTarget = 3,
    Hide = 4,
    Panicked = 5,
    Dead = 6,
}

impl Behavior {
    pub fn kind(&self) -> BehaviorKind {
        match self {
            Behavior::Idle(_) => BehaviorKind::Idle,
            Behavior::MoveTo(_) => BehaviorKind::MoveTo,
            Behavior::Defend(_) => BehaviorKind::Defend,
            Behavior::EngageTarget(_) => BehaviorKind::EngageTarget,
            Behavior::Hide(_) => BehaviorKind::Hide,
            Behavior::Panicked => BehaviorKind::Panicked,
            Behavior::Dead => BehaviorKind::Dead,
        }
    }

    pub fn is_dead(&self) -> bool {
        matches!(self, Behavior::Dead)
    }
}

// Rows: from. Columns: to. Order follows BehaviorKind discriminants:
// Idle, MoveTo, Defend, EngageTarget, Hide, Panicked, Dead
const T: bool = true;
const F: bool = false;
const LEGAL_TRANSITIONS: [[bool; 7]; 7] = [
    /* Idle         */ [T, T, T, T, T, T, T],
    /* MoveTo       */ [T, T, T, T, T, T, T],
    /* Defend       */ [T, T, T, T, T, T, T],
    /* EngageTarget */ [T, T, T, T, T, T, T],
    /* Hide         */ [T, T, T, T, T, T, T],
    /* Panicked     */ [T, T, F, F, T, T, T],
    /* Dead         */ [F, F, F, F, F, F, F],
];

/// Is `from -> to` in the legal table?
pub fn is_legal_transition(from: BehaviorKind, to: BehaviorKind) -> bool {
    LEGAL_TRANSITIONS[from as usize][to as usize]
}

/// Check a transition without applying it
pub fn check_transition(from: &Behavior, to: &Behavior) -> Result<(), TransitionError> {
    if is_legal_transition(from.kind(), to.kind()) {
        Ok(())
    } else {
        Err(TransitionError::InvalidTransition { from: from.kind(), to: to.kind() })
    }
}

/// What a weapon gesture is pointed at
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FireTarget {
    Unit(UnitIndex),
    Position(Vec2),
}

/// Physical action on the shortest timescale
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Gesture {
    #[default]
    Idle,
    Reloading { end_tick: Tick },
    Aiming { end_tick: Tick, target: FireTarget },
    Firing { end_tick: Tick, target: FireTarget },
    ChangingPosture { from: Posture, to: Posture, end_tick: Tick },
}

/// Payload-free discriminant of [`Gesture`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum GestureKind {
    Idle = 0,
    Reloading = 1,
    Aiming = 2,
    Firing = 3,
    ChangingPosture = 4,
}

impl Gesture {
    pub fn kind(&self) -> GestureKind {
        match self {
            Gesture::Idle => GestureKind::Idle,
            Gesture::Reloading { .. } => GestureKind::Reloading,
            Gesture::Aiming { .. } => GestureKind::Aiming,
            Gesture::Firing { .. } => GestureKind::Firing,
            Gesture::ChangingPosture { .. } => GestureKind::ChangingPosture,
        }
    }

    pub fn end_tick(&self) -> Option<Tick> {
        match self {
            Gesture::Idle => None,
            Gesture::Reloading { end_tick }
            | Gesture::Aiming { end_tick, .. }
            | Gesture::Firing { end_tick, .. }
            | Gesture::ChangingPosture { end_tick, .. } => Some(*end_tick),
        }
    }

    /// A gesture with an end tick cannot be interrupted except by a
    /// Critical order or death
    pub fn is_committed(&self) -> bool {
        self.end_tick().is_some()
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, Gesture::Idle)
    }

    pub fn target(&self) -> Option<FireTarget> {
        match self {
            Gesture::Aiming { target, .. } | Gesture::Firing { target, .. } => Some(*target),
            _ => None,
        }
    }
}
