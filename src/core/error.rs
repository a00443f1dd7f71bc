use thiserror::Error;
use serde::{Deserialize, Serialize};

use crate::core::types::{PlayerId, Tick, UnitId};
use crate::orders::order::OrderType;
use crate::unit::capability::Capability;
use crate::unit::state::{BehaviorKind, Phase};

/// Why the translator refused an order
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Rejection {
    #[error("unit is dead")]
    UnitDead,

    #[error("{order:?} orders are forbidden during {phase:?}")]
    ForbiddenInPhase { order: OrderType, phase: Phase },

    #[error("no path to target")]
    NoPath,

    #[error("order is missing its {0}")]
    #[serde(skip_deserializing)]
    Malformed(#[serde(skip_deserializing)] &'static str),

    #[error("target is out of range ({distance:.1} > {range:.1})")]
    TargetOutOfRange { distance: f32, range: f32 },

    #[error("target unit is not a valid enemy")]
    InvalidTarget,

    #[error("no action grants required capability {0:?}")]
    MissingCapability(Capability),

    #[error("capability requirements cannot all hold at once")]
    ConflictingRequirements,

    #[error("unit has no weapon")]
    Unarmed,

    #[error("order carries a stale or unknown unit reference {0:?}")]
    UnknownUnit(UnitId),

    #[error("unit is mounted in a vehicle")]
    Mounted,

    #[error("no ammunition left to reload")]
    OutOfAmmo,
}

/// Illegal behavior change
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    #[error("invalid transition {from:?} -> {to:?}")]
    InvalidTransition { from: BehaviorKind, to: BehaviorKind },

    #[error("invalid phase transition {from:?} -> {to:?}")]
    InvalidPhase { from: Phase, to: Phase },
}

/// Content or configuration that must stop the simulation from starting
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("capability {capability:?} is granted by more than one action: {actions:?}")]
    AmbiguousGrant { capability: Capability, actions: Vec<String> },

    #[error("prerequisite cycle through actions {0:?}")]
    PrerequisiteCycle(Vec<String>),

    #[error("action {0} adds and removes the same capability")]
    SelfContradictoryAction(String),

    #[error("duplicate action name {0}")]
    DuplicateAction(String),

    #[error("no action of kind {0} is defined")]
    MissingActionKind(&'static str),

    #[error("unknown unit template {0}")]
    UnknownTemplate(String),

    #[error("invalid setting: {0}")]
    InvalidSetting(String),

    #[error("unit spawned on impassable terrain at ({x}, {y})")]
    ImpassableSpawn { x: f32, y: f32 },
}

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Validation error: {0}")]
    Validation(#[from] Rejection),

    #[error("Transition error: {0}")]
    Transition(#[from] TransitionError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Desync at tick {tick}: local hash {local:#018x}, remote hash {remote:#018x}")]
    Desync { tick: Tick, local: u64, remote: u64 },

    #[error("No state hash recorded for tick {0}")]
    HashUnavailable(Tick),

    #[error("Unit not found: {0:?}")]
    UnknownUnit(UnitId),

    #[error("Command scheduled for tick {scheduled} but simulation is at tick {current}")]
    LateCommand { scheduled: Tick, current: Tick },

    #[error("Command key (tick {tick}, player {player}, seq {seq}) is already scheduled")]
    DuplicateCommand { tick: Tick, player: PlayerId, seq: u32 },

    #[error("Invariant violated after tick {tick}: {detail}")]
    InvariantViolation { tick: Tick, detail: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
