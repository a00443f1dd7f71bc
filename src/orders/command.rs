//! Input envelope applied at the start of a tick
//!
//! Local input, network peers and replays all enter the simulation as
//! [`ScheduledCommand`]s. Sorting by `(tick, player, seq)` gives every peer
//! the same application order.

use serde::{Deserialize, Serialize};

use crate::core::types::{PlayerId, Tick, UnitId, Vec2};
use crate::orders::order::Order;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Queue an order on a unit
    Issue { unit: UnitId, order: Order },
    /// Clear a unit's queue and drop its plan
    Cancel { unit: UnitId },
    /// Deployment -> Battle
    BeginBattle,
    /// Environmental trigger: damage falloff, structure destruction, threat
    Explosion { position: Vec2, radius: f32, damage: u32, threat: f32 },
    /// Remove a unit from the table this tick
    Despawn { unit: UnitId },
    Embark { unit: UnitId, vehicle: UnitId },
    Disembark { unit: UnitId },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledCommand {
    pub tick: Tick,
    pub player: PlayerId,
    pub seq: u32,
    pub command: Command,
}

impl ScheduledCommand {
    pub fn new(tick: Tick, player: PlayerId, seq: u32, command: Command) -> Self {
        Self { tick, player, seq, command }
    }

    pub fn key(&self) -> (Tick, PlayerId, u32) {
        (self.tick, self.player, self.seq)
    }
}
