//! Outgoing event stream
//!
//! Every observable state change is appended here with the tick it happened
//! on. Consumers read the log; nothing in it feeds back into the simulation.

use serde::{Deserialize, Serialize};

use crate::core::error::Rejection;
use crate::core::types::{Tick, UnitId, Vec2};
use crate::orders::actions::ActionKind;
use crate::orders::order::OrderType;
use crate::unit::state::{BehaviorKind, GestureKind, Phase};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEventKind {
    BehaviorExited { unit: UnitId, behavior: BehaviorKind },
    BehaviorEntered { unit: UnitId, behavior: BehaviorKind },
    BehaviorChanged { unit: UnitId, from: BehaviorKind, to: BehaviorKind },
    /// The decision layer replaced the behavior the player's order asked for
    AutonomousOverride { unit: UnitId, behavior: BehaviorKind },
    GestureChanged { unit: UnitId, from: GestureKind, to: GestureKind },
    /// Actions a translated order expanded into, prerequisites first
    ActionsPlanned { unit: UnitId, order: OrderType, actions: Vec<ActionKind> },
    OrderCompleted { unit: UnitId, order: OrderType },
    OrderRejected { unit: UnitId, order: OrderType, reason: Rejection },
    OrdersCancelled { unit: UnitId },
    WeaponDischarged { unit: UnitId, position: Vec2 },
    DamageApplied { unit: UnitId, amount: u32, remaining: u32, source: Option<UnitId> },
    UnitDestroyed { unit: UnitId },
    UnitRemoved { unit: UnitId },
    Explosion { position: Vec2, magnitude: f32 },
    StructureDestroyed { cell: (i32, i32) },
    Embarked { unit: UnitId, vehicle: UnitId },
    Disembarked { unit: UnitId, vehicle: UnitId },
    PhaseChanged { from: Phase, to: Phase },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimEvent {
    pub tick: Tick,
    pub kind: SimEventKind,
}

/// Tick-ordered event log. Consumers either read it in place with a cursor
/// or take ownership of everything so far with [`EventLog::drain`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<SimEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, tick: Tick, kind: SimEventKind) {
        debug_assert!(self.events.last().map_or(true, |e| e.tick <= tick));
        self.events.push(SimEvent { tick, kind });
    }

    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    /// Events from position `cursor` onward, for incremental consumers
    pub fn since(&self, cursor: usize) -> &[SimEvent] {
        self.events.get(cursor..).unwrap_or(&[])
    }

    pub fn at_tick(&self, tick: Tick) -> impl Iterator<Item = &SimEvent> {
        self.events.iter().filter(move |e| e.tick == tick)
    }

    /// Hand every event recorded so far to the caller and empty the log.
    /// Cursors taken before the drain are invalidated.
    pub fn drain(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_since_cursor() {
        let mut log = EventLog::new();
        log.push(1, SimEventKind::UnitDestroyed { unit: UnitId(1) });
        log.push(2, SimEventKind::UnitRemoved { unit: UnitId(1) });

        assert_eq!(log.since(1).len(), 1);
        assert!(log.since(5).is_empty());
        assert_eq!(log.at_tick(2).count(), 1);
    }

    #[test]
    fn test_drain_empties_and_keeps_accepting() {
        let mut log = EventLog::new();
        log.push(1, SimEventKind::UnitDestroyed { unit: UnitId(1) });
        log.push(1, SimEventKind::UnitRemoved { unit: UnitId(1) });

        let taken = log.drain();
        assert_eq!(taken.len(), 2);
        assert!(log.is_empty());

        log.push(2, SimEventKind::UnitDestroyed { unit: UnitId(2) });
        assert_eq!(log.len(), 1);
        assert_eq!(log.events()[0].tick, 2);
    }
}
