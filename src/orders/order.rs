//! Player and AI intent records

use serde::{Deserialize, Serialize};

use crate::core::types::{Facing, Tick, UnitId, Vec2};
use crate::orders::formation::Formation;
use crate::unit::state::Posture;

/// Kind of intent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    Move,
    MoveFast,
    Sneak,
    Defend,
    Hide,
    Engage,
    Stop,
    FireAtPosition,
}

impl OrderType {
    /// Standing orders stay at the head of the queue until another order is
    /// queued behind them
    pub fn is_standing(&self) -> bool {
        matches!(self, OrderType::Defend | OrderType::Hide | OrderType::Stop)
    }

    pub fn is_hostile(&self) -> bool {
        matches!(self, OrderType::Engage | OrderType::FireAtPosition)
    }
}

/// Order priority levels with explicit ordering values
///
/// High and above stop the decision layer from auto-engaging. Critical also
/// interrupts a committed gesture and clears the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum OrderPriority {
    Low = 0,
    #[default]
    Normal = 1,
    High = 2,
    Critical = 3,
}

/// Who issued an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OrderSource {
    #[default]
    Player,
    Autonomous,
}

/// Intent record
///
/// Target units are named by stable id; the translator resolves them to
/// table indices against the snapshot it is given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_type: OrderType,
    pub target_position: Option<Vec2>,
    pub target_unit: Option<UnitId>,
    pub facing: Option<Facing>,
    pub formation: Option<Formation>,
    pub posture: Option<Posture>,
    pub priority: OrderPriority,
    pub source: OrderSource,
    pub issued_at: Tick,
}

impl Order {
    pub fn new(order_type: OrderType, issued_at: Tick) -> Self {
        Self {
            order_type,
            target_position: None,
            target_unit: None,
            facing: None,
            formation: None,
            posture: None,
            priority: OrderPriority::Normal,
            source: OrderSource::Player,
            issued_at,
        }
    }

    pub fn move_to(destination: Vec2, tick: Tick) -> Self {
        Self::new(OrderType::Move, tick).with_position(destination)
    }

    pub fn move_fast_to(destination: Vec2, tick: Tick) -> Self {
        Self::new(OrderType::MoveFast, tick).with_position(destination)
    }

    pub fn sneak_to(destination: Vec2, tick: Tick) -> Self {
        Self::new(OrderType::Sneak, tick).with_position(destination)
    }

    pub fn engage(target: UnitId, tick: Tick) -> Self {
        Self::new(OrderType::Engage, tick).with_unit(target)
    }

    pub fn fire_at(position: Vec2, tick: Tick) -> Self {
        Self::new(OrderType::FireAtPosition, tick).with_position(position)
    }

    pub fn defend(facing: Facing, tick: Tick) -> Self {
        Self::new(OrderType::Defend, tick).with_facing(facing)
    }

    pub fn hide(tick: Tick) -> Self {
        Self::new(OrderType::Hide, tick)
    }

    pub fn stop(tick: Tick) -> Self {
        Self::new(OrderType::Stop, tick)
    }

    pub fn with_position(mut self, pos: Vec2) -> Self {
        self.target_position = Some(pos);
        self
    }

    pub fn with_unit(mut self, unit: UnitId) -> Self {
        self.target_unit = Some(unit);
        self
    }

    pub fn with_facing(mut self, facing: Facing) -> Self {
        self.facing = Some(facing);
        self
    }

    pub fn with_formation(mut self, formation: Formation) -> Self {
        self.formation = Some(formation);
        self
    }

    pub fn with_posture(mut self, posture: Posture) -> Self {
        self.posture = Some(posture);
        self
    }

    pub fn with_priority(mut self, priority: OrderPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn autonomous(mut self) -> Self {
        self.source = OrderSource::Autonomous;
        self
    }
}
