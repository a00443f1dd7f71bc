//! Translated orders and the plan a unit is executing

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::core::types::UnitIndex;
use crate::orders::actions::{ActionKind, ActionTarget, PrimitiveAction};
use crate::orders::order::{Order, OrderType};
use crate::unit::state::Behavior;

/// Translator output: prerequisites first, then the order's own action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub order_type: OrderType,
    pub actions: Vec<PrimitiveAction>,
    pub behavior: Behavior,
}

impl Plan {
    pub fn kinds(&self) -> Vec<ActionKind> {
        self.actions.iter().map(|a| a.kind).collect()
    }
}

/// Whether a plan serves the queued order or a decision-layer override
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlanOrigin {
    Order,
    Autonomous,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivePlan {
    pub origin: PlanOrigin,
    /// The order this plan was translated from, kept for replanning
    pub order: Order,
    pub steps: VecDeque<PrimitiveAction>,
    pub behavior: Behavior,
    /// Next waypoint of the front movement step
    pub waypoint: usize,
    /// Whether the front step's on-start effects have been applied
    pub started: bool,
}

impl ActivePlan {
    pub fn new(plan: Plan, order: Order, origin: PlanOrigin) -> Self {
        Self {
            origin,
            order,
            steps: plan.actions.into(),
            behavior: plan.behavior,
            waypoint: 0,
            started: false,
        }
    }

    pub fn order_type(&self) -> OrderType {
        self.order.order_type
    }

    pub fn front(&self) -> Option<&PrimitiveAction> {
        self.steps.front()
    }

    pub fn advance(&mut self) {
        self.steps.pop_front();
        self.waypoint = 0;
        self.started = false;
    }

    /// Unit this plan is aimed at, if any
    pub fn target_unit(&self) -> Option<UnitIndex> {
        self.steps.iter().find_map(|step| match step.target {
            ActionTarget::Unit(index) => Some(index),
            _ => None,
        })
    }

    /// Rebind every unit reference after a removal. Returns false when the
    /// plan referenced the removed unit and can no longer be executed.
    pub fn rebind(&mut self, mut remap: impl FnMut(UnitIndex) -> Option<UnitIndex>) -> bool {
        let mut intact = true;
        for step in self.steps.iter_mut() {
            if let ActionTarget::Unit(index) = step.target {
                match remap(index) {
                    Some(to) => step.target = ActionTarget::Unit(to),
                    None => intact = false,
                }
            }
        }
        if let Behavior::EngageTarget(index) = self.behavior {
            match remap(index) {
                Some(to) => self.behavior = Behavior::EngageTarget(to),
                None => intact = false,
            }
        }
        intact
    }
}
