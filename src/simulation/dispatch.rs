//! Applying decision-layer messages to the unit table

use tracing::debug;

use crate::orders::plan::{ActivePlan, PlanOrigin};
use crate::simulation::events::SimEventKind;
use crate::simulation::messages::{Message, TransitionCause};
use crate::simulation::scheduler::Simulation;
use crate::terrain::Terrain;

impl Simulation {
    pub(crate) fn apply_message(&mut self, message: Message) {
        let tick = self.tick;
        let index = message.unit();
        let Some(unit) = self.units.get_mut(index) else {
            debug!("Message for missing unit {:?} dropped", index);
            return;
        };
        if !unit.is_alive() {
            return;
        }
        let id = unit.id;

        match message {
            Message::Transition { behavior, cause, .. } => {
                let from = unit.behavior.kind();
                let to = behavior.kind();
                match unit.transition(behavior, tick, &mut self.events) {
                    Ok(()) if cause == TransitionCause::Override && from != to => {
                        self.events.push(tick, SimEventKind::AutonomousOverride { unit: id, behavior: to });
                    }
                    Ok(()) => {}
                    Err(err) => debug!("Unit {:?}: {}", id, err),
                }
            }

            Message::SetPlan { plan, .. } => {
                if let Some(plan) = &plan {
                    self.events.push(
                        tick,
                        SimEventKind::ActionsPlanned {
                            unit: id,
                            order: plan.order_type(),
                            actions: plan.steps.iter().map(|s| s.kind).collect(),
                        },
                    );
                }
                unit.current_action = plan;
            }

            Message::AdvancePlan { .. } => {
                if let Some(plan) = unit.current_action.as_mut() {
                    plan.advance();
                }
            }

            Message::StartStep { action, .. } => {
                if let Some(def) = self.content.actions.get(action) {
                    unit.capabilities = def.effect_on(unit.capabilities);
                }
                if let Some(plan) = unit.current_action.as_mut() {
                    plan.started = true;
                }
            }

            Message::CompleteOrder { .. } => {
                drop_order_plan(&mut unit.current_action);
                if let Some(order) = unit.orders.pop_front() {
                    self.events.push(
                        tick,
                        SimEventKind::OrderCompleted {
                            unit: id,
                            order: order.order_type,
                        },
                    );
                }
            }

            Message::RejectOrder { reason, .. } => {
                drop_order_plan(&mut unit.current_action);
                if let Some(order) = unit.orders.pop_front() {
                    debug!("Order {:?} for {:?} abandoned: {}", order.order_type, id, reason);
                    self.events.push(
                        tick,
                        SimEventKind::OrderRejected {
                            unit: id,
                            order: order.order_type,
                            reason,
                        },
                    );
                }
            }

            Message::StartGesture { gesture, .. } => {
                if !unit.gesture.is_committed() {
                    unit.set_gesture(gesture, tick, &mut self.events);
                }
            }

            Message::Move { to, waypoint, facing, .. } => {
                if !self.terrain.is_passable(to) {
                    debug!("Unit {:?} blocked at ({:.1}, {:.1}), dropping plan", id, to.x, to.y);
                    unit.current_action = None;
                    return;
                }
                let from = unit.position;
                unit.position = to;
                unit.facing = facing;
                if let Some(plan) = unit.current_action.as_mut() {
                    plan.waypoint = waypoint;
                }
                self.spatial.relocate(index, from, to);
            }

            Message::Face { facing, .. } => unit.facing = facing,
        }
    }
}

/// An order-driven plan ends with its order; an override plan does not
fn drop_order_plan(plan: &mut Option<ActivePlan>) {
    if plan.as_ref().is_some_and(|p| p.origin == PlanOrigin::Order) {
        *plan = None;
    }
}
