//! Tiered behavior selector
//!
//! Evaluated for every living unit each tick, first match wins:
//!
//! 1. threat above the danger threshold: hide, or panic above the panic threshold
//! 2. a visible enemy in weapon range: engage it
//! 3. carry on with the queued order
//! 4. idle
//!
//! Only tier 1 may change behavior while a committed gesture runs. The
//! selector is a pure function of the snapshot; it returns messages and the
//! scheduler applies them.

use crate::core::error::Rejection;
use crate::core::types::{Facing, UnitIndex, Vec2};
use crate::decision::context::{DecisionContext, ThreatLevel};
use crate::orders::actions::{ActionKind, ActionTarget};
use crate::orders::order::{Order, OrderPriority, OrderType};
use crate::orders::plan::{ActivePlan, PlanOrigin};
use crate::orders::translator::{requirements_for, translate};
use crate::simulation::messages::{Message, TransitionCause};
use crate::terrain::Terrain;
use crate::unit::capability::Capability;
use crate::unit::model::Unit;
use crate::unit::state::{is_legal_transition, Behavior, FireTarget, Gesture};

/// Decide what the unit at `index` does this tick
pub fn decide(ctx: &DecisionContext<'_>, index: UnitIndex) -> Vec<Message> {
    let Some(unit) = ctx.unit(index) else {
        return Vec::new();
    };
    if !unit.is_alive() || unit.is_mounted() {
        return Vec::new();
    }

    match ctx.threat_level(unit) {
        ThreatLevel::Panic => return respond_to_threat(ctx, index, unit, true),
        ThreatLevel::Danger => return respond_to_threat(ctx, index, unit, false),
        ThreatLevel::Calm => {}
    }

    if unit.behavior == Behavior::Panicked {
        // Calmed down. Panic only exits to Idle; the lower tiers pick up from there.
        return vec![
            Message::SetPlan { unit: index, plan: None },
            Message::Transition {
                unit: index,
                behavior: Behavior::Idle(unit.posture()),
                cause: TransitionCause::Idle,
            },
        ];
    }

    if unit.gesture.is_committed() {
        return Vec::new();
    }

    if let Some(messages) = auto_engage(ctx, index, unit) {
        return messages;
    }

    if let Some(order) = unit.orders.front() {
        return follow_order(ctx, index, unit, order);
    }

    idle(index, unit)
}

fn is_autonomous(plan: &ActivePlan, order_type: OrderType) -> bool {
    plan.origin == PlanOrigin::Autonomous && plan.order_type() == order_type
}

/// Tier 1. The queued order is left in place and resumes once threat drops.
fn respond_to_threat(ctx: &DecisionContext<'_>, index: UnitIndex, unit: &Unit, panicked: bool) -> Vec<Message> {
    if let Some(plan) = unit.current_action.as_ref().filter(|p| is_autonomous(p, OrderType::Hide)) {
        let settled = if panicked {
            unit.behavior == Behavior::Panicked
        } else {
            matches!(unit.behavior, Behavior::Hide(_))
        };
        if settled {
            if unit.gesture.is_committed() {
                return Vec::new();
            }
            return step_plan(ctx, index, unit, plan);
        }
    }

    let order = Order::hide(ctx.current_tick()).autonomous();
    let plan = translate(index, &order, &ctx.world).ok();
    let behavior = match (&plan, panicked) {
        (_, true) => Behavior::Panicked,
        (Some(plan), false) => plan.behavior.clone(),
        (None, false) => Behavior::Hide(match unit.perception.threat_source {
            Some(source) => Facing::away_from(unit.position, source),
            None => unit.facing,
        }),
    };
    if !is_legal_transition(unit.behavior.kind(), behavior.kind()) {
        return Vec::new();
    }

    let mut out = vec![Message::Transition {
        unit: index,
        behavior,
        cause: TransitionCause::Override,
    }];
    match plan {
        Some(plan) => {
            let active = ActivePlan::new(plan, order, PlanOrigin::Autonomous);
            let steps = if unit.gesture.is_committed() {
                Vec::new()
            } else {
                step_plan(ctx, index, unit, &active)
            };
            out.push(Message::SetPlan { unit: index, plan: Some(active) });
            out.extend(steps);
        }
        None => out.push(Message::SetPlan { unit: index, plan: None }),
    }
    out
}

/// Tier 2. Returns `None` when engagement is not possible or not allowed.
fn auto_engage(ctx: &DecisionContext<'_>, index: UnitIndex, unit: &Unit) -> Option<Vec<Message>> {
    let weapon = unit.weapon.as_ref()?;
    if !unit.has(Capability::CanFire) || !(unit.has(Capability::WeaponLoaded) || unit.ammo.can_reload()) {
        return None;
    }
    if let Some(head) = unit.orders.front() {
        if head.priority >= OrderPriority::High || head.order_type.is_hostile() {
            return None;
        }
    }

    if let Some(plan) = unit.current_action.as_ref().filter(|p| is_autonomous(p, OrderType::Engage)) {
        if plan.target_unit().is_some_and(|t| ctx.can_engage(unit, weapon, t)) {
            return Some(step_plan(ctx, index, unit, plan));
        }
    }

    let target = ctx.nearest_target(unit, weapon)?;
    let order = Order::engage(ctx.unit(target)?.id, ctx.current_tick()).autonomous();
    let plan = translate(index, &order, &ctx.world).ok()?;
    if !is_legal_transition(unit.behavior.kind(), plan.behavior.kind()) {
        return None;
    }

    let active = ActivePlan::new(plan, order, PlanOrigin::Autonomous);
    let steps = step_plan(ctx, index, unit, &active);
    let mut out = vec![
        Message::Transition {
            unit: index,
            behavior: active.behavior.clone(),
            cause: TransitionCause::Override,
        },
        Message::SetPlan { unit: index, plan: Some(active) },
    ];
    out.extend(steps);
    Some(out)
}

/// Tier 3
fn follow_order(ctx: &DecisionContext<'_>, index: UnitIndex, unit: &Unit, order: &Order) -> Vec<Message> {
    if order.order_type.is_standing() && unit.orders.len() > 1 {
        return vec![Message::CompleteOrder { unit: index }];
    }
    if let Some(plan) = unit.current_action.as_ref().filter(|p| p.origin == PlanOrigin::Order) {
        return step_plan(ctx, index, unit, plan);
    }

    match translate(index, order, &ctx.world) {
        Ok(plan) => {
            if !is_legal_transition(unit.behavior.kind(), plan.behavior.kind()) {
                return Vec::new();
            }
            let active = ActivePlan::new(plan, order.clone(), PlanOrigin::Order);
            let steps = step_plan(ctx, index, unit, &active);
            let mut out = vec![
                Message::Transition {
                    unit: index,
                    behavior: active.behavior.clone(),
                    cause: TransitionCause::Order,
                },
                Message::SetPlan { unit: index, plan: Some(active) },
            ];
            out.extend(steps);
            out
        }
        Err(reason) => vec![Message::RejectOrder { unit: index, reason }],
    }
}

/// Tier 4
fn idle(index: UnitIndex, unit: &Unit) -> Vec<Message> {
    let mut out = Vec::new();
    if unit.current_action.is_some() {
        out.push(Message::SetPlan { unit: index, plan: None });
    }
    let idle = Behavior::Idle(unit.posture());
    if unit.behavior != idle {
        out.push(Message::Transition {
            unit: index,
            behavior: idle,
            cause: TransitionCause::Idle,
        });
    }
    out
}

/// The plan ran to completion
fn finish(index: UnitIndex, plan: &ActivePlan) -> Message {
    match plan.origin {
        PlanOrigin::Order => Message::CompleteOrder { unit: index },
        PlanOrigin::Autonomous => Message::SetPlan { unit: index, plan: None },
    }
}

/// The plan cannot be carried out
fn abandon(index: UnitIndex, plan: &ActivePlan, reason: Rejection) -> Message {
    match plan.origin {
        PlanOrigin::Order => Message::RejectOrder { unit: index, reason },
        PlanOrigin::Autonomous => Message::SetPlan { unit: index, plan: None },
    }
}

/// Translate the plan's order again from the unit's current state
fn replan(ctx: &DecisionContext<'_>, index: UnitIndex, unit: &Unit, plan: &ActivePlan) -> Vec<Message> {
    tracing::trace!("Unit {:?} replanning {:?}", unit.id, plan.order_type());
    match translate(index, &plan.order, &ctx.world) {
        Ok(fresh) => {
            let mut out = Vec::new();
            if fresh.behavior != unit.behavior && is_legal_transition(unit.behavior.kind(), fresh.behavior.kind()) {
                let cause = match plan.origin {
                    PlanOrigin::Order => TransitionCause::Order,
                    PlanOrigin::Autonomous => TransitionCause::Override,
                };
                out.push(Message::Transition {
                    unit: index,
                    behavior: fresh.behavior.clone(),
                    cause,
                });
            }
            out.push(Message::SetPlan {
                unit: index,
                plan: Some(ActivePlan::new(fresh, plan.order.clone(), plan.origin)),
            });
            out
        }
        Err(reason) => vec![abandon(index, plan, reason)],
    }
}

fn face(index: UnitIndex, unit: &Unit, toward: Vec2) -> Option<Message> {
    let facing = Facing::toward(unit.position, toward);
    (facing != unit.facing && facing != Facing::default()).then_some(Message::Face { unit: index, facing })
}

/// Walk along `waypoints` from `start` with a per-tick budget of `speed`
/// scaled by the ground under the unit.
///
/// Returns the new position, the next waypoint index and whether the path
/// is finished.
pub fn advance_along(
    terrain: &dyn Terrain,
    from: Vec2,
    waypoints: &[Vec2],
    start: usize,
    speed: f32,
) -> (Vec2, usize, bool) {
    let cost = terrain.movement_cost(from).unwrap_or(1.0);
    let mut budget = speed / cost;
    let mut position = from;
    let mut next = start;

    while next < waypoints.len() && budget > 0.0 {
        let (reached_point, reached) = position.step_toward(&waypoints[next], budget);
        budget -= position.distance(&reached_point);
        position = reached_point;
        if !reached {
            break;
        }
        next += 1;
    }
    (position, next, next >= waypoints.len())
}

/// Drive the front of `plan` forward by one tick.
///
/// Satisfied steps are advanced in the same tick; the first step that needs
/// time (a gesture, a move, a standing hold) ends the walk.
pub fn step_plan(ctx: &DecisionContext<'_>, index: UnitIndex, unit: &Unit, plan: &ActivePlan) -> Vec<Message> {
    let tick = ctx.current_tick();
    let mut out = Vec::new();
    let mut caps = unit.capabilities;
    let mut started = plan.started;
    let mut waypoint = plan.waypoint;
    let mut position = unit.position;

    for step in plan.steps.iter() {
        let Some(def) = ctx.world.actions.get(step.action) else {
            out.push(abandon(index, plan, Rejection::Malformed("action id")));
            return out;
        };
        let requires = requirements_for(unit, def.requires);

        match step.kind {
            ActionKind::ChangePosture(posture) => {
                if caps.has(posture.capability()) {
                    out.push(Message::AdvancePlan { unit: index });
                    started = false;
                    waypoint = 0;
                    continue;
                }
                if !caps.contains_all(requires) {
                    out.extend(replan(ctx, index, unit, plan));
                    return out;
                }
                out.push(Message::StartGesture {
                    unit: index,
                    gesture: Gesture::ChangingPosture {
                        from: unit.posture(),
                        to: posture,
                        end_tick: tick + def.duration_ticks.max(1),
                    },
                });
                return out;
            }

            ActionKind::Walk | ActionKind::Run | ActionKind::Sneak => {
                if !caps.contains_all(requires) {
                    out.extend(replan(ctx, index, unit, plan));
                    return out;
                }
                let ActionTarget::Path(path) = &step.target else {
                    out.push(abandon(index, plan, Rejection::Malformed("path")));
                    return out;
                };
                if !started {
                    out.push(Message::StartStep { unit: index, action: step.action });
                    caps = def.effect_on(caps);
                }
                let speed = ctx.movement_speed(unit, step.kind);
                let (to, next, arrived) = advance_along(ctx.world.terrain, position, &path.waypoints, waypoint, speed);
                let facing = if to == position {
                    unit.facing
                } else {
                    Facing::toward(position, to)
                };
                out.push(Message::Move {
                    unit: index,
                    to,
                    waypoint: next,
                    facing,
                });
                position = to;
                if !arrived {
                    return out;
                }
                out.push(Message::AdvancePlan { unit: index });
                started = false;
                waypoint = 0;
            }

            ActionKind::Reload => {
                if caps.has(Capability::WeaponLoaded) {
                    out.push(Message::AdvancePlan { unit: index });
                    started = false;
                    waypoint = 0;
                    continue;
                }
                if !unit.ammo.can_reload() {
                    out.push(abandon(index, plan, Rejection::OutOfAmmo));
                    return out;
                }
                if !caps.contains_all(requires) {
                    out.extend(replan(ctx, index, unit, plan));
                    return out;
                }
                let ticks = unit.weapon.as_ref().map_or(def.duration_ticks, |w| w.reload_ticks);
                out.push(Message::StartGesture {
                    unit: index,
                    gesture: Gesture::Reloading { end_tick: tick + ticks.max(1) },
                });
                return out;
            }

            ActionKind::Fire => {
                let Some(weapon) = unit.weapon.as_ref() else {
                    out.push(abandon(index, plan, Rejection::Unarmed));
                    return out;
                };
                let target = match &step.target {
                    ActionTarget::Unit(target) => {
                        let target = *target;
                        let Some(enemy) = ctx.unit(target).filter(|e| e.is_alive() && !e.is_mounted()) else {
                            out.push(finish(index, plan));
                            return out;
                        };
                        if !unit.perception.sees(target) {
                            // Hold on while the last-known position is remembered
                            match unit.perception.memory.get(enemy.id) {
                                Some(last) => out.extend(face(index, unit, last.position)),
                                None => out.push(finish(index, plan)),
                            }
                            return out;
                        }
                        if position.distance_sq(&enemy.position) > weapon.range * weapon.range {
                            out.extend(face(index, unit, enemy.position));
                            return out;
                        }
                        if !caps.contains_all(requires) {
                            out.extend(replan(ctx, index, unit, plan));
                            return out;
                        }
                        out.extend(face(index, unit, enemy.position));
                        FireTarget::Unit(target)
                    }
                    ActionTarget::Position(point) => {
                        if !caps.has(Capability::WeaponLoaded) {
                            out.push(finish(index, plan));
                            return out;
                        }
                        if !caps.contains_all(requires) {
                            out.extend(replan(ctx, index, unit, plan));
                            return out;
                        }
                        out.extend(face(index, unit, *point));
                        FireTarget::Position(*point)
                    }
                    _ => {
                        out.push(abandon(index, plan, Rejection::Malformed("fire target")));
                        return out;
                    }
                };
                out.push(Message::StartGesture {
                    unit: index,
                    gesture: Gesture::Aiming {
                        end_tick: tick + weapon.aim_ticks.max(1),
                        target,
                    },
                });
                return out;
            }

            ActionKind::Hold => {
                if !started {
                    out.push(Message::StartStep { unit: index, action: step.action });
                    if let Behavior::Defend(facing) | Behavior::Hide(facing) = plan.behavior {
                        if facing != Facing::default() && facing != unit.facing {
                            out.push(Message::Face { unit: index, facing });
                        }
                    }
                }
                return out;
            }

            ActionKind::TakeCover => {
                if !caps.contains_all(requires) {
                    out.extend(replan(ctx, index, unit, plan));
                    return out;
                }
                if !started || !caps.contains_all(def.adds) {
                    out.push(Message::StartStep { unit: index, action: step.action });
                    if let Behavior::Hide(facing) = plan.behavior {
                        if facing != Facing::default() && facing != unit.facing {
                            out.push(Message::Face { unit: index, facing });
                        }
                    }
                }
                return out;
            }
        }
    }

    out.push(finish(index, plan));
    out
}
