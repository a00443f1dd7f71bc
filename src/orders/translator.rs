//! Order-to-behavior translation with automatic prerequisite chaining
//!
//! `missing = required & !capabilities`. While anything is missing, the
//! lowest missing bit is looked up in the action table (each capability has
//! exactly one granter), that action's own prerequisites are satisfied
//! first, and its effect is applied to a hypothetical capability snapshot.
//! A prone unit ordered to run becomes `[StandUp, Run]`.

use crate::core::config::SimulationConfig;
use crate::core::error::Rejection;
use crate::core::types::{Facing, Tick, UnitIndex, Vec2};
use crate::content::UnitKind;
use crate::orders::actions::{ActionId, ActionKind, ActionTable, ActionTarget, PrimitiveAction};
use crate::orders::order::{Order, OrderType};
use crate::orders::plan::Plan;
use crate::terrain::{find_path, Terrain};
use crate::unit::capability::{Capability, CapabilitySet};
use crate::unit::model::Unit;
use crate::unit::state::{Behavior, Path, Phase, Posture};
use crate::unit::table::UnitTable;

/// Longest prerequisite chain before requirements are declared conflicting
const MAX_CHAIN: usize = 64;

/// Read-only view the translator works against
#[derive(Clone, Copy)]
pub struct WorldSnapshot<'a> {
    pub tick: Tick,
    pub phase: Phase,
    pub units: &'a UnitTable,
    pub terrain: &'a dyn Terrain,
    pub actions: &'a ActionTable,
    pub config: &'a SimulationConfig,
}

fn posture_bits() -> CapabilitySet {
    [Capability::IsStanding, Capability::IsCrouched, Capability::IsProne]
        .into_iter()
        .collect()
}

/// Requirements of an action as they apply to `unit`. Vehicles have no
/// posture, so posture bits are dropped.
pub fn requirements_for(unit: &Unit, requires: CapabilitySet) -> CapabilitySet {
    if unit.kind == UnitKind::Vehicle {
        requires.difference(posture_bits())
    } else {
        requires
    }
}

/// Actions that must run, in order, for `caps` to cover `required`.
///
/// Returns the chain and the capability snapshot after it has executed.
pub fn chain_prerequisites(
    table: &ActionTable,
    caps: CapabilitySet,
    required: CapabilitySet,
) -> Result<(Vec<ActionId>, CapabilitySet), Rejection> {
    let mut chain = Vec::new();
    let after = satisfy(table, caps, required, 0, &mut chain)?;
    Ok((chain, after))
}

fn satisfy(
    table: &ActionTable,
    mut hypothetical: CapabilitySet,
    required: CapabilitySet,
    depth: usize,
    chain: &mut Vec<ActionId>,
) -> Result<CapabilitySet, Rejection> {
    if depth > MAX_CHAIN {
        return Err(Rejection::ConflictingRequirements);
    }
    loop {
        let missing = required.difference(hypothetical);
        let Some(bit) = missing.lowest_bit() else {
            return Ok(hypothetical);
        };
        if chain.len() >= MAX_CHAIN {
            return Err(Rejection::ConflictingRequirements);
        }

        let granter = table.granter_of(bit).ok_or(match Capability::from_bit(bit) {
            Some(capability) => Rejection::MissingCapability(capability),
            None => Rejection::ConflictingRequirements,
        })?;
        let def = table.get(granter).ok_or(Rejection::ConflictingRequirements)?;

        hypothetical = satisfy(table, hypothetical, def.requires, depth + 1, chain)?;
        chain.push(granter);
        hypothetical = def.effect_on(hypothetical);
    }
}

fn check_phase(order: &Order, phase: Phase) -> Result<(), Rejection> {
    let forbidden = phase.is_terminal() || (phase == Phase::Deployment && order.order_type.is_hostile());
    if forbidden {
        Err(Rejection::ForbiddenInPhase { order: order.order_type, phase })
    } else {
        Ok(())
    }
}

/// Destination after the formation modifier, falling back to the ordered
/// point when the slot would land on impassable ground
fn formation_destination(unit: &Unit, order: &Order, dest: Vec2, world: &WorldSnapshot<'_>) -> Vec2 {
    let (Some(formation), Some(link)) = (order.formation, unit.squad) else {
        return dest;
    };
    let leader_pos = world.units.get(link.leader).map(|l| l.position).unwrap_or(unit.position);
    let offset = formation.slot_offset(link.slot, world.config.formation_spacing, dest - leader_pos);
    let slotted = dest + offset;
    if world.terrain.is_passable(slotted) {
        slotted
    } else {
        dest
    }
}

/// The order's own action and the behavior it puts the unit in
fn terminal_action(
    index: UnitIndex,
    unit: &Unit,
    order: &Order,
    world: &WorldSnapshot<'_>,
) -> Result<(ActionKind, ActionTarget, Behavior), Rejection> {
    let vehicle = unit.kind == UnitKind::Vehicle;

    match order.order_type {
        OrderType::Move | OrderType::MoveFast | OrderType::Sneak => {
            let dest = order.target_position.ok_or(Rejection::Malformed("target position"))?;
            let dest = formation_destination(unit, order, dest, world);
            let waypoints = find_path(world.terrain, unit.position, dest).ok_or(Rejection::NoPath)?;
            let path = Path::new(waypoints);
            let kind = match order.order_type {
                OrderType::MoveFast => ActionKind::Run,
                OrderType::Sneak => ActionKind::Sneak,
                _ => ActionKind::Walk,
            };
            Ok((kind, ActionTarget::Path(path.clone()), Behavior::MoveTo(path)))
        }
        OrderType::Defend => {
            let facing = order.facing.unwrap_or(unit.facing);
            Ok((ActionKind::Hold, ActionTarget::None, Behavior::Defend(facing)))
        }
        OrderType::Stop => Ok((ActionKind::Hold, ActionTarget::None, Behavior::Idle(unit.posture()))),
        OrderType::Hide => {
            let facing = order.facing.unwrap_or_else(|| match unit.perception.threat_source {
                Some(source) => Facing::away_from(unit.position, source),
                None => unit.facing,
            });
            let kind = if vehicle { ActionKind::Hold } else { ActionKind::TakeCover };
            Ok((kind, ActionTarget::None, Behavior::Hide(facing)))
        }
        OrderType::Engage => {
            let weapon = unit.weapon.as_ref().ok_or(Rejection::Unarmed)?;
            let target_id = order.target_unit.ok_or(Rejection::Malformed("target unit"))?;
            let target_index = world.units.resolve(target_id).ok_or(Rejection::UnknownUnit(target_id))?;
            let target = world.units.get(target_index).ok_or(Rejection::UnknownUnit(target_id))?;
            if target_index == index || target.side == unit.side || !target.is_alive() || target.is_mounted() {
                return Err(Rejection::InvalidTarget);
            }
            let distance = unit.position.distance(&target.position);
            if distance > weapon.range {
                return Err(Rejection::TargetOutOfRange { distance, range: weapon.range });
            }
            Ok((
                ActionKind::Fire,
                ActionTarget::Unit(target_index),
                Behavior::EngageTarget(target_index),
            ))
        }
        OrderType::FireAtPosition => {
            let weapon = unit.weapon.as_ref().ok_or(Rejection::Unarmed)?;
            let position = order.target_position.ok_or(Rejection::Malformed("target position"))?;
            let distance = unit.position.distance(&position);
            if distance > weapon.range {
                return Err(Rejection::TargetOutOfRange { distance, range: weapon.range });
            }
            Ok((
                ActionKind::Fire,
                ActionTarget::Position(position),
                Behavior::Defend(Facing::toward(unit.position, position)),
            ))
        }
    }
}

/// Translate an order for the unit at `index` into primitive actions.
pub fn translate(index: UnitIndex, order: &Order, world: &WorldSnapshot<'_>) -> Result<Plan, Rejection> {
    let unit = world.units.get(index).ok_or(Rejection::Malformed("unit index"))?;
    if !unit.is_alive() {
        return Err(Rejection::UnitDead);
    }
    check_phase(order, world.phase)?;
    if unit.is_mounted() {
        return Err(Rejection::Mounted);
    }
    let vehicle = unit.kind == UnitKind::Vehicle;
    if vehicle && order.posture.is_some() {
        return Err(Rejection::Malformed("posture modifier for a vehicle"));
    }

    let (kind, target, mut behavior) = terminal_action(index, unit, order, world)?;
    let terminal = world
        .actions
        .find_kind(kind)
        .ok_or(Rejection::Malformed("action kind missing from table"))?;
    let terminal_def = world.actions.get(terminal).ok_or(Rejection::Malformed("action id"))?;

    let mut required = terminal_def.requires;
    if let Some(posture) = order.posture {
        required = required.with(posture.capability());
    }
    let required = requirements_for(unit, required);

    let (chain, after) = chain_prerequisites(world.actions, unit.capabilities, required)?;

    if behavior == Behavior::Idle(unit.posture()) {
        behavior = Behavior::Idle(Posture::from_capabilities(after));
    }

    let mut actions: Vec<PrimitiveAction> = chain
        .into_iter()
        .filter_map(|id| {
            world.actions.get(id).map(|def| PrimitiveAction {
                action: id,
                kind: def.kind,
                target: ActionTarget::None,
            })
        })
        .collect();
    actions.push(PrimitiveAction { action: terminal, kind, target });

    Ok(Plan {
        order_type: order.order_type,
        actions,
        behavior,
    })
}
