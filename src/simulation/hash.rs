//! Stable state hashing for lockstep desync detection
//!
//! Fields are written in a fixed order with explicit widths; floats are
//! hashed by bit pattern. xxh3 gives the same value on every platform.

use std::hash::Hasher;

use xxhash_rust::xxh3::Xxh3;

use crate::core::types::{Facing, Tick, Vec2};
use crate::unit::state::{Behavior, FireTarget, Gesture, Phase};
use crate::unit::table::UnitTable;

fn write_vec2(hasher: &mut Xxh3, v: Vec2) {
    hasher.write_u32(v.x.to_bits());
    hasher.write_u32(v.y.to_bits());
}

fn write_facing(hasher: &mut Xxh3, facing: Facing) {
    write_vec2(hasher, facing.0);
}

fn write_phase(hasher: &mut Xxh3, phase: Phase) {
    match phase {
        Phase::Deployment => hasher.write_u8(0),
        Phase::Battle => hasher.write_u8(1),
        Phase::Victory(side) => {
            hasher.write_u8(2);
            hasher.write_u8(side.0);
        }
        Phase::Defeat(side) => {
            hasher.write_u8(3);
            hasher.write_u8(side.0);
        }
    }
}

fn write_behavior(hasher: &mut Xxh3, behavior: &Behavior) {
    hasher.write_u8(behavior.kind() as u8);
    match behavior {
        Behavior::Idle(posture) => hasher.write_u8(*posture as u8),
        Behavior::MoveTo(path) => {
            hasher.write_u64(path.waypoints.len() as u64);
            if let Some(dest) = path.destination() {
                write_vec2(hasher, dest);
            }
        }
        Behavior::Defend(facing) | Behavior::Hide(facing) => write_facing(hasher, *facing),
        Behavior::EngageTarget(index) => hasher.write_u64(index.0 as u64),
        Behavior::Panicked | Behavior::Dead => {}
    }
}

fn write_target(hasher: &mut Xxh3, target: FireTarget) {
    match target {
        FireTarget::Unit(index) => {
            hasher.write_u8(0);
            hasher.write_u64(index.0 as u64);
        }
        FireTarget::Position(pos) => {
            hasher.write_u8(1);
            write_vec2(hasher, pos);
        }
    }
}

fn write_gesture(hasher: &mut Xxh3, gesture: &Gesture) {
    hasher.write_u8(gesture.kind() as u8);
    if let Some(end) = gesture.end_tick() {
        hasher.write_u64(end);
    }
    if let Some(target) = gesture.target() {
        write_target(hasher, target);
    }
    if let Gesture::ChangingPosture { from, to, .. } = gesture {
        hasher.write_u8(*from as u8);
        hasher.write_u8(*to as u8);
    }
}

/// Hash the authoritative state: tick, phase, generator position and, per
/// unit in index order, id, position, health, behavior, gesture and flags.
pub fn hash_state(tick: Tick, phase: Phase, rng_word_pos: u128, units: &UnitTable) -> u64 {
    let mut hasher = Xxh3::new();
    hasher.write_u64(tick);
    write_phase(&mut hasher, phase);
    hasher.write_u128(rng_word_pos);
    hasher.write_u64(units.len() as u64);

    for (_, unit) in units.iter() {
        hasher.write_u32(unit.id.0);
        write_vec2(&mut hasher, unit.position);
        hasher.write_u32(unit.health.current);
        hasher.write_u32(unit.health.max);
        write_behavior(&mut hasher, &unit.behavior);
        write_gesture(&mut hasher, &unit.gesture);
        hasher.write_u64(unit.capabilities.bits());
        hasher.write_u64(unit.conditions.bits());
        hasher.write_u32(unit.ammo.loaded);
        hasher.write_u32(unit.ammo.reserve);
        hasher.write_u64(unit.orders.len() as u64);
    }
    hasher.finish()
}
