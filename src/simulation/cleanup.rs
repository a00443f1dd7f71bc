//! End-of-tick removal of corpses and despawned units
//!
//! Removal swap-removes from the unit table, so every index held anywhere
//! (behaviors, plans, gestures, perception, squads, crews) is rebound to
//! the relocated unit or dropped.

use tracing::{debug, warn};

use crate::core::types::{Tick, UnitIndex};
use crate::orders::plan::PlanOrigin;
use crate::simulation::events::SimEventKind;
use crate::simulation::scheduler::Simulation;
use crate::unit::capability::Condition;
use crate::unit::state::{Behavior, FireTarget, Gesture};
use crate::unit::table::Relocation;

impl Simulation {
    pub(crate) fn cleanup(&mut self, tick: Tick) {
        let linger = self.config.corpse_linger_ticks;
        for (index, unit) in self.units.iter() {
            if unit.died_at.is_some_and(|died| tick.saturating_sub(died) >= linger) {
                self.despawn.insert(index);
            }
        }

        // Highest first, so a later swap never moves a queued unit
        while let Some(index) = self.despawn.pop_last() {
            self.remove_unit(index, tick);
        }
    }

    fn remove_unit(&mut self, index: UnitIndex, tick: Tick) {
        let Some(unit) = self.units.get(index) else {
            return;
        };
        let occupants = unit.crew.as_ref().map(|c| c.occupants.clone()).unwrap_or_default();
        let vehicle = unit.mounted_in;
        for occupant in occupants {
            self.dismount(occupant, index, tick);
        }
        if let Some(crew) = vehicle.and_then(|v| self.units.get_mut(v)).and_then(|v| v.crew.as_mut()) {
            crew.occupants.retain(|&o| o != index);
        }

        let Some(removal) = self.units.swap_remove(index) else {
            return;
        };
        if removal.unit.mounted_in.is_none() {
            self.spatial.remove(index, removal.unit.position);
        }
        if let Some(relocation) = removal.relocation {
            if let Some(moved) = self.units.get(relocation.to).filter(|u| !u.is_mounted()) {
                self.spatial.rename(relocation.from, relocation.to, moved.position);
            }
        }

        self.rebind_references(index, removal.relocation, removal.unit.id, tick);
        debug!("Removed unit {:?} from index {}", removal.unit.id, index.get());
        self.events.push(tick, SimEventKind::UnitRemoved { unit: removal.unit.id });
    }

    fn rebind_references(
        &mut self,
        removed: UnitIndex,
        relocation: Option<Relocation>,
        removed_id: crate::core::types::UnitId,
        tick: Tick,
    ) {
        let remap = move |held: UnitIndex| Relocation::rebind(relocation, removed, held);

        for (_, unit) in self.units.iter_mut() {
            if let Behavior::EngageTarget(target) = unit.behavior {
                match remap(target) {
                    Some(to) => unit.behavior = Behavior::EngageTarget(to),
                    None => {
                        let idle = Behavior::Idle(unit.posture());
                        if let Err(err) = unit.transition(idle, tick, &mut self.events) {
                            debug!("Unit {:?} lost its target: {}", unit.id, err);
                        }
                    }
                }
            }

            if let Some(plan) = unit.current_action.as_mut() {
                if !plan.rebind(remap) {
                    let origin = plan.origin;
                    unit.current_action = None;
                    if origin == PlanOrigin::Order {
                        if let Some(order) = unit.orders.pop_front() {
                            warn!("Unit {:?}: {:?} target removed, order dropped", unit.id, order.order_type);
                            self.events.push(
                                tick,
                                SimEventKind::OrderCompleted {
                                    unit: unit.id,
                                    order: order.order_type,
                                },
                            );
                        }
                    }
                }
            }

            if let Some(FireTarget::Unit(target)) = unit.gesture.target() {
                match (remap(target), unit.gesture) {
                    (Some(to), Gesture::Aiming { end_tick, .. }) => {
                        unit.gesture = Gesture::Aiming { end_tick, target: FireTarget::Unit(to) };
                    }
                    (Some(to), Gesture::Firing { end_tick, .. }) => {
                        unit.gesture = Gesture::Firing { end_tick, target: FireTarget::Unit(to) };
                    }
                    (None, _) => unit.set_gesture(Gesture::Idle, tick, &mut self.events),
                    _ => {}
                }
            }

            let perception = &mut unit.perception;
            perception.visible = perception.visible.iter().filter_map(|&v| remap(v)).collect();
            perception.visible.sort();
            perception.memory.forget(removed_id);

            if let Some(link) = unit.squad.as_mut() {
                match remap(link.leader) {
                    Some(leader) => link.leader = leader,
                    None => unit.squad = None,
                }
            }

            if let Some(crew) = unit.crew.as_mut() {
                crew.occupants = crew.occupants.iter().filter_map(|&o| remap(o)).collect();
            }
            if let Some(vehicle) = unit.mounted_in {
                unit.mounted_in = remap(vehicle);
                if unit.mounted_in.is_none() {
                    unit.conditions.set(Condition::Mounted, false);
                }
            }
        }
    }
}
