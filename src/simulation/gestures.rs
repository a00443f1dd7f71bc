//! Gesture completion: posture changes, reloads, shots and hits
//!
//! Gestures are resolved after messages, in unit-index order. A hit roll is
//! the only place the generator is drawn from during a tick.

use rand::Rng;
use tracing::{debug, trace};

use crate::core::types::{Tick, UnitId, UnitIndex};
use crate::orders::actions::ActionKind;
use crate::perception::ThreatEvent;
use crate::sight::{can_see, cover_against, SightParams};
use crate::simulation::events::SimEventKind;
use crate::simulation::scheduler::Simulation;
use crate::unit::capability::{Capability, CapabilitySet, Condition};
use crate::unit::state::{Behavior, FireTarget, Gesture, Posture};

impl Simulation {
    pub(crate) fn advance_gestures(&mut self, tick: Tick) {
        for i in 0..self.units.len() {
            let index = UnitIndex(i);
            let Some(unit) = self.units.get(index) else {
                continue;
            };
            if !unit.is_alive() {
                continue;
            }
            match unit.gesture {
                Gesture::Idle => {}
                Gesture::ChangingPosture { to, end_tick, .. } if end_tick <= tick => {
                    self.finish_posture_change(index, to, tick);
                }
                Gesture::Reloading { end_tick } if end_tick <= tick => self.finish_reload(index, tick),
                Gesture::Aiming { end_tick, target } if end_tick <= tick => self.discharge(index, target, tick),
                Gesture::Firing { end_tick, target } if end_tick <= tick => self.resolve_shot(index, target, tick),
                _ => {}
            }
        }
    }

    fn finish_posture_change(&mut self, index: UnitIndex, to: Posture, tick: Tick) {
        let def = self
            .content
            .actions
            .posture_action(to)
            .and_then(|id| self.content.actions.get(id));
        let Some(unit) = self.units.get_mut(index) else {
            return;
        };
        if let Some(def) = def {
            unit.capabilities = def.effect_on(unit.capabilities);
        }
        unit.set_gesture(Gesture::Idle, tick, &mut self.events);
    }

    fn finish_reload(&mut self, index: UnitIndex, tick: Tick) {
        let Some(unit) = self.units.get_mut(index) else {
            return;
        };
        unit.ammo.refill();
        if unit.ammo.loaded > 0 {
            unit.grant(CapabilitySet::EMPTY.with(Capability::WeaponLoaded));
        }
        unit.set_gesture(Gesture::Idle, tick, &mut self.events);
    }

    /// Aiming -> Firing. The round is spent here, hit or miss.
    fn discharge(&mut self, index: UnitIndex, target: FireTarget, tick: Tick) {
        let fire_effect = self
            .content
            .actions
            .find_kind(ActionKind::Fire)
            .and_then(|id| self.content.actions.get(id))
            .map(|def| def.removes);
        let impact = match target {
            FireTarget::Unit(t) => self.units.get(t).map(|u| u.position),
            FireTarget::Position(p) => Some(p),
        };
        let Some(unit) = self.units.get_mut(index) else {
            return;
        };

        let engaged = matches!(unit.behavior, Behavior::EngageTarget(_) | Behavior::Defend(_));
        let armed = engaged && unit.has(Capability::WeaponLoaded);
        let Some((fire_ticks, loudness)) = unit
            .weapon
            .as_ref()
            .filter(|_| armed)
            .map(|w| (w.fire_ticks.max(1), w.discharge_threat))
        else {
            unit.set_gesture(Gesture::Idle, tick, &mut self.events);
            return;
        };

        unit.ammo.consume_round();
        if unit.ammo.loaded == 0 {
            unit.revoke(CapabilitySet::EMPTY.with(Capability::WeaponLoaded));
        }
        if let Some(removes) = fire_effect {
            unit.revoke(removes);
        }
        unit.set_gesture(
            Gesture::Firing {
                end_tick: tick + fire_ticks,
                target,
            },
            tick,
            &mut self.events,
        );

        let position = unit.position;
        let side = Some(unit.side);
        self.events.push(tick, SimEventKind::WeaponDischarged { unit: unit.id, position });
        self.threat_events.push(ThreatEvent::new(position, loudness, side));
        if let Some(impact) = impact {
            self.threat_events.push(ThreatEvent::new(impact, loudness, side));
        }
    }

    /// Firing -> Idle, rolling the hit against a unit target
    fn resolve_shot(&mut self, index: UnitIndex, target: FireTarget, tick: Tick) {
        if let FireTarget::Unit(target) = target {
            if let Some((damage, source)) = self.roll_hit(index, target) {
                self.damage_unit(target, damage, Some(source), tick);
            }
        }
        if let Some(unit) = self.units.get_mut(index) {
            unit.set_gesture(Gesture::Idle, tick, &mut self.events);
        }
    }

    fn roll_hit(&mut self, shooter: UnitIndex, target: UnitIndex) -> Option<(u32, UnitId)> {
        let unit = self.units.get(shooter)?;
        let enemy = self.units.get(target).filter(|e| e.is_alive() && !e.is_mounted())?;
        let weapon = unit.weapon.as_ref()?;

        let distance = unit.position.distance(&enemy.position);
        if distance > weapon.range {
            return None;
        }
        if !can_see(&self.terrain, unit.position, enemy.position, &SightParams::from_config(&self.config)) {
            return None;
        }

        let cover = cover_against(&self.terrain, enemy.position, enemy.posture(), unit.position);
        let falloff = 1.0 - self.config.range_falloff * distance / weapon.range.max(f32::EPSILON);
        let mut chance = weapon.accuracy * (1.0 - cover) * falloff;
        if unit.has_condition(Condition::IsSuppressed) {
            chance *= 0.5;
        }
        let damage = weapon.damage;
        let source = unit.id;

        let roll: f32 = self.rng.gen();
        trace!("Shot {:?} -> {:?}: chance {:.3}, roll {:.3}", source, enemy.id, chance, roll);
        (roll < chance).then_some((damage, source))
    }

    /// Subtract health; at zero the unit dies and any occupants climb out
    pub(crate) fn damage_unit(&mut self, index: UnitIndex, amount: u32, source: Option<UnitId>, tick: Tick) {
        if amount == 0 {
            return;
        }
        let Some(unit) = self.units.get_mut(index) else {
            return;
        };
        if !unit.is_alive() {
            return;
        }
        let dealt = unit.health.damage(amount);
        let remaining = unit.health.current;
        self.events.push(
            tick,
            SimEventKind::DamageApplied {
                unit: unit.id,
                amount: dealt,
                remaining,
                source,
            },
        );
        if remaining > 0 {
            return;
        }

        debug!("Unit {:?} destroyed at tick {}", unit.id, tick);
        unit.kill(tick, &mut self.events);
        let occupants = unit.crew.as_ref().map(|c| c.occupants.clone()).unwrap_or_default();
        for occupant in occupants {
            self.dismount(occupant, index, tick);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::content::Content;
    use crate::core::config::SimulationConfig;
    use crate::core::types::{Side, UnitIndex, Vec2};
    use crate::simulation::scheduler::Simulation;
    use crate::terrain::TerrainGrid;
    use crate::unit::capability::Capability;
    use crate::unit::state::{Behavior, FireTarget, Gesture, Posture};

    fn sim() -> Simulation {
        Simulation::new(
            SimulationConfig::default(),
            Content::standard().unwrap(),
            TerrainGrid::open(32, 32, 1.0),
            11,
        )
        .unwrap()
    }

    #[test]
    fn test_reload_refills_and_grants_loaded() {
        let mut sim = sim();
        let id = sim.spawn("rifleman", Side(0), Vec2::new(2.5, 2.5), Posture::Standing).unwrap();
        let unit = sim.unit_mut(id).unwrap();
        unit.ammo.loaded = 0;
        unit.capabilities = unit.capabilities.without(Capability::WeaponLoaded);
        unit.gesture = Gesture::Reloading { end_tick: 0 };

        sim.advance_gestures(0);

        let unit = sim.unit(id).unwrap();
        assert_eq!(unit.ammo.loaded, unit.ammo.magazine);
        assert!(unit.has(Capability::WeaponLoaded));
        assert!(unit.gesture.is_idle());
    }

    #[test]
    fn test_aim_without_engagement_fires_nothing() {
        let mut sim = sim();
        let id = sim.spawn("rifleman", Side(0), Vec2::new(2.5, 2.5), Posture::Standing).unwrap();
        let loaded = sim.unit(id).unwrap().ammo.loaded;
        sim.unit_mut(id).unwrap().gesture = Gesture::Aiming {
            end_tick: 0,
            target: FireTarget::Position(Vec2::new(9.5, 2.5)),
        };

        sim.advance_gestures(0);

        let unit = sim.unit(id).unwrap();
        assert_eq!(unit.ammo.loaded, loaded);
        assert!(unit.gesture.is_idle());
    }

    #[test]
    fn test_discharge_spends_round_and_makes_noise() {
        let mut sim = sim();
        let id = sim.spawn("rifleman", Side(0), Vec2::new(2.5, 2.5), Posture::Standing).unwrap();
        let loaded = sim.unit(id).unwrap().ammo.loaded;
        let unit = sim.unit_mut(id).unwrap();
        unit.behavior = Behavior::Defend(Default::default());
        unit.gesture = Gesture::Aiming {
            end_tick: 0,
            target: FireTarget::Position(Vec2::new(9.5, 2.5)),
        };

        sim.advance_gestures(0);

        let unit = sim.unit(id).unwrap();
        assert_eq!(unit.ammo.loaded, loaded - 1);
        assert!(matches!(unit.gesture, Gesture::Firing { .. }));
        assert_eq!(sim.threat_events.len(), 2);
    }

    #[test]
    fn test_lethal_damage_kills() {
        let mut sim = sim();
        let id = sim.spawn("rifleman", Side(0), Vec2::new(2.5, 2.5), Posture::Standing).unwrap();
        sim.damage_unit(UnitIndex(0), 10_000, None, 0);
        let unit = sim.unit(id).unwrap();
        assert!(!unit.is_alive());
        assert_eq!(unit.health.current, 0);
        assert!(unit.capabilities.is_empty());
    }
}
