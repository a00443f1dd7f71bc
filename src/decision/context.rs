//! The decision layer's read-only view of the simulation

use ordered_float::OrderedFloat;

use crate::content::WeaponTemplate;
use crate::core::config::SimulationConfig;
use crate::core::types::{Tick, UnitIndex};
use crate::orders::actions::ActionKind;
use crate::orders::translator::WorldSnapshot;
use crate::unit::capability::Condition;
use crate::unit::model::Unit;

/// Movement speed multiplier while suppressed
const SUPPRESSED_SPEED: f32 = 0.5;

/// How frightened a unit is, from its threat intensity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ThreatLevel {
    Calm,
    Danger,
    Panic,
}

/// Snapshot of the world shared by every unit's decision this tick
#[derive(Clone, Copy)]
pub struct DecisionContext<'a> {
    pub world: WorldSnapshot<'a>,
}

impl<'a> DecisionContext<'a> {
    pub fn new(world: WorldSnapshot<'a>) -> Self {
        Self { world }
    }

    pub fn current_tick(&self) -> Tick {
        self.world.tick
    }

    pub fn config(&self) -> &'a SimulationConfig {
        self.world.config
    }

    pub fn unit(&self, index: UnitIndex) -> Option<&'a Unit> {
        self.world.units.get(index)
    }

    pub fn threat_level(&self, unit: &Unit) -> ThreatLevel {
        let threat = unit.perception.threat;
        let config = self.config();
        if threat > config.panic_threshold {
            ThreatLevel::Panic
        } else if threat > config.danger_threshold {
            ThreatLevel::Danger
        } else {
            ThreatLevel::Calm
        }
    }

    /// Living enemies `unit` saw this tick, in index order
    pub fn visible_enemies(&self, unit: &Unit) -> Vec<(UnitIndex, &'a Unit)> {
        unit.perception
            .visible
            .iter()
            .filter_map(|&index| self.unit(index).map(|enemy| (index, enemy)))
            .filter(|(_, enemy)| enemy.is_alive() && !enemy.is_mounted() && enemy.side != unit.side)
            .collect()
    }

    /// Can `unit` shoot at `target` right now?
    pub fn can_engage(&self, unit: &Unit, weapon: &WeaponTemplate, target: UnitIndex) -> bool {
        if !unit.perception.sees(target) {
            return false;
        }
        self.unit(target).is_some_and(|enemy| {
            enemy.is_alive()
                && !enemy.is_mounted()
                && enemy.side != unit.side
                && unit.position.distance_sq(&enemy.position) <= weapon.range * weapon.range
        })
    }

    /// Nearest visible enemy inside weapon range. Equal distances go to the
    /// lower index.
    pub fn nearest_target(&self, unit: &Unit, weapon: &WeaponTemplate) -> Option<UnitIndex> {
        let range_sq = weapon.range * weapon.range;
        self.visible_enemies(unit)
            .into_iter()
            .map(|(index, enemy)| (index, unit.position.distance_sq(&enemy.position)))
            .filter(|&(_, d_sq)| d_sq <= range_sq)
            .min_by_key(|&(index, d_sq)| (OrderedFloat(d_sq), index))
            .map(|(index, _)| index)
    }

    /// World units per tick for a movement action
    pub fn movement_speed(&self, unit: &Unit, kind: ActionKind) -> f32 {
        let base = match kind {
            ActionKind::Run => unit.mobility.run,
            ActionKind::Sneak => unit.mobility.sneak,
            _ => unit.mobility.walk,
        };
        if unit.has_condition(Condition::IsSuppressed) {
            base * SUPPRESSED_SPEED
        } else {
            base
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Content;
    use crate::core::types::{Side, Vec2};
    use crate::terrain::TerrainGrid;
    use crate::unit::state::{Phase, Posture};
    use crate::unit::table::UnitTable;

    #[test]
    fn test_nearest_target_breaks_ties_by_index() {
        let content = Content::standard().unwrap();
        let rifleman = content.template("rifleman").unwrap();
        let config = SimulationConfig::default();
        let terrain = TerrainGrid::open(64, 64, 1.0);
        let mut units = UnitTable::new();
        let (_, me) = units.spawn(rifleman, Side(0), Vec2::new(20.0, 20.0), Posture::Standing);
        let (_, a) = units.spawn(rifleman, Side(1), Vec2::new(30.0, 20.0), Posture::Standing);
        let (_, b) = units.spawn(rifleman, Side(1), Vec2::new(10.0, 20.0), Posture::Standing);
        let (_, far) = units.spawn(rifleman, Side(1), Vec2::new(20.0, 5.0), Posture::Standing);
        units.get_mut(me).unwrap().perception.visible = vec![a, b, far];

        let ctx = DecisionContext::new(WorldSnapshot {
            tick: 0,
            phase: Phase::Battle,
            units: &units,
            terrain: &terrain,
            actions: &content.actions,
            config: &config,
        });
        let unit = ctx.unit(me).unwrap();
        let weapon = unit.weapon.as_ref().unwrap();

        assert_eq!(ctx.nearest_target(unit, weapon), Some(a));
        assert!(ctx.can_engage(unit, weapon, b));
        assert_eq!(ctx.threat_level(unit), ThreatLevel::Calm);
    }
}
