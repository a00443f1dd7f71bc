//! Structural checks run after every tick in debug builds

use std::fmt;

use crate::core::types::UnitId;
use crate::simulation::scheduler::Simulation;
use crate::terrain::Terrain;
use crate::unit::model::Unit;
use crate::unit::state::{Behavior, FireTarget};

#[derive(Debug, Clone, PartialEq)]
pub struct InvariantViolation {
    pub unit: Option<UnitId>,
    pub detail: String,
}

impl InvariantViolation {
    fn on(unit: &Unit, detail: impl Into<String>) -> Self {
        Self {
            unit: Some(unit.id),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unit {
            Some(id) => write!(f, "unit {:?}: {}", id, self.detail),
            None => write!(f, "{}", self.detail),
        }
    }
}

/// Every violation found, in unit-index order
pub fn check_invariants(sim: &Simulation) -> Vec<InvariantViolation> {
    let units = sim.units();
    let len = units.len();
    let tick = sim.current_tick();
    let mut violations = Vec::new();

    if sim.spatial().len() + mounted_count(sim) != len {
        violations.push(InvariantViolation {
            unit: None,
            detail: format!("spatial index holds {} entries for {} units", sim.spatial().len(), len),
        });
    }

    for (index, unit) in units.iter() {
        if unit.health.current > unit.health.max {
            violations.push(InvariantViolation::on(unit, "health above maximum"));
        }
        if !unit.is_alive() && (unit.health.current != 0 || !unit.capabilities.is_empty()) {
            violations.push(InvariantViolation::on(unit, "dead unit keeps health or capabilities"));
        }
        if unit.is_alive() && unit.health.current == 0 {
            violations.push(InvariantViolation::on(unit, "zero health but not dead"));
        }
        if !sim.terrain().is_passable(unit.position) {
            violations.push(InvariantViolation::on(unit, "standing on impassable terrain"));
        }
        if !unit.is_mounted() && !sim.spatial().contains(index, unit.position) {
            violations.push(InvariantViolation::on(unit, "missing from spatial index"));
        }
        if let Some(end) = unit.gesture.end_tick() {
            if end < tick {
                violations.push(InvariantViolation::on(unit, format!("gesture ended at {} but still active", end)));
            }
        }

        if let Behavior::EngageTarget(target) = unit.behavior {
            if target.get() >= len {
                violations.push(InvariantViolation::on(unit, "engage target out of range"));
            }
        }
        if let Some(FireTarget::Unit(target)) = unit.gesture.target() {
            if target.get() >= len {
                violations.push(InvariantViolation::on(unit, "gesture target out of range"));
            }
        }
        if unit.perception.visible.iter().any(|v| v.get() >= len) {
            violations.push(InvariantViolation::on(unit, "visible list holds a stale index"));
        }
        if let Some(link) = unit.squad {
            if link.leader.get() >= len {
                violations.push(InvariantViolation::on(unit, "squad leader out of range"));
            }
        }

        if let Some(vehicle) = unit.mounted_in {
            let carried = units
                .get(vehicle)
                .and_then(|v| v.crew.as_ref())
                .is_some_and(|c| c.occupants.contains(&index));
            if !carried {
                violations.push(InvariantViolation::on(unit, "mounted in a vehicle that does not carry it"));
            }
        }
        if let Some(crew) = &unit.crew {
            if crew.occupants.len() > crew.capacity as usize {
                violations.push(InvariantViolation::on(unit, "crew over capacity"));
            }
            for &occupant in &crew.occupants {
                if units.get(occupant).and_then(|o| o.mounted_in) != Some(index) {
                    violations.push(InvariantViolation::on(unit, "occupant not mounted in this vehicle"));
                }
            }
        }
    }
    violations
}

fn mounted_count(sim: &Simulation) -> usize {
    sim.units().iter().filter(|(_, u)| u.is_mounted()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Content;
    use crate::core::config::SimulationConfig;
    use crate::core::types::{Side, Vec2};
    use crate::terrain::TerrainGrid;
    use crate::unit::state::Posture;

    #[test]
    fn test_fresh_simulation_is_clean() {
        let mut sim = Simulation::new(
            SimulationConfig::default(),
            Content::standard().unwrap(),
            TerrainGrid::open(16, 16, 1.0),
            1,
        )
        .unwrap();
        sim.spawn("rifleman", Side(0), Vec2::new(1.5, 1.5), Posture::Standing).unwrap();
        sim.spawn("light_tank", Side(1), Vec2::new(8.5, 8.5), Posture::Standing).unwrap();
        assert!(check_invariants(&sim).is_empty());
    }

    #[test]
    fn test_overheal_is_reported() {
        let mut sim = Simulation::new(
            SimulationConfig::default(),
            Content::standard().unwrap(),
            TerrainGrid::open(16, 16, 1.0),
            1,
        )
        .unwrap();
        let id = sim.spawn("rifleman", Side(0), Vec2::new(1.5, 1.5), Posture::Standing).unwrap();
        let unit = sim.unit_mut(id).unwrap();
        unit.health.current = unit.health.max + 1;

        let violations = check_invariants(&sim);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].unit, Some(id));
    }
}
