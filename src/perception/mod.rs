//! Per-unit perception: visible enemies, memory and threat
//!
//! Refreshed at the start of the decision step from a read-only snapshot.
//! Observation runs in parallel for large tables; updates are applied in
//! index order.

pub mod memory;
pub mod threat;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::config::SimulationConfig;
use crate::core::types::{Tick, UnitId, UnitIndex, Vec2};
use crate::sight::{can_see, cover_at, SightParams};
use crate::spatial::SparseHashGrid;
use crate::terrain::Terrain;
use crate::unit::capability::{Capability, Condition, ConditionSet};
use crate::unit::table::UnitTable;

pub use memory::{EnemyMemory, LastKnown};
pub use threat::{accumulate, ThreatEvent, ThreatUpdate};

/// Sensory state of one unit. A derived cache, never the source of truth.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Perception {
    /// Enemies seen this tick, sorted by index
    pub visible: Vec<UnitIndex>,
    pub memory: EnemyMemory,
    pub threat: f32,
    /// Where the most frightening recent event came from
    pub threat_source: Option<Vec2>,
}

impl Perception {
    pub fn sees(&self, unit: UnitIndex) -> bool {
        self.visible.binary_search(&unit).is_ok()
    }
}

/// Read-only inputs of a perception refresh
pub struct PerceptionInput<'a> {
    pub units: &'a UnitTable,
    pub spatial: &'a SparseHashGrid,
    pub terrain: &'a dyn Terrain,
    pub config: &'a SimulationConfig,
    pub threat_events: &'a [ThreatEvent],
    pub tick: Tick,
}

/// Buffered result for one unit
#[derive(Debug, Clone, PartialEq)]
pub struct PerceptionUpdate {
    pub unit: UnitIndex,
    pub visible: Vec<UnitIndex>,
    pub sightings: Vec<(UnitId, Vec2)>,
    pub threat: ThreatUpdate,
    pub conditions: ConditionSet,
}

/// Observe the world from one unit's position
pub fn observe(input: &PerceptionInput<'_>, index: UnitIndex) -> Option<PerceptionUpdate> {
    let observer = input.units.get(index)?;
    if !observer.is_alive() || observer.is_mounted() {
        return None;
    }
    let config = input.config;
    let params = SightParams::from_config(config);

    let mut candidates = input.spatial.query_radius(observer.position, observer.vision_range, |u| {
        input.units.get(u).map(|unit| unit.position)
    });
    candidates.sort();

    let concealed_range_sq = (observer.vision_range * 0.5) * (observer.vision_range * 0.5);
    let mut visible = Vec::new();
    let mut sightings = Vec::new();
    for candidate in candidates {
        let Some(other) = input.units.get(candidate) else {
            continue;
        };
        if other.side == observer.side || !other.is_alive() || other.is_mounted() {
            continue;
        }
        if other.has(Capability::Concealed) && observer.position.distance_sq(&other.position) > concealed_range_sq {
            continue;
        }
        if can_see(input.terrain, observer.position, other.position, &params) {
            visible.push(candidate);
            sightings.push((other.id, other.position));
        }
    }

    let threat = accumulate(
        observer.perception.threat,
        input.threat_events,
        observer.position,
        observer.side,
        config,
    );

    let mut conditions = observer.conditions;
    conditions.set(Condition::IsSuppressed, threat.intensity > config.suppression_threshold);
    conditions.set(Condition::IsPinned, threat.intensity > config.danger_threshold);
    conditions.set(Condition::UnderFire, threat.loudest.is_some());
    conditions.set(
        Condition::InCover,
        cover_at(input.terrain, observer.position, observer.posture()) >= config.cover_condition_threshold,
    );

    Some(PerceptionUpdate {
        unit: index,
        visible,
        sightings,
        threat,
        conditions,
    })
}

/// Observe for every unit, in parallel above the configured threshold
pub fn refresh(input: &PerceptionInput<'_>) -> Vec<PerceptionUpdate> {
    let count = input.units.len();
    if count >= input.config.parallel_threshold {
        (0..count)
            .into_par_iter()
            .filter_map(|i| observe(input, UnitIndex(i)))
            .collect()
    } else {
        (0..count).filter_map(|i| observe(input, UnitIndex(i))).collect()
    }
}

/// Write buffered updates back in index order
pub fn apply(units: &mut UnitTable, updates: Vec<PerceptionUpdate>, tick: Tick, memory_ticks: u64) {
    for update in updates {
        let Some(unit) = units.get_mut(update.unit) else {
            continue;
        };
        let perception = &mut unit.perception;
        perception.visible = update.visible;
        for (enemy, position) in update.sightings {
            perception.memory.remember(enemy, position, tick);
        }
        perception.memory.evict_stale(tick, memory_ticks);
        perception.threat = update.threat.intensity;
        if update.threat.loudest.is_some() {
            perception.threat_source = update.threat.loudest;
        } else if perception.threat <= 0.0 {
            perception.threat_source = None;
        }
        unit.conditions = update.conditions;
    }
}
