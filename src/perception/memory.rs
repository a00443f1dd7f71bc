//! Last-known enemy positions

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::types::{Tick, UnitId, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LastKnown {
    pub position: Vec2,
    pub tick: Tick,
}

/// Sightings keyed by stable enemy id, so removals never need rebinding
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnemyMemory {
    entries: BTreeMap<UnitId, LastKnown>,
}

impl EnemyMemory {
    pub fn remember(&mut self, enemy: UnitId, position: Vec2, tick: Tick) {
        self.entries.insert(enemy, LastKnown { position, tick });
    }

    /// Drop entries last refreshed more than `memory_ticks` ago
    pub fn evict_stale(&mut self, now: Tick, memory_ticks: u64) {
        self.entries.retain(|_, seen| now.saturating_sub(seen.tick) <= memory_ticks);
    }

    pub fn forget(&mut self, enemy: UnitId) {
        self.entries.remove(&enemy);
    }

    pub fn get(&self, enemy: UnitId) -> Option<&LastKnown> {
        self.entries.get(&enemy)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UnitId, &LastKnown)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
