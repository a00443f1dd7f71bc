//! Unit and weapon templates
//!
//! Templates are read once when a unit is spawned. The numbers are copied
//! into the unit so nothing in a tick ever looks a template up.

use serde::{Deserialize, Serialize};

use crate::core::error::ConfigError;
use crate::unit::capability::{Capability, CapabilitySet};

/// Flat unit kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    #[default]
    Soldier,
    Vehicle,
}

/// Weapon statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponTemplate {
    pub name: String,
    /// Health removed by one hit
    pub damage: u32,
    /// Maximum engagement range (world units)
    pub range: f32,
    /// Hit chance against an uncovered target at point blank (0.0 to 1.0)
    pub accuracy: f32,
    /// Rounds per magazine
    pub magazine: u32,
    /// Spare rounds carried
    pub reserve: u32,
    pub aim_ticks: u64,
    pub fire_ticks: u64,
    pub reload_ticks: u64,
    /// Threat magnitude a discharge adds to listeners at the reference distance
    #[serde(default = "default_discharge_threat")]
    pub discharge_threat: f32,
}

fn default_discharge_threat() -> f32 {
    0.4
}

/// Everything needed to spawn a unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitTemplate {
    pub name: String,
    #[serde(default)]
    pub kind: UnitKind,
    pub max_health: u32,
    /// Intrinsic capabilities; posture and weapon bits are derived at spawn
    #[serde(default)]
    pub capabilities: Vec<Capability>,
    /// World units per tick
    pub walk_speed: f32,
    pub run_speed: f32,
    pub sneak_speed: f32,
    pub vision_range: f32,
    /// Passenger seats, vehicles only
    #[serde(default)]
    pub crew_slots: u8,
    #[serde(default)]
    pub weapon: Option<WeaponTemplate>,
}

impl UnitTemplate {
    pub fn base_capabilities(&self) -> CapabilitySet {
        self.capabilities.iter().copied().collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let bad = |what: &str| ConfigError::InvalidSetting(format!("template {}: {}", self.name, what));

        if self.max_health == 0 {
            return Err(bad("max_health must be > 0"));
        }
        if self.walk_speed < 0.0 || self.run_speed < 0.0 || self.sneak_speed < 0.0 {
            return Err(bad("speeds must be >= 0"));
        }
        if self.vision_range <= 0.0 {
            return Err(bad("vision_range must be positive"));
        }
        if self.kind == UnitKind::Soldier && self.crew_slots > 0 {
            return Err(bad("only vehicles carry crew"));
        }
        if let Some(weapon) = &self.weapon {
            if !(0.0..=1.0).contains(&weapon.accuracy) {
                return Err(bad("weapon accuracy must be in [0, 1]"));
            }
            if weapon.range <= 0.0 {
                return Err(bad("weapon range must be positive"));
            }
            if weapon.magazine == 0 {
                return Err(bad("weapon magazine must hold at least one round"));
            }
        }
        Ok(())
    }
}
