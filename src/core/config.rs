//! Simulation configuration with documented constants
//!
//! All tuning numbers live here. A config is owned by one simulation
//! instance; several matches in one process can run with different configs.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::{ConfigError, Result};
use crate::core::types::Side;

/// Configuration for the simulation systems
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // === TIMING ===
    /// Duration of one simulation tick in microseconds
    ///
    /// 50_000 gives 20 ticks per second.
    pub fixed_step_micros: u64,

    /// Largest wall-clock frame the frame clock will accept in microseconds
    ///
    /// Longer frames are clamped so a hitch cannot queue an unbounded number
    /// of catch-up ticks (spiral of death).
    pub max_frame_micros: u64,

    // === SPATIAL SYSTEM ===
    /// Size of each cell in the spatial index (world units)
    ///
    /// Should be a fraction of the typical vision range so radius queries
    /// touch a handful of cells.
    pub grid_cell_size: f32,

    // === LINE OF SIGHT ===
    /// Distance between opacity samples along a sight line (world units)
    pub sight_sample_interval: f32,

    /// Accumulated opacity at which a sight line counts as blocked
    pub opacity_threshold: f32,

    /// Targets closer than this are always visible, no sampling
    pub always_visible_radius: f32,

    // === PERCEPTION ===
    /// Ticks a last-known enemy position is remembered after losing sight
    pub memory_ticks: u64,

    /// Threat intensity above which a unit abandons its task to hide
    pub danger_threshold: f32,

    /// Threat intensity above which a hiding unit panics instead
    pub panic_threshold: f32,

    /// Threat intensity above which the suppressed condition is set
    pub suppression_threshold: f32,

    /// Linear threat decay per tick
    pub threat_decay: f32,

    /// Distance inside which a discharge contributes its full magnitude
    ///
    /// Beyond it, contributions fall off with the inverse square of distance.
    pub threat_reference_distance: f32,

    /// Discharges farther away than this are not heard at all
    pub hearing_radius: f32,

    // === COMBAT ===
    /// Cover value at or above which the in-cover condition is set
    pub cover_condition_threshold: f32,

    /// Fraction of hit chance lost at the very edge of weapon range
    ///
    /// At 0.5, a shot at maximum range hits half as often as point blank.
    pub range_falloff: f32,

    // === ORDERS ===
    /// Distance between neighboring squad slots in a formation (world units)
    pub formation_spacing: f32,

    // === DECISIONS ===
    /// Minimum unit count before decisions and perception run in parallel
    pub parallel_threshold: usize,

    // === DETERMINISM ===
    /// Record a state hash every this many ticks
    pub hash_interval: u64,

    /// Whether state hashes are recorded at all
    ///
    /// Defaults to on in debug builds.
    pub record_hashes: bool,

    /// Most recent recorded hashes kept for peer comparison; 0 keeps every
    /// hash, which replay recording needs
    pub hash_history: usize,

    // === CLEANUP ===
    /// Ticks a dead unit stays in the table before it is removed
    pub corpse_linger_ticks: u64,

    /// The local player's side, for Victory/Defeat
    pub player_side: Side,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            fixed_step_micros: 50_000,
            max_frame_micros: 250_000,

            grid_cell_size: 8.0,

            sight_sample_interval: 0.5,
            opacity_threshold: 0.5,
            always_visible_radius: 2.0,

            memory_ticks: 100,
            danger_threshold: 1.0,
            panic_threshold: 3.0,
            suppression_threshold: 0.5,
            threat_decay: 0.02,
            threat_reference_distance: 2.0,
            hearing_radius: 40.0,

            cover_condition_threshold: 0.3,
            range_falloff: 0.5,

            formation_spacing: 3.0,

            parallel_threshold: 256,

            hash_interval: 1,
            record_hashes: cfg!(debug_assertions),
            hash_history: 1200,

            corpse_linger_ticks: 100,
            player_side: Side(0),
        }
    }
}

impl SimulationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fixed_step(&self) -> Duration {
        Duration::from_micros(self.fixed_step_micros)
    }

    pub fn max_frame(&self) -> Duration {
        Duration::from_micros(self.max_frame_micros)
    }

    /// Parse a config from TOML. Missing keys take their default value.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.fixed_step_micros == 0 {
            return Err(ConfigError::InvalidSetting("fixed_step_micros must be > 0".into()));
        }
        if self.max_frame_micros < self.fixed_step_micros {
            return Err(ConfigError::InvalidSetting(format!(
                "max_frame_micros ({}) must be >= fixed_step_micros ({})",
                self.max_frame_micros, self.fixed_step_micros
            )));
        }
        if self.grid_cell_size <= 0.0 {
            return Err(ConfigError::InvalidSetting("grid_cell_size must be positive".into()));
        }
        if self.sight_sample_interval <= 0.0 {
            return Err(ConfigError::InvalidSetting(
                "sight_sample_interval must be positive".into(),
            ));
        }
        if self.suppression_threshold >= self.danger_threshold
            || self.danger_threshold >= self.panic_threshold
        {
            return Err(ConfigError::InvalidSetting(format!(
                "threat thresholds must be ordered: suppression ({}) < danger ({}) < panic ({})",
                self.suppression_threshold, self.danger_threshold, self.panic_threshold
            )));
        }
        if self.threat_decay < 0.0 {
            return Err(ConfigError::InvalidSetting("threat_decay must be >= 0".into()));
        }
        if self.threat_reference_distance <= 0.0 {
            return Err(ConfigError::InvalidSetting(
                "threat_reference_distance must be positive".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.range_falloff) {
            return Err(ConfigError::InvalidSetting("range_falloff must be in [0, 1]".into()));
        }
        if self.hash_interval == 0 {
            return Err(ConfigError::InvalidSetting("hash_interval must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SimulationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_thresholds_must_be_ordered() {
        let config = SimulationConfig {
            danger_threshold: 5.0,
            panic_threshold: 4.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SimulationConfig::from_toml_str(
            r#"
            fixed_step_micros = 100000
            danger_threshold = 1.5
            "#,
        )
        .unwrap();

        assert_eq!(config.fixed_step_micros, 100_000);
        assert_eq!(config.danger_threshold, 1.5);
        assert_eq!(config.grid_cell_size, SimulationConfig::default().grid_cell_size);
    }

    #[test]
    fn test_invalid_toml_value_rejected() {
        let result = SimulationConfig::from_toml_str("fixed_step_micros = 0");
        assert!(result.is_err());
    }

    #[test]
    fn test_max_frame_not_below_step() {
        let config = SimulationConfig {
            fixed_step_micros: 100,
            max_frame_micros: 50,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
