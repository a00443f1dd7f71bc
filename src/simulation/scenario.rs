//! TOML scenario files: terrain, placements and squads
//!
//! ```toml
//! name = "crossroads"
//! seed = 42
//! cell_size = 1.0
//! begin_battle = true
//! terrain = [
//!     "....TT....",
//!     "..n....H..",
//! ]
//!
//! [[units]]
//! template = "rifleman"
//! side = 0
//! x = 1.5
//! y = 0.5
//! squad = "alpha"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::content::Content;
use crate::core::config::SimulationConfig;
use crate::core::error::Result;
use crate::core::types::{Side, UnitId, Vec2};
use crate::simulation::scheduler::Simulation;
use crate::terrain::TerrainGrid;
use crate::unit::state::Posture;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub template: String,
    pub side: u8,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub posture: Posture,
    /// Units sharing a squad name form one squad; the first listed leads
    #[serde(default)]
    pub squad: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_cell_size")]
    pub cell_size: f32,
    /// Rows of terrain characters, first row is y = 0
    pub terrain: Vec<String>,
    #[serde(default)]
    pub units: Vec<Placement>,
    #[serde(default)]
    pub begin_battle: bool,
}

fn default_cell_size() -> f32 {
    1.0
}

impl Scenario {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn terrain_grid(&self) -> Result<TerrainGrid> {
        Ok(TerrainGrid::from_ascii(&self.terrain.join("\n"), self.cell_size)?)
    }

    /// Build a simulation with the scenario's own seed
    pub fn build(&self, content: &Content, config: &SimulationConfig) -> Result<Simulation> {
        self.build_with_seed(content, config, self.seed)
    }

    pub fn build_with_seed(&self, content: &Content, config: &SimulationConfig, seed: u64) -> Result<Simulation> {
        let mut sim = Simulation::new(config.clone(), content.clone(), self.terrain_grid()?, seed)?;

        let mut squads: BTreeMap<&str, (UnitId, u8)> = BTreeMap::new();
        for placement in &self.units {
            let id = sim.spawn(
                &placement.template,
                Side(placement.side),
                Vec2::new(placement.x, placement.y),
                placement.posture,
            )?;
            let Some(name) = placement.squad.as_deref() else {
                continue;
            };
            match squads.get_mut(name) {
                Some((leader, next_slot)) => {
                    sim.join_squad(id, *leader, *next_slot)?;
                    *next_slot += 1;
                }
                None => {
                    squads.insert(name, (id, 1));
                }
            }
        }

        if self.begin_battle {
            sim.begin_battle()?;
        }
        info!(
            "Scenario '{}' built: {} units, {} squads, seed {}",
            self.name,
            self.units.len(),
            squads.len(),
            seed
        );
        Ok(sim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::state::Phase;

    const SMALL: &str = r#"
name = "small"
seed = 9
begin_battle = true
terrain = [
    "........",
    "...#....",
    "........",
]

[[units]]
template = "rifleman"
side = 0
x = 0.5
y = 0.5
squad = "alpha"

[[units]]
template = "rifleman"
side = 0
x = 1.5
y = 0.5
posture = "prone"
squad = "alpha"

[[units]]
template = "rifleman"
side = 1
x = 7.5
y = 2.5
"#;

    #[test]
    fn test_build_places_units_and_squads() {
        let scenario = Scenario::from_toml_str(SMALL).unwrap();
        let sim = scenario
            .build(&Content::standard().unwrap(), &SimulationConfig::default())
            .unwrap();

        assert_eq!(sim.seed(), 9);
        assert_eq!(sim.phase(), Phase::Battle);
        assert_eq!(sim.units().len(), 3);

        let member = sim.unit(UnitId(1)).unwrap();
        assert_eq!(member.posture(), Posture::Prone);
        assert_eq!(member.squad.map(|s| s.slot), Some(1));
        assert!(sim.unit(UnitId(0)).unwrap().squad.is_none());
    }

    #[test]
    fn test_placement_in_wall_fails() {
        let mut scenario = Scenario::from_toml_str(SMALL).unwrap();
        scenario.units[0].x = 3.5;
        scenario.units[0].y = 1.5;
        assert!(scenario
            .build(&Content::standard().unwrap(), &SimulationConfig::default())
            .is_err());
    }
}
