//! Replays: seed, scenario and command log, plus the hashes they produced
//!
//! Re-running a replay must reproduce every recorded hash bit for bit.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::content::Content;
use crate::core::config::SimulationConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::Tick;
use crate::orders::command::ScheduledCommand;
use crate::simulation::scenario::Scenario;
use crate::simulation::scheduler::Simulation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Replay {
    pub seed: u64,
    pub scenario: Scenario,
    pub commands: Vec<ScheduledCommand>,
    /// Ticks the recording ran for
    pub ticks: Tick,
    pub hashes: Vec<(Tick, u64)>,
}

impl Replay {
    /// Capture a finished run. `scenario` must be the one `sim` was built from,
    /// with `record_hashes` on; a replay without hashes cannot be verified.
    pub fn record(scenario: &Scenario, sim: &Simulation) -> Result<Self> {
        if sim.current_tick() > 0 && sim.recorded_hashes().is_empty() {
            error!("No state hashes recorded over {} ticks; enable record_hashes", sim.current_tick());
            return Err(SimError::HashUnavailable(sim.current_tick()));
        }
        Ok(Self {
            seed: sim.seed(),
            scenario: scenario.clone(),
            commands: sim.command_log().to_vec(),
            ticks: sim.current_tick(),
            hashes: sim.recorded_hashes().iter().map(|(&t, &h)| (t, h)).collect(),
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        info!("Replay saved to {} ({} commands, {} ticks)", path.display(), self.commands.len(), self.ticks);
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Re-run from scratch, returning the hashes the re-run recorded
    pub fn play(&self, content: &Content, config: &SimulationConfig) -> Result<Vec<(Tick, u64)>> {
        let mut config = config.clone();
        config.record_hashes = true;
        config.hash_history = 0;
        let mut sim = self.scenario.build_with_seed(content, &config, self.seed)?;
        for command in &self.commands {
            sim.apply_remote_order(command.clone())?;
        }
        sim.run(self.ticks)?;
        Ok(sim.recorded_hashes().iter().map(|(&t, &h)| (t, h)).collect())
    }

    /// Re-run and compare against the recorded hashes. The first mismatch
    /// is returned as a desync.
    pub fn verify(&self, content: &Content, config: &SimulationConfig) -> Result<()> {
        if self.ticks > 0 && self.hashes.is_empty() {
            error!("Replay of {} ticks carries no hashes", self.ticks);
            return Err(SimError::HashUnavailable(self.ticks));
        }
        let replayed = self.play(content, config)?;
        for &(tick, local) in &self.hashes {
            let remote = replayed
                .iter()
                .find(|(t, _)| *t == tick)
                .map(|&(_, h)| h)
                .ok_or(SimError::HashUnavailable(tick))?;
            if local != remote {
                error!("Replay diverged at tick {}", tick);
                return Err(SimError::Desync { tick, local, remote });
            }
        }
        info!("Replay verified: {} hashes over {} ticks", self.hashes.len(), self.ticks);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{UnitId, Vec2};
    use crate::orders::order::Order;

    const DUEL: &str = r#"
name = "duel"
seed = 21
begin_battle = true
terrain = [
    "....................",
    "....................",
    "....................",
]

[[units]]
template = "rifleman"
side = 0
x = 0.5
y = 1.5

[[units]]
template = "rifleman"
side = 1
x = 19.5
y = 1.5
"#;

    fn run_duel(config: &SimulationConfig) -> (Scenario, Simulation) {
        let scenario = Scenario::from_toml_str(DUEL).unwrap();
        let mut sim = scenario.build(&Content::standard().unwrap(), config).unwrap();
        sim.issue(UnitId(0), Order::move_to(Vec2::new(10.5, 1.5), 0)).unwrap();
        sim.run(60).unwrap();
        (scenario, sim)
    }

    fn recorded() -> (Replay, Content, SimulationConfig) {
        let mut config = SimulationConfig::default();
        config.record_hashes = true;
        config.hash_interval = 5;
        let (scenario, sim) = run_duel(&config);
        (Replay::record(&scenario, &sim).unwrap(), Content::standard().unwrap(), config)
    }

    #[test]
    fn test_replay_reproduces_hashes() {
        let (replay, content, config) = recorded();
        assert_eq!(replay.hashes.len(), 12);
        assert!(replay.verify(&content, &config).is_ok());
    }

    #[test]
    fn test_tampered_replay_desyncs() {
        let (mut replay, content, config) = recorded();
        replay.hashes[3].1 ^= 0xdead;
        assert!(matches!(
            replay.verify(&content, &config),
            Err(SimError::Desync { tick: 20, .. })
        ));
    }

    #[test]
    fn test_record_without_hashes_is_refused() {
        let mut config = SimulationConfig::default();
        config.record_hashes = false;
        let (scenario, sim) = run_duel(&config);
        assert!(matches!(
            Replay::record(&scenario, &sim),
            Err(SimError::HashUnavailable(60))
        ));
    }

    #[test]
    fn test_replay_without_hashes_never_verifies() {
        let (mut replay, content, config) = recorded();
        replay.hashes.clear();
        replay.seed ^= 0xffff;
        replay.commands.clear();
        assert!(matches!(
            replay.verify(&content, &config),
            Err(SimError::HashUnavailable(60))
        ));
    }

    #[test]
    fn test_replay_ignores_hash_history_window() {
        let (replay, content, mut config) = recorded();
        config.hash_history = 4;
        assert_eq!(replay.play(&content, &config).unwrap().len(), 12);
        assert!(replay.verify(&content, &config).is_ok());
    }
}
