//! Headless Skirmish Runner
//!
//! Runs a scenario for a fixed number of ticks and prints a JSON report.
//! Can record a replay, or verify one by re-running it.

use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};

use lockstep_tactics::content::Content;
use lockstep_tactics::core::{Result, SimulationConfig};
use lockstep_tactics::simulation::{Replay, Scenario, SimEventKind};
use lockstep_tactics::unit::Phase;

/// Headless Skirmish Runner - deterministic scenario playback
#[derive(Parser, Debug)]
#[command(name = "skirmish_runner")]
#[command(about = "Run a tactical scenario headless and report the outcome")]
struct Args {
    /// Scenario file (TOML)
    #[arg(long, default_value = "data/scenarios/crossroads.toml")]
    scenario: PathBuf,

    /// Simulation config (TOML); defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Content file (TOML); the bundled content is used when omitted
    #[arg(long)]
    content: Option<PathBuf>,

    /// Maximum ticks to run
    #[arg(long, default_value_t = 1200)]
    ticks: u64,

    /// Override the scenario's seed
    #[arg(long)]
    seed: Option<u64>,

    /// Save a replay of the run to this path
    #[arg(long)]
    record: Option<PathBuf>,

    /// Verify a saved replay instead of running the scenario
    #[arg(long)]
    verify: Option<PathBuf>,
}

/// JSON output structure
#[derive(Serialize)]
struct SkirmishReport {
    scenario: String,
    seed: u64,
    ticks: u64,
    phase: String,
    survivors: Vec<(u8, usize)>,
    shots_fired: usize,
    units_destroyed: usize,
    autonomous_overrides: usize,
    final_hash: String,
}

/// Running counts over the drained event stream
#[derive(Default)]
struct EventTally {
    shots_fired: usize,
    units_destroyed: usize,
    autonomous_overrides: usize,
}

impl EventTally {
    fn count(&mut self, kind: &SimEventKind) {
        match kind {
            SimEventKind::WeaponDischarged { .. } => self.shots_fired += 1,
            SimEventKind::UnitDestroyed { .. } => self.units_destroyed += 1,
            SimEventKind::AutonomousOverride { .. } => self.autonomous_overrides += 1,
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("lockstep_tactics=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    let content = match &args.content {
        Some(path) => Content::load(path)?,
        None => Content::standard()?,
    };

    if let Some(path) = &args.verify {
        let replay = Replay::load(path)?;
        info!("Verifying replay of '{}' ({} ticks)", replay.scenario.name, replay.ticks);
        return replay.verify(&content, &config);
    }

    if args.record.is_some() {
        // A replay needs every hash from tick 0
        config.record_hashes = true;
        config.hash_history = 0;
    }

    let scenario = Scenario::load(&args.scenario)?;
    let seed = args.seed.unwrap_or(scenario.seed);
    let mut sim = scenario.build_with_seed(&content, &config, seed)?;

    let mut tally = EventTally::default();
    while sim.current_tick() < args.ticks && !sim.phase().is_terminal() {
        sim.tick()?;
        for event in sim.drain_events() {
            tally.count(&event.kind);
        }
    }
    if !sim.phase().is_terminal() {
        warn!("Skirmish undecided after {} ticks", sim.current_tick());
    }

    if let Some(path) = &args.record {
        Replay::record(&scenario, &sim)?.save(path)?;
    }

    let mut survivors = std::collections::BTreeMap::new();
    for (_, unit) in sim.units().iter().filter(|(_, u)| u.is_alive()) {
        *survivors.entry(unit.side.0).or_insert(0usize) += 1;
    }

    let report = SkirmishReport {
        scenario: scenario.name.clone(),
        seed,
        ticks: sim.current_tick(),
        phase: match sim.phase() {
            Phase::Victory(side) => format!("Victory for side {}", side.0),
            Phase::Defeat(side) => format!("Defeat for side {}", side.0),
            other => format!("{:?}", other),
        },
        survivors: survivors.into_iter().collect(),
        shots_fired: tally.shots_fired,
        units_destroyed: tally.units_destroyed,
        autonomous_overrides: tally.autonomous_overrides,
        final_hash: format!("{:#018x}", sim.state_hash()),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
