//! Deterministic update scheduler
//!
//! One [`Simulation`] owns the unit table, the derived caches and the one
//! seeded generator. Each tick runs in a fixed order:
//!
//! 1. Drain commands scheduled for this tick (orders go through the
//!    translator for validation, environmental triggers apply directly)
//! 2. Refresh perception, then evaluate the decision layer for every unit
//!    against a read-only snapshot
//! 3. Apply the resulting messages in unit-index order
//! 4. Complete gestures whose end tick has arrived (ammunition, hits)
//! 5. Remove corpses and despawned units, check the phase, advance `tick`
//!
//! No wall clock and no transcendental functions are read inside a tick.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, error, info, warn};

use crate::content::{Content, UnitKind};
use crate::core::config::SimulationConfig;
use crate::core::error::{ConfigError, Result, SimError};
use crate::core::types::{PlayerId, Side, Tick, UnitId, UnitIndex, Vec2};
use crate::decision::{evaluate_all, DecisionContext};
use crate::orders::command::{Command, ScheduledCommand};
use crate::orders::order::{Order, OrderPriority};
use crate::orders::translator::{translate, WorldSnapshot};
use crate::perception::{self, PerceptionInput, ThreatEvent};
use crate::simulation::clock::FrameClock;
use crate::simulation::events::{EventLog, SimEvent, SimEventKind};
use crate::simulation::hash::hash_state;
use crate::simulation::invariants::check_invariants;
use crate::spatial::SparseHashGrid;
use crate::terrain::{Terrain, TerrainGrid};
use crate::unit::capability::Condition;
use crate::unit::model::{SquadLink, Unit};
use crate::unit::state::{Gesture, Phase, Posture};
use crate::unit::table::UnitTable;

/// Largest distance at which a soldier can climb into a vehicle
const EMBARK_RADIUS: f32 = 3.0;

/// Player id reserved for commands issued through [`Simulation::submit`]
pub const LOCAL_PLAYER: PlayerId = PlayerId::MAX;

/// Result of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    /// Tick counter after the tick ran
    pub tick: Tick,
    /// State hash, when one was recorded for this tick
    pub hash: Option<u64>,
    pub events_emitted: usize,
}

pub struct Simulation {
    pub(crate) config: SimulationConfig,
    pub(crate) content: Content,
    pub(crate) terrain: TerrainGrid,
    pub(crate) units: UnitTable,
    pub(crate) spatial: SparseHashGrid,
    pub(crate) phase: Phase,
    pub(crate) tick: Tick,
    pub(crate) seed: u64,
    pub(crate) rng: ChaCha8Rng,
    pub(crate) events: EventLog,
    /// Threat heard at the next perception refresh
    pub(crate) threat_events: Vec<ThreatEvent>,
    pub(crate) despawn: BTreeSet<UnitIndex>,
    pending: BTreeMap<(Tick, PlayerId, u32), Command>,
    command_log: Vec<ScheduledCommand>,
    hashes: BTreeMap<Tick, u64>,
    clock: FrameClock,
    next_seq: u32,
}

impl Simulation {
    pub fn new(config: SimulationConfig, content: Content, terrain: TerrainGrid, seed: u64) -> Result<Self> {
        config.validate()?;
        terrain.validate()?;
        let spatial = SparseHashGrid::new(config.grid_cell_size);
        let clock = FrameClock::from_config(&config);
        info!("Simulation created: seed {}, {}x{} terrain", seed, terrain.width(), terrain.height());
        Ok(Self {
            config,
            content,
            terrain,
            units: UnitTable::new(),
            spatial,
            phase: Phase::Deployment,
            tick: 0,
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            events: EventLog::new(),
            threat_events: Vec::new(),
            despawn: BTreeSet::new(),
            pending: BTreeMap::new(),
            command_log: Vec::new(),
            hashes: BTreeMap::new(),
            clock,
            next_seq: 0,
        })
    }

    // === Accessors ===

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn terrain(&self) -> &TerrainGrid {
        &self.terrain
    }

    pub fn units(&self) -> &UnitTable {
        &self.units
    }

    pub fn spatial(&self) -> &SparseHashGrid {
        &self.spatial
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.by_id(id)
    }

    /// Direct mutable access, for scenario setup and tests. Changes made
    /// here bypass the message path.
    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.by_id_mut(id)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_tick(&self) -> Tick {
        self.tick
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Take every event emitted so far. Long-running hosts call this each
    /// frame to keep the log bounded.
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        self.events.drain()
    }

    pub fn command_log(&self) -> &[ScheduledCommand] {
        &self.command_log
    }

    pub fn recorded_hashes(&self) -> &BTreeMap<Tick, u64> {
        &self.hashes
    }

    pub fn frame_alpha(&self) -> f32 {
        self.clock.alpha()
    }

    pub(crate) fn snapshot(&self) -> WorldSnapshot<'_> {
        WorldSnapshot {
            tick: self.tick,
            phase: self.phase,
            units: &self.units,
            terrain: &self.terrain,
            actions: &self.content.actions,
            config: &self.config,
        }
    }

    // === Setup ===

    /// Place a unit from a named template
    pub fn spawn(&mut self, template: &str, side: Side, position: Vec2, posture: Posture) -> Result<UnitId> {
        if !self.terrain.is_passable(position) {
            return Err(ConfigError::ImpassableSpawn { x: position.x, y: position.y }.into());
        }
        let template = self.content.template(template)?.clone();
        let (id, index) = self.units.spawn(&template, side, position, posture);
        self.spatial.insert(index, position);
        debug!("Spawned {:?} ({}) at ({:.1}, {:.1})", id, template.name, position.x, position.y);
        Ok(id)
    }

    /// Put `member` in `leader`'s squad at `slot`
    pub fn join_squad(&mut self, member: UnitId, leader: UnitId, slot: u8) -> Result<()> {
        let leader_index = self.units.resolve(leader).ok_or(SimError::UnknownUnit(leader))?;
        let unit = self.units.by_id_mut(member).ok_or(SimError::UnknownUnit(member))?;
        unit.squad = Some(SquadLink { leader: leader_index, slot });
        Ok(())
    }

    /// Deployment -> Battle outside the command stream, for scenario setup
    pub fn begin_battle(&mut self) -> Result<()> {
        let next = self.phase.advance_to(Phase::Battle)?;
        self.set_phase(next);
        Ok(())
    }

    // === Input ===

    /// Schedule a command from any peer. Commands for past ticks and keys
    /// that are already scheduled are refused.
    pub fn apply_remote_order(&mut self, command: ScheduledCommand) -> Result<()> {
        if command.tick < self.tick {
            warn!(
                "Late command from player {} for tick {} (now {})",
                command.player, command.tick, self.tick
            );
            return Err(SimError::LateCommand {
                scheduled: command.tick,
                current: self.tick,
            });
        }
        let key = command.key();
        if self.pending.contains_key(&key) {
            warn!("Duplicate command key {:?} from player {}", key, command.player);
            return Err(SimError::DuplicateCommand {
                tick: key.0,
                player: key.1,
                seq: key.2,
            });
        }
        self.pending.insert(key, command.command.clone());
        self.command_log.push(command);
        Ok(())
    }

    /// Schedule a local command for the next tick
    pub fn submit(&mut self, command: Command) -> Result<()> {
        let mut seq = self.next_seq;
        while self.pending.contains_key(&(self.tick, LOCAL_PLAYER, seq)) {
            seq = seq.wrapping_add(1);
        }
        self.next_seq = seq.wrapping_add(1);
        self.apply_remote_order(ScheduledCommand::new(self.tick, LOCAL_PLAYER, seq, command))
    }

    /// Queue an order on a unit, applied at the start of the next tick
    pub fn issue(&mut self, unit: UnitId, order: Order) -> Result<()> {
        if self.units.resolve(unit).is_none() {
            return Err(SimError::UnknownUnit(unit));
        }
        self.submit(Command::Issue { unit, order })
    }

    // === Stepping ===

    /// Run as many ticks as the frame's elapsed time allows
    pub fn frame(&mut self, elapsed: Duration) -> Result<Vec<TickOutcome>> {
        let due = self.clock.advance(elapsed);
        (0..due).map(|_| self.tick()).collect()
    }

    /// Run exactly one tick
    pub fn tick(&mut self) -> Result<TickOutcome> {
        let tick = self.tick;
        let first_event = self.events.len();

        for unit in self.units.iter_mut().map(|(_, u)| u) {
            unit.prev_position = unit.position;
        }

        // 1. commands
        self.apply_commands(tick);

        // 2 + 3. perception, decisions, messages
        if !self.phase.is_terminal() {
            self.refresh_perception(tick);
            let messages = {
                let ctx = DecisionContext::new(self.snapshot());
                evaluate_all(&ctx)
            };
            for message in messages {
                self.apply_message(message);
            }
        }
        self.follow_vehicles();

        // 4. gestures
        self.advance_gestures(tick);

        // 5. cleanup, phase, counter
        self.cleanup(tick);
        self.check_outcome();
        self.tick += 1;

        if cfg!(debug_assertions) {
            if let Some(violation) = check_invariants(self).into_iter().next() {
                error!("Invariant violated after tick {}: {}", tick, violation);
                return Err(SimError::InvariantViolation {
                    tick,
                    detail: violation.to_string(),
                });
            }
        }

        let hash = if self.config.record_hashes && self.tick % self.config.hash_interval == 0 {
            let hash = self.state_hash();
            self.hashes.insert(self.tick, hash);
            if self.config.hash_history > 0 {
                while self.hashes.len() > self.config.hash_history {
                    self.hashes.pop_first();
                }
            }
            Some(hash)
        } else {
            None
        };

        Ok(TickOutcome {
            tick: self.tick,
            hash,
            events_emitted: self.events.len() - first_event,
        })
    }

    /// Run `count` ticks, stopping at the first error
    pub fn run(&mut self, count: u64) -> Result<()> {
        for _ in 0..count {
            self.tick()?;
        }
        Ok(())
    }

    // === Determinism ===

    /// Hash of the authoritative state as of now
    pub fn state_hash(&self) -> u64 {
        hash_state(self.tick, self.phase, self.rng.get_word_pos(), &self.units)
    }

    /// Compare a peer's hash against the one recorded locally for `tick`.
    /// A mismatch is reported, never repaired.
    pub fn verify_remote_hash(&self, tick: Tick, remote: u64) -> Result<()> {
        let local = *self.hashes.get(&tick).ok_or(SimError::HashUnavailable(tick))?;
        if local != remote {
            error!("Desync at tick {}: local {:#018x}, remote {:#018x}", tick, local, remote);
            return Err(SimError::Desync { tick, local, remote });
        }
        Ok(())
    }

    // === Step 1 ===

    fn apply_commands(&mut self, tick: Tick) {
        while let Some(entry) = self.pending.first_entry() {
            if entry.key().0 > tick {
                break;
            }
            let command = entry.remove();
            self.apply_command(command, tick);
        }
    }

    fn apply_command(&mut self, command: Command, tick: Tick) {
        match command {
            Command::Issue { unit, order } => self.enqueue_order(unit, order, tick),
            Command::Cancel { unit } => {
                if let Some(u) = self.units.by_id_mut(unit) {
                    u.orders.clear();
                    u.current_action = None;
                    self.events.push(tick, SimEventKind::OrdersCancelled { unit });
                }
            }
            Command::BeginBattle => match self.phase.advance_to(Phase::Battle) {
                Ok(next) => self.set_phase(next),
                Err(err) => debug!("BeginBattle ignored: {}", err),
            },
            Command::Explosion { position, radius, damage, threat } => {
                self.explode(position, radius, damage, threat, tick);
            }
            Command::Despawn { unit } => match self.units.resolve(unit) {
                Some(index) => {
                    self.despawn.insert(index);
                }
                None => debug!("Despawn of unknown unit {:?}", unit),
            },
            Command::Embark { unit, vehicle } => self.embark(unit, vehicle, tick),
            Command::Disembark { unit } => self.disembark(unit, tick),
        }
    }

    /// Validate through the translator, then queue. Rejections are surfaced
    /// as events and not retried.
    fn enqueue_order(&mut self, unit: UnitId, order: Order, tick: Tick) {
        let Some(index) = self.units.resolve(unit) else {
            debug!("Order for unknown unit {:?} dropped", unit);
            return;
        };
        let verdict = translate(index, &order, &self.snapshot()).map(|_| ());
        let Some(u) = self.units.get_mut(index) else {
            return;
        };

        if let Err(reason) = verdict {
            debug!("Order {:?} for {:?} rejected: {}", order.order_type, unit, reason);
            self.events.push(
                tick,
                SimEventKind::OrderRejected {
                    unit,
                    order: order.order_type,
                    reason,
                },
            );
            return;
        }

        if order.priority == OrderPriority::Critical {
            // Ammunition already spent stays spent
            u.orders.clear();
            u.current_action = None;
            if u.gesture.is_committed() {
                u.set_gesture(Gesture::Idle, tick, &mut self.events);
            }
        }
        u.orders.push_back(order);
    }

    pub(crate) fn set_phase(&mut self, next: Phase) {
        let from = self.phase;
        if from == next {
            return;
        }
        info!("Phase {:?} -> {:?} at tick {}", from, next, self.tick);
        self.phase = next;
        self.events.push(self.tick, SimEventKind::PhaseChanged { from, to: next });
    }

    fn explode(&mut self, position: Vec2, radius: f32, damage: u32, threat: f32, tick: Tick) {
        debug!("Explosion at ({:.1}, {:.1}) radius {:.1}", position.x, position.y, radius);
        self.events.push(tick, SimEventKind::Explosion { position, magnitude: threat });

        let units = &self.units;
        let mut victims = self
            .spatial
            .query_radius(position, radius, |u| units.get(u).map(|unit| unit.position));
        victims.sort();

        for index in victims {
            let Some(unit) = self.units.get(index) else {
                continue;
            };
            if !unit.is_alive() || radius <= 0.0 {
                continue;
            }
            let falloff = 1.0 - unit.position.distance(&position) / radius;
            let cover = self.terrain.cover_value(unit.position, unit.posture());
            let amount = (damage as f32 * falloff.max(0.0) * (1.0 - cover)) as u32;
            self.damage_unit(index, amount, None, tick);
        }

        for cell in self.terrain.destroy_within(position, radius) {
            self.events.push(tick, SimEventKind::StructureDestroyed { cell });
        }
        self.threat_events.push(ThreatEvent::new(position, threat, None));
    }

    fn embark(&mut self, unit: UnitId, vehicle: UnitId, tick: Tick) {
        let (Some(ui), Some(vi)) = (self.units.resolve(unit), self.units.resolve(vehicle)) else {
            debug!("Embark with unknown unit {:?} or vehicle {:?}", unit, vehicle);
            return;
        };
        let (Some(passenger), Some(carrier)) = (self.units.get(ui), self.units.get(vi)) else {
            return;
        };
        let allowed = passenger.is_alive()
            && carrier.is_alive()
            && passenger.kind == UnitKind::Soldier
            && carrier.kind == UnitKind::Vehicle
            && !passenger.is_mounted()
            && !passenger.gesture.is_committed()
            && passenger.side == carrier.side
            && carrier.crew.as_ref().is_some_and(|c| c.has_room())
            && passenger.position.distance_sq(&carrier.position) <= EMBARK_RADIUS * EMBARK_RADIUS;
        if !allowed {
            debug!("Embark of {:?} into {:?} refused", unit, vehicle);
            return;
        }
        let carrier_pos = carrier.position;

        if let Some(crew) = self.units.get_mut(vi).and_then(|v| v.crew.as_mut()) {
            crew.occupants.push(ui);
        }
        if let Some(p) = self.units.get_mut(ui) {
            self.spatial.remove(ui, p.position);
            p.mounted_in = Some(vi);
            p.conditions.set(Condition::Mounted, true);
            p.orders.clear();
            p.current_action = None;
            p.perception.visible.clear();
            p.position = carrier_pos;
            p.set_gesture(Gesture::Idle, tick, &mut self.events);
        }
        self.events.push(tick, SimEventKind::Embarked { unit, vehicle });
    }

    fn disembark(&mut self, unit: UnitId, tick: Tick) {
        let Some(ui) = self.units.resolve(unit) else {
            debug!("Disembark of unknown unit {:?}", unit);
            return;
        };
        let Some(vi) = self.units.get(ui).and_then(|u| u.mounted_in) else {
            debug!("Disembark of {:?} which is not mounted", unit);
            return;
        };
        self.dismount(ui, vi, tick);
    }

    /// Take `occupant` out of `vehicle` and put it on the ground beside it
    pub(crate) fn dismount(&mut self, occupant: UnitIndex, vehicle: UnitIndex, tick: Tick) {
        let Some(carrier) = self.units.get_mut(vehicle) else {
            return;
        };
        let vehicle_id = carrier.id;
        let position = carrier.position;
        if let Some(crew) = carrier.crew.as_mut() {
            crew.occupants.retain(|&o| o != occupant);
        }
        let Some(unit) = self.units.get_mut(occupant) else {
            return;
        };
        unit.mounted_in = None;
        unit.conditions.set(Condition::Mounted, false);
        unit.position = position;
        unit.prev_position = position;
        let id = unit.id;
        self.spatial.insert(occupant, position);
        self.events.push(tick, SimEventKind::Disembarked { unit: id, vehicle: vehicle_id });
    }

    // === Step 2 ===

    fn refresh_perception(&mut self, tick: Tick) {
        let threat_events = std::mem::take(&mut self.threat_events);
        let updates = {
            let input = PerceptionInput {
                units: &self.units,
                spatial: &self.spatial,
                terrain: &self.terrain,
                config: &self.config,
                threat_events: &threat_events,
                tick,
            };
            perception::refresh(&input)
        };
        perception::apply(&mut self.units, updates, tick, self.config.memory_ticks);
    }

    /// Mounted units ride at their vehicle's position
    fn follow_vehicles(&mut self) {
        for i in 0..self.units.len() {
            let index = UnitIndex(i);
            let Some(vehicle) = self.units.get(index).and_then(|u| u.mounted_in) else {
                continue;
            };
            let Some(position) = self.units.get(vehicle).map(|v| v.position) else {
                continue;
            };
            if let Some(unit) = self.units.get_mut(index) {
                unit.position = position;
            }
        }
    }

    // === Step 5 ===

    fn check_outcome(&mut self) {
        if self.phase != Phase::Battle {
            return;
        }
        let player = self.config.player_side;
        let alive = |friendly: bool| {
            self.units
                .iter()
                .any(|(_, u)| u.is_alive() && (u.side == player) == friendly)
        };
        let next = if !alive(true) {
            Phase::Defeat(player)
        } else if !alive(false) {
            Phase::Victory(player)
        } else {
            return;
        };
        match self.phase.advance_to(next) {
            Ok(next) => self.set_phase(next),
            Err(err) => debug!("Outcome check: {}", err),
        }
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.tick)
            .field("phase", &self.phase)
            .field("units", &self.units.len())
            .field("seed", &self.seed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::order::OrderType;

    fn sim() -> Simulation {
        Simulation::new(
            SimulationConfig::default(),
            Content::standard().unwrap(),
            TerrainGrid::open(64, 64, 1.0),
            7,
        )
        .unwrap()
    }

    #[test]
    fn test_tick_advances_counter() {
        let mut sim = sim();
        let outcome = sim.tick().unwrap();
        assert_eq!(outcome.tick, 1);
        assert_eq!(sim.current_tick(), 1);
    }

    #[test]
    fn test_spawn_on_impassable_fails() {
        let mut sim = Simulation::new(
            SimulationConfig::default(),
            Content::standard().unwrap(),
            TerrainGrid::from_ascii("..#..", 1.0).unwrap(),
            1,
        )
        .unwrap();
        assert!(matches!(
            sim.spawn("rifleman", Side(0), Vec2::new(2.5, 0.5), Posture::Standing),
            Err(SimError::Configuration(ConfigError::ImpassableSpawn { .. }))
        ));
    }

    #[test]
    fn test_late_command_refused() {
        let mut sim = sim();
        sim.run(3).unwrap();
        let late = ScheduledCommand::new(1, 1, 0, Command::BeginBattle);
        assert!(matches!(
            sim.apply_remote_order(late),
            Err(SimError::LateCommand { scheduled: 1, current: 3 })
        ));
    }

    #[test]
    fn test_begin_battle_command() {
        let mut sim = sim();
        sim.spawn("rifleman", Side(0), Vec2::new(2.5, 2.5), Posture::Standing).unwrap();
        sim.spawn("rifleman", Side(1), Vec2::new(60.5, 60.5), Posture::Standing).unwrap();
        sim.submit(Command::BeginBattle).unwrap();
        sim.tick().unwrap();
        assert_eq!(sim.phase(), Phase::Battle);
        assert!(sim
            .events()
            .events()
            .iter()
            .any(|e| matches!(e.kind, SimEventKind::PhaseChanged { to: Phase::Battle, .. })));
    }

    #[test]
    fn test_engage_rejected_in_deployment() {
        let mut sim = sim();
        let a = sim.spawn("rifleman", Side(0), Vec2::new(2.5, 2.5), Posture::Standing).unwrap();
        let b = sim.spawn("rifleman", Side(1), Vec2::new(12.5, 2.5), Posture::Standing).unwrap();
        sim.issue(a, Order::engage(b, 0)).unwrap();
        sim.tick().unwrap();
        assert!(sim.unit(a).unwrap().orders.is_empty());
        assert!(sim
            .events()
            .events()
            .iter()
            .any(|e| matches!(e.kind, SimEventKind::OrderRejected { .. })));
    }

    #[test]
    fn test_victory_when_enemies_gone() {
        let mut sim = sim();
        sim.spawn("rifleman", Side(0), Vec2::new(2.5, 2.5), Posture::Standing).unwrap();
        let enemy = sim.spawn("rifleman", Side(1), Vec2::new(60.5, 60.5), Posture::Standing).unwrap();
        sim.begin_battle().unwrap();
        sim.submit(Command::Despawn { unit: enemy }).unwrap();
        sim.tick().unwrap();
        assert_eq!(sim.phase(), Phase::Victory(Side(0)));
    }

    #[test]
    fn test_frame_runs_due_ticks() {
        let mut sim = sim();
        let outcomes = sim.frame(Duration::from_millis(120)).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(sim.current_tick(), 2);
        assert!((sim.frame_alpha() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_terrain_with_zero_cell_size_refused() {
        let result = Simulation::new(
            SimulationConfig::default(),
            Content::standard().unwrap(),
            TerrainGrid::open(8, 8, 0.0),
            1,
        );
        assert!(matches!(result, Err(SimError::Configuration(ConfigError::InvalidSetting(_)))));
    }

    #[test]
    fn test_duplicate_command_key_refused() {
        let mut sim = sim();
        let a = sim.spawn("rifleman", Side(0), Vec2::new(2.5, 2.5), Posture::Standing).unwrap();
        let first = ScheduledCommand::new(0, 1, 0, Command::Despawn { unit: a });
        sim.apply_remote_order(first.clone()).unwrap();
        assert!(matches!(
            sim.apply_remote_order(first),
            Err(SimError::DuplicateCommand { tick: 0, player: 1, seq: 0 })
        ));
        assert_eq!(sim.command_log().len(), 1);
    }

    #[test]
    fn test_local_commands_never_replace_remote_ones() {
        let mut sim = sim();
        let a = sim.spawn("rifleman", Side(0), Vec2::new(2.5, 2.5), Posture::Standing).unwrap();
        let b = sim.spawn("rifleman", Side(0), Vec2::new(8.5, 2.5), Posture::Standing).unwrap();
        let c = sim.spawn("rifleman", Side(0), Vec2::new(14.5, 2.5), Posture::Standing).unwrap();
        sim.apply_remote_order(ScheduledCommand::new(0, 0, 0, Command::Despawn { unit: a })).unwrap();
        sim.apply_remote_order(ScheduledCommand::new(0, LOCAL_PLAYER, 0, Command::Despawn { unit: b }))
            .unwrap();
        // Local seq 0 is taken; the submit moves on to the next free one
        sim.submit(Command::Despawn { unit: c }).unwrap();
        assert_eq!(sim.command_log().len(), 3);

        sim.tick().unwrap();
        assert!(sim.units().is_empty());
    }

    #[test]
    fn test_embark_waits_for_committed_gesture() {
        let mut sim = sim();
        let rifleman = sim.spawn("rifleman", Side(0), Vec2::new(5.5, 5.5), Posture::Standing).unwrap();
        let tank = sim.spawn("light_tank", Side(0), Vec2::new(7.5, 5.5), Posture::Standing).unwrap();
        sim.unit_mut(rifleman).unwrap().gesture = Gesture::Reloading { end_tick: 50 };

        sim.submit(Command::Embark { unit: rifleman, vehicle: tank }).unwrap();
        sim.tick().unwrap();

        let unit = sim.unit(rifleman).unwrap();
        assert_eq!(unit.gesture, Gesture::Reloading { end_tick: 50 });
        assert!(unit.mounted_in.is_none());
        assert!(sim.unit(tank).unwrap().crew.as_ref().unwrap().occupants.is_empty());
    }

    #[test]
    fn test_hash_history_is_windowed() {
        let config = SimulationConfig {
            record_hashes: true,
            hash_history: 5,
            ..SimulationConfig::default()
        };
        let mut sim = Simulation::new(config, Content::standard().unwrap(), TerrainGrid::open(16, 16, 1.0), 3).unwrap();
        sim.run(20).unwrap();
        let ticks: Vec<Tick> = sim.recorded_hashes().keys().copied().collect();
        assert_eq!(ticks, vec![16, 17, 18, 19, 20]);
    }

    #[test]
    fn test_drained_events_leave_the_log_and_new_ones_arrive() {
        let mut sim = sim();
        sim.spawn("rifleman", Side(0), Vec2::new(2.5, 2.5), Posture::Standing).unwrap();
        sim.submit(Command::BeginBattle).unwrap();
        sim.tick().unwrap();

        let drained = sim.drain_events();
        assert!(drained.iter().any(|e| matches!(e.kind, SimEventKind::PhaseChanged { .. })));
        assert!(sim.events().is_empty());

        sim.submit(Command::Explosion {
            position: Vec2::new(40.5, 40.5),
            radius: 1.0,
            damage: 0,
            threat: 0.0,
        })
        .unwrap();
        sim.tick().unwrap();
        assert!(sim
            .events()
            .events()
            .iter()
            .any(|e| matches!(e.kind, SimEventKind::Explosion { .. })));
    }

    #[test]
    fn test_fire_at_position_empties_magazine() {
        let mut sim = Simulation::new(
            SimulationConfig::default(),
            Content::standard().unwrap(),
            TerrainGrid::open(128, 16, 1.0),
            5,
        )
        .unwrap();
        let u = sim.spawn("rifleman", Side(0), Vec2::new(2.5, 2.5), Posture::Standing).unwrap();
        sim.spawn("rifleman", Side(1), Vec2::new(120.5, 2.5), Posture::Standing).unwrap();
        sim.begin_battle().unwrap();

        sim.issue(u, Order::fire_at(Vec2::new(22.5, 2.5), 0)).unwrap();
        sim.run(200).unwrap();

        let events = sim.events().events();
        let shots = events
            .iter()
            .filter(|e| matches!(e.kind, SimEventKind::WeaponDischarged { unit, .. } if unit == u))
            .count();
        assert_eq!(shots, 5);
        assert_eq!(sim.unit(u).unwrap().ammo.loaded, 0);
        assert!(events.iter().any(|e| matches!(
            e.kind,
            SimEventKind::OrderCompleted { unit, order: OrderType::FireAtPosition } if unit == u
        )));
    }

    #[test]
    fn test_remote_hash_verification() {
        let mut config = SimulationConfig::default();
        config.record_hashes = true;
        let mut sim = Simulation::new(config, Content::standard().unwrap(), TerrainGrid::open(16, 16, 1.0), 3).unwrap();
        let outcome = sim.tick().unwrap();
        let hash = outcome.hash.unwrap();

        assert!(sim.verify_remote_hash(1, hash).is_ok());
        assert!(matches!(sim.verify_remote_hash(1, hash ^ 1), Err(SimError::Desync { tick: 1, .. })));
        assert!(matches!(sim.verify_remote_hash(9, hash), Err(SimError::HashUnavailable(9))));
    }
}
