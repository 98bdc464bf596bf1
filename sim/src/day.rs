//! Public API for running days.
//!
//! [`DayLoop`] owns the stores, the system composition and the day timer. A
//! host drives it with:
//!
//! 1. [`DayLoop::start_day`] and [`DayLoop::spawn_hero`]
//! 2. every physics step: [`DayLoop::push_contact`] for each contact, then
//!    [`DayLoop::fixed_update`]
//! 3. every frame: [`DayLoop::sync_transform`] for moved bodies, then
//!    [`DayLoop::update`]
//! 4. after each frame: [`DayLoop::drain_physics_commands`] and
//!    [`DayLoop::drain_signals`]
//!
//! ## Fixed Timestep
//!
//! Hosts without their own physics clock can call [`DayLoop::step`], which
//! accumulates time, runs as many fixed ticks as fit and then one variable
//! tick.
//!
//! ## Day end
//!
//! The first variable tick after the timer reaches zero freezes the day: it
//! runs a final cleanup, emits one [`Signal::DayFinished`] and writes money
//! and the next day number back to persistence. Further ticks are no-ops.

use bevy_ecs::prelude::*;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::clock::SimClock;
use crate::components::*;
use crate::config::{CollisionMode, GameConfig};
use crate::ecs::{Feature, IdGenerator, Input, Progress, SimContext, Simulation, Store, System};
use crate::error::{ConfigError, SimResult};
use crate::outbox::{DaySummary, Outbox, PhysicsCommand, Signal};
use crate::params::DayParameters;
use crate::persistence::{ProgressPersistence, SavedProgress, KEY_DAY, KEY_MONEY};
use crate::snapshot::{DayClock, DaySnapshot};
use crate::systems::{self, build_day_feature};

/// Lifecycle of the current day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayPhase {
    /// No day started yet.
    Idle,
    Running,
    /// Timer expired; the day is frozen until the next `start_day`.
    Finished,
}

/// Derive the RNG seed for one day from the session seed.
fn day_seed(seed: u64, day: u32) -> u64 {
    seed ^ u64::from(day).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// The day loop container.
pub struct DayLoop {
    config: GameConfig,
    persistence: Box<dyn ProgressPersistence>,
    sim: Store<Simulation>,
    progress: Store<Progress>,
    input: Store<Input>,
    clock: SimClock,
    rng: StdRng,
    outbox: Outbox,
    root: Feature,
    params: Option<DayParameters>,
    hero: Option<Entity>,
    phase: DayPhase,
    remaining: f32,
    /// Accumulated time for fixed timestep.
    time_accumulator: f32,
}

impl DayLoop {
    /// Validate `config` and create an idle loop.
    pub fn new(
        config: GameConfig,
        persistence: impl ProgressPersistence + 'static,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let ids = IdGenerator::new();
        Ok(Self {
            clock: SimClock::new(config.timing.fixed_timestep),
            rng: StdRng::seed_from_u64(config.timing.seed),
            config,
            persistence: Box::new(persistence),
            sim: Store::new(ids.clone()),
            progress: Store::new(ids.clone()),
            input: Store::new(ids),
            outbox: Outbox::default(),
            root: Feature::new("day"),
            params: None,
            hero: None,
            phase: DayPhase::Idle,
            remaining: 0.0,
            time_accumulator: 0.0,
        })
    }

    fn run<R>(&mut self, f: impl FnOnce(&mut Feature, &mut SimContext<'_>) -> R) -> R {
        let mut ctx = SimContext {
            sim: &mut self.sim,
            progress: &mut self.progress,
            input: &mut self.input,
            clock: &self.clock,
            rng: &mut self.rng,
            outbox: &mut self.outbox,
        };
        f(&mut self.root, &mut ctx)
    }

    /// Begin the next day from persisted progress.
    ///
    /// Actors and events from any previous day are discarded; money comes
    /// from persistence. A day that is still running is abandoned without
    /// writing progress.
    pub fn start_day(&mut self) -> SimResult<&DayParameters> {
        if self.phase == DayPhase::Running {
            warn!(day = self.day(), "day_abandoned");
        }

        let saved = SavedProgress::load(self.persistence.as_ref());
        let params = DayParameters::derive(&self.config, &saved);

        self.sim.clear();
        self.input.clear();
        self.progress.clear_subscriptions();
        self.outbox.clear();
        self.hero = None;

        self.clock = SimClock::new(params.fixed_timestep);
        self.rng = StdRng::seed_from_u64(day_seed(params.seed, params.day));
        self.input.set_unique(ContactQueue::default());
        self.progress.set_unique(DayNumber(params.day));
        self.root = build_day_feature(&params, &mut self.sim, &mut self.progress);
        self.remaining = params.day_duration;
        self.time_accumulator = 0.0;

        if let Err(err) = self.run(|root, ctx| root.initialize(ctx)) {
            self.phase = DayPhase::Idle;
            warn!(day = params.day, error = %err, "day_start_failed");
            return Err(err);
        }

        info!(
            day = params.day,
            duration = params.day_duration,
            quests = params.difficulty.quest_count,
            max_pedestrians = params.spawn.max_active,
            spawn_interval = params.difficulty.spawn_interval,
            milestone = params.difficulty.is_milestone,
            "day_started"
        );
        self.phase = DayPhase::Running;
        Ok(self.params.insert(params))
    }

    // ------------------------------------------------------------------------
    // Ticking
    // ------------------------------------------------------------------------

    /// One variable-rate tick.
    pub fn update(&mut self, dt: f32) {
        match self.phase {
            DayPhase::Idle => {
                debug!("update_before_day_start");
                return;
            }
            DayPhase::Finished => return,
            DayPhase::Running => {}
        }
        if self.remaining <= 0.0 {
            self.finish_day();
            return;
        }

        let dt = dt.max(0.0);
        self.remaining -= dt;
        self.clock.advance(dt);
        self.run(|root, ctx| {
            root.execute(ctx);
            root.cleanup(ctx);
        });
    }

    /// One fixed-rate tick.
    pub fn fixed_update(&mut self) {
        if !self.is_ticking() {
            return;
        }
        self.clock.advance_fixed();
        self.run(|root, ctx| root.fixed_execute(ctx));
    }

    /// Step forward by `dt` seconds: all fixed ticks that fit, then one
    /// variable tick.
    pub fn step(&mut self, dt: f32) {
        if self.is_ticking() {
            let fixed_dt = self.clock.fixed_delta();
            self.time_accumulator += dt.max(0.0);
            while self.time_accumulator >= fixed_dt {
                self.fixed_update();
                self.time_accumulator -= fixed_dt;
            }
        }
        self.update(dt);
    }

    /// Running with time left. Once the timer hits zero only the finishing
    /// variable tick may run.
    fn is_ticking(&self) -> bool {
        self.phase == DayPhase::Running && self.remaining > 0.0
    }

    fn finish_day(&mut self) {
        // Events raised by fixed ticks since the last frame
        self.run(|root, ctx| root.cleanup(ctx));
        self.phase = DayPhase::Finished;

        let day = self.day();
        let balance = self.money();
        let earned = self
            .progress
            .unique::<EarnedThisDay>()
            .map_or(0, |e| e.amount);
        let penalties = self
            .progress
            .unique::<PenaltiesThisDay>()
            .map_or(0, |p| p.amount);

        let mut quests = self.progress.group::<(With<ActiveQuest>, With<DailyQuest>)>();
        let mut completed = self
            .progress
            .group::<(With<ActiveQuest>, With<QuestCompleted>)>();
        let summary = DaySummary {
            day,
            earned,
            penalties,
            balance,
            quests_completed: completed.count(&self.progress),
            quests_total: quests.count(&self.progress),
        };

        self.persistence.store(KEY_MONEY, balance);
        self.persistence
            .store(KEY_DAY, u64::from(day).saturating_add(1));

        info!(
            day,
            earned,
            penalties,
            balance,
            quests_completed = summary.quests_completed,
            quests_total = summary.quests_total,
            "day_finished"
        );
        self.outbox.signal(Signal::DayFinished(summary));
    }

    // ------------------------------------------------------------------------
    // Host input
    // ------------------------------------------------------------------------

    /// Create the hero at `position`, or move it there if it already exists.
    /// Returns the hero's identity.
    pub fn spawn_hero(&mut self, position: Vec3) -> Option<u64> {
        if let Some(hero) = self.hero.filter(|e| self.sim.is_alive(*e)) {
            if let Some(mut pos) = self.sim.get_mut::<WorldPosition>(hero) {
                pos.0 = position;
            }
            return self.sim.identity(hero);
        }

        let hero = self.sim.create_entity();
        let added = self
            .sim
            .add(hero, Hero)
            .and_then(|_| self.sim.add(hero, WorldPosition(position)))
            .and_then(|_| self.sim.add(hero, Velocity::default()));
        if let Err(err) = added {
            warn!(error = %err, "hero_spawn_failed");
            self.sim.destroy(hero);
            return None;
        }
        self.hero = Some(hero);
        self.sim.identity(hero)
    }

    pub fn hero_id(&self) -> Option<u64> {
        self.hero.and_then(|hero| self.sim.identity(hero))
    }

    /// Place a pedestrian directly, bypassing the spawn timer and cap.
    pub fn spawn_pedestrian(
        &mut self,
        kind: PedestrianKind,
        position: Vec3,
        crossing: Option<CrossingState>,
    ) -> Option<u64> {
        let mass = self
            .config
            .spawn
            .archetypes
            .iter()
            .find(|a| a.kind == kind)
            .map_or_else(|| PedestrianBody::default().mass, |a| a.mass);
        match systems::spawn_pedestrian(&mut self.sim, &mut self.outbox, kind, position, mass, crossing)
        {
            Ok(entity) => self.sim.identity(entity),
            Err(err) => {
                warn!(error = %err, "pedestrian_spawn_failed");
                None
            }
        }
    }

    /// Copy a transform reported by the physics provider. Returns false for
    /// unknown ids.
    pub fn sync_transform(&mut self, id: u64, position: Vec3, velocity: Option<Vec3>) -> bool {
        let Some(entity) = self.sim.entity(id) else {
            return false;
        };
        if let Err(err) = self.sim.replace(entity, WorldPosition(position)) {
            warn!(id, error = %err, "transform_sync_failed");
            return false;
        }
        if let Some(velocity) = velocity {
            if let Err(err) = self.sim.replace(entity, Velocity(velocity)) {
                warn!(id, error = %err, "velocity_sync_failed");
            }
        }
        true
    }

    /// Queue a contact for the next fixed tick. Contacts are dropped when no
    /// day is running, the timer has expired, or the day uses proximity
    /// collision.
    pub fn push_contact(&mut self, contact: Contact) -> bool {
        if !self.is_ticking() {
            return false;
        }
        if self.config.collision.mode != CollisionMode::Contact {
            debug!(other = contact.other_id, "contact_ignored_proximity_mode");
            return false;
        }
        match self.input.unique_mut::<ContactQueue>() {
            Some(mut queue) => {
                queue.contacts.push(contact);
                true
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------------

    pub fn drain_physics_commands(&mut self) -> Vec<PhysicsCommand> {
        self.outbox.drain_physics()
    }

    pub fn drain_signals(&mut self) -> Vec<Signal> {
        self.outbox.drain_signals()
    }

    /// Get a snapshot of the current day state.
    pub fn snapshot(&mut self) -> DaySnapshot {
        let clock = DayClock {
            day: self.day(),
            tick: self.clock.tick(),
            time: self.clock.now(),
            remaining: self.remaining_time(),
            finished: self.is_finished(),
        };
        DaySnapshot::capture(&mut self.sim, &mut self.progress, clock)
    }

    /// Get the snapshot as a JSON string.
    pub fn snapshot_json(&mut self) -> String {
        self.snapshot()
            .to_json()
            .unwrap_or_else(|_| "{}".to_string())
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn phase(&self) -> DayPhase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        self.phase == DayPhase::Finished
    }

    /// Seconds left on the day timer, never negative.
    pub fn remaining_time(&self) -> f32 {
        self.remaining.max(0.0)
    }

    pub fn day(&self) -> u32 {
        self.progress.unique::<DayNumber>().map_or(1, |d| d.0)
    }

    pub fn money(&self) -> u64 {
        systems::economy::balance(&self.progress)
    }

    pub fn params(&self) -> Option<&DayParameters> {
        self.params.as_ref()
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn sim(&self) -> &Store<Simulation> {
        &self.sim
    }

    pub fn sim_mut(&mut self) -> &mut Store<Simulation> {
        &mut self.sim
    }

    pub fn progress(&self) -> &Store<Progress> {
        &self.progress
    }

    pub fn persistence(&self) -> &dyn ProgressPersistence {
        self.persistence.as_ref()
    }

    /// Leaf system names in execution order.
    pub fn system_names(&self) -> Vec<&'static str> {
        self.root.leaf_names()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryPersistence;

    fn short_day() -> GameConfig {
        let mut config = GameConfig::default();
        config.timing.day_duration = 2.0;
        config
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = GameConfig::default();
        config.timing.fixed_timestep = 0.0;
        assert!(DayLoop::new(config, MemoryPersistence::new()).is_err());
    }

    #[test]
    fn test_update_before_start_is_a_no_op() {
        let mut day = DayLoop::new(short_day(), MemoryPersistence::new()).unwrap();
        day.update(1.0);
        day.fixed_update();
        assert_eq!(day.phase(), DayPhase::Idle);
        assert!(day.drain_signals().is_empty());
    }

    #[test]
    fn test_day_finishes_once_and_persists() {
        let persistence = MemoryPersistence::new().with_value(KEY_MONEY, 300);
        let mut day = DayLoop::new(short_day(), persistence).unwrap();
        day.start_day().unwrap();
        day.spawn_hero(Vec3::ZERO);

        for _ in 0..5 {
            day.update(1.0);
        }
        assert!(day.is_finished());
        assert_eq!(day.remaining_time(), 0.0);

        let finished: Vec<_> = day
            .drain_signals()
            .into_iter()
            .filter(|s| matches!(s, Signal::DayFinished(_)))
            .collect();
        assert_eq!(finished.len(), 1);
        assert_eq!(day.persistence().load(KEY_MONEY), Some(300));
        assert_eq!(day.persistence().load(KEY_DAY), Some(2));

        // Next day picks up the written day number
        let params = day.start_day().unwrap();
        assert_eq!(params.day, 2);
        assert!(!day.is_finished());
    }

    #[test]
    fn test_step_runs_fixed_ticks_then_one_variable_tick() {
        let mut config = short_day();
        config.timing.fixed_timestep = 0.25;
        let mut day = DayLoop::new(config, MemoryPersistence::new()).unwrap();
        day.start_day().unwrap();
        day.step(1.0);
        assert_eq!(day.clock().tick(), 1);
        assert_eq!(day.clock().fixed_tick(), 4);
        day.step(0.1);
        assert_eq!(day.clock().fixed_tick(), 4);
    }

    #[test]
    fn test_contacts_dropped_in_proximity_mode() {
        let mut config = short_day();
        config.collision.mode = CollisionMode::Proximity;
        let mut day = DayLoop::new(config, MemoryPersistence::new()).unwrap();
        day.start_day().unwrap();
        let contact = Contact {
            other_id: 1,
            relative_velocity: Vec3::Z,
            point: Vec3::ZERO,
            normal: Vec3::Z,
        };
        assert!(!day.push_contact(contact));
        assert!(day.system_names().contains(&"proximity_collision"));
    }

    #[test]
    fn test_spawn_hero_is_idempotent() {
        let mut day = DayLoop::new(short_day(), MemoryPersistence::new()).unwrap();
        day.start_day().unwrap();
        let first = day.spawn_hero(Vec3::ZERO);
        let second = day.spawn_hero(Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(first, second);
        assert_eq!(
            day.snapshot().hero.map(|h| h.position),
            Some(Vec3::new(0.0, 0.0, 5.0))
        );
    }
}
