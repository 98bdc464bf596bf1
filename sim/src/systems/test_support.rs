//! Shared fixture for system unit tests.

use bevy_ecs::prelude::*;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::clock::SimClock;
use crate::components::*;
use crate::ecs::{IdGenerator, Input, Progress, SimContext, Simulation, Store, System};
use crate::outbox::Outbox;

pub struct Harness {
    pub sim: Store<Simulation>,
    pub progress: Store<Progress>,
    pub input: Store<Input>,
    pub clock: SimClock,
    pub rng: StdRng,
    pub outbox: Outbox,
}

impl Harness {
    pub fn new() -> Self {
        let ids = IdGenerator::new();
        let mut input = Store::new(ids.clone());
        input.set_unique(ContactQueue::default());
        Self {
            sim: Store::new(ids.clone()),
            progress: Store::new(ids),
            input,
            clock: SimClock::new(0.02),
            rng: StdRng::seed_from_u64(11),
            outbox: Outbox::default(),
        }
    }

    fn with_ctx<R>(&mut self, f: impl FnOnce(&mut SimContext<'_>) -> R) -> R {
        let mut ctx = SimContext {
            sim: &mut self.sim,
            progress: &mut self.progress,
            input: &mut self.input,
            clock: &self.clock,
            rng: &mut self.rng,
            outbox: &mut self.outbox,
        };
        f(&mut ctx)
    }

    pub fn run_initialize(&mut self, system: &mut dyn System) {
        self.with_ctx(|ctx| system.initialize(ctx))
            .expect("initialize failed");
    }

    pub fn run_execute(&mut self, system: &mut dyn System, dt: f32) {
        self.clock.advance(dt);
        self.with_ctx(|ctx| system.execute(ctx));
    }

    pub fn run_fixed(&mut self, system: &mut dyn System) {
        self.clock.advance_fixed();
        self.with_ctx(|ctx| system.fixed_execute(ctx));
    }

    pub fn run_cleanup(&mut self, system: &mut dyn System) {
        self.with_ctx(|ctx| system.cleanup(ctx));
    }

    pub fn spawn_hero(&mut self, position: Vec3) -> Entity {
        let hero = self.sim.create_entity();
        self.sim.add(hero, Hero).unwrap();
        self.sim.add(hero, WorldPosition(position)).unwrap();
        self.sim.add(hero, Velocity::default()).unwrap();
        hero
    }

    /// A bare pedestrian with a body link, standing still.
    pub fn spawn_pedestrian(&mut self, kind: PedestrianKind, position: Vec3) -> Entity {
        crate::systems::spawn_pedestrian(&mut self.sim, &mut self.outbox, kind, position, 70.0, None)
            .unwrap()
    }

    pub fn pedestrians(&mut self) -> Vec<Entity> {
        let mut group = self.sim.group::<With<PedestrianTag>>();
        let mut out = Vec::new();
        group.snapshot(&self.sim, &mut out);
        out
    }

    pub fn count<F: bevy_ecs::query::QueryFilter + 'static>(&mut self) -> usize {
        let mut group = self.sim.group::<F>();
        group.count(&self.sim)
    }
}
