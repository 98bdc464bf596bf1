//! Spawn system - places pedestrians ahead of the hero on a jittered timer.

use bevy_ecs::prelude::*;
use glam::Vec3;
use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, warn};

use crate::components::*;
use crate::config::PedestrianArchetype;
use crate::ecs::{Group, SimContext, Simulation, Store, System};
use crate::error::StoreError;
use crate::outbox::{Outbox, PhysicsCommand};
use crate::params::SpawnSettings;
use crate::systems::{ActivePedestrians, HeroFilter};

/// Pick a spawnable archetype with probability proportional to its weight.
pub fn pick_archetype<'a>(
    archetypes: &'a [PedestrianArchetype],
    rng: &mut StdRng,
) -> Option<&'a PedestrianArchetype> {
    let total: f32 = archetypes
        .iter()
        .filter(|a| a.is_spawnable())
        .map(|a| a.weight)
        .sum();
    if total <= 0.0 {
        return None;
    }

    let mut roll = rng.random::<f32>() * total;
    for archetype in archetypes.iter().filter(|a| a.is_spawnable()) {
        if roll < archetype.weight {
            return Some(archetype);
        }
        roll -= archetype.weight;
    }
    // Float rounding can leave the roll a hair past the last bucket
    archetypes.iter().rev().find(|a| a.is_spawnable())
}

/// Create a pedestrian in the simulation store and ask the host for a body.
///
/// `crossing` starts the pedestrian walking toward the opposite sidewalk.
pub fn spawn_pedestrian(
    sim: &mut Store<Simulation>,
    outbox: &mut Outbox,
    kind: PedestrianKind,
    position: Vec3,
    mass: f32,
    crossing: Option<CrossingState>,
) -> Result<Entity, StoreError> {
    let entity = sim.create_entity();
    sim.add(entity, PedestrianTag)?;
    sim.add(entity, kind)?;
    sim.add(entity, WorldPosition(position))?;
    sim.add(entity, PedestrianBody { mass })?;

    let facing = match crossing {
        Some(state) if state.moving_right => Facing::Right,
        Some(_) => Facing::Left,
        None => Facing::Forward,
    };
    sim.add(entity, facing)?;
    if let Some(state) = crossing {
        sim.add(entity, state)?;
    }

    sim.add(entity, BodyLink)?;
    if let Some(id) = sim.identity(entity) {
        outbox.physics(PhysicsCommand::SpawnBody { id, kind, position });
    }
    Ok(entity)
}

/// Spawns one pedestrian each time the countdown runs out, while the active
/// count is below the day's cap and a hero exists.
pub struct SpawnSystem {
    settings: SpawnSettings,
    countdown: f32,
    active: Group<Simulation, ActivePedestrians>,
    hero: Group<Simulation, HeroFilter>,
}

impl SpawnSystem {
    pub fn new(settings: SpawnSettings, sim: &mut Store<Simulation>) -> Self {
        Self {
            settings,
            countdown: 0.0,
            active: sim.group(),
            hero: sim.group(),
        }
    }

    fn draw_interval(&self, rng: &mut StdRng) -> f32 {
        let (min, max) = (self.settings.min_interval, self.settings.max_interval);
        if max <= min {
            min
        } else {
            rng.random_range(min..=max)
        }
    }

    fn draw_between(rng: &mut StdRng, min: f32, max: f32) -> f32 {
        if max <= min {
            min
        } else {
            rng.random_range(min..=max)
        }
    }

    fn try_spawn(&mut self, ctx: &mut SimContext<'_>) {
        let active = self.active.count(ctx.sim);
        if active >= self.settings.max_active {
            debug!(active, cap = self.settings.max_active, "spawn_skipped_cap");
            return;
        }
        let Some(hero) = self.hero.first(ctx.sim) else {
            debug!("spawn_skipped_no_hero");
            return;
        };
        let Some(hero_pos) = ctx.sim.get::<WorldPosition>(hero).copied() else {
            return;
        };
        let Some(archetype) = pick_archetype(&self.settings.archetypes, ctx.rng) else {
            debug!("spawn_skipped_no_archetype");
            return;
        };
        let (kind, mass) = (archetype.kind, archetype.mass);

        let road = &self.settings.road;
        let ahead = Self::draw_between(
            ctx.rng,
            self.settings.spawn_ahead_min,
            self.settings.spawn_ahead_max,
        );
        let z = hero_pos.longitudinal() + ahead;

        let crosses = ctx.rng.random::<f32>() < self.settings.crossing_chance;
        let (x, crossing) = if crosses {
            let from_left = ctx.rng.random::<bool>();
            let start_x = if from_left {
                -road.sidewalk_offset
            } else {
                road.sidewalk_offset
            };
            let state = CrossingState {
                start_x,
                target_x: -start_x,
                speed: self.settings.crossing_speed,
                moving_right: from_left,
            };
            (start_x, Some(state))
        } else {
            let band = road.half_width - road.lane_margin;
            (Self::draw_between(ctx.rng, -band, band), None)
        };

        let position = Vec3::new(x, hero_pos.0.y, z);
        match spawn_pedestrian(ctx.sim, ctx.outbox, kind, position, mass, crossing) {
            Ok(entity) => debug!(
                id = ctx.sim.identity(entity).unwrap_or_default(),
                kind = kind.as_str(),
                x,
                z,
                crossing = crosses,
                "pedestrian_spawned"
            ),
            Err(err) => warn!(error = %err, "pedestrian_spawn_failed"),
        }
    }
}

impl System for SpawnSystem {
    fn name(&self) -> &'static str {
        "spawn"
    }

    fn initialize(&mut self, ctx: &mut SimContext<'_>) -> crate::error::SimResult<()> {
        self.countdown = self.draw_interval(ctx.rng);
        Ok(())
    }

    fn execute(&mut self, ctx: &mut SimContext<'_>) {
        self.countdown -= ctx.clock.delta();
        if self.countdown > 0.0 {
            return;
        }
        self.countdown = self.draw_interval(ctx.rng);
        self.try_spawn(ctx);
    }
}
