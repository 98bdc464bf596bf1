//! Crossing system - walks crossing pedestrians laterally on the fixed tick.

use bevy_ecs::prelude::*;
use tracing::trace;

use crate::components::*;
use crate::ecs::{Group, SimContext, Simulation, Store, System};

type Crossing = (With<PedestrianTag>, With<CrossingState>, Without<Hit>);

/// Moves `x` toward the target sidewalk at the crossing speed. On arrival the
/// pedestrian snaps to the target, stops crossing and faces forward.
pub struct CrossingMotionSystem {
    max_speed: f32,
    crossing: Group<Simulation, Crossing>,
    buffer: Vec<Entity>,
}

impl CrossingMotionSystem {
    pub fn new(max_speed: f32, sim: &mut Store<Simulation>) -> Self {
        Self {
            max_speed,
            crossing: sim.group(),
            buffer: Vec::new(),
        }
    }
}

impl System for CrossingMotionSystem {
    fn name(&self) -> &'static str {
        "crossing_motion"
    }

    fn fixed_execute(&mut self, ctx: &mut SimContext<'_>) {
        let dt = ctx.clock.fixed_delta();
        self.crossing.snapshot(ctx.sim, &mut self.buffer);

        for &entity in &self.buffer {
            let Some(state) = ctx.sim.get::<CrossingState>(entity).copied() else {
                continue;
            };
            let Some(x) = ctx.sim.get::<WorldPosition>(entity).map(|p| p.0.x) else {
                continue;
            };

            let speed = state.speed.min(self.max_speed);
            let mut next = x + state.direction() * speed * dt;
            let arrived = state.has_arrived(next);
            if arrived {
                next = state.target_x;
            }
            if let Some(mut pos) = ctx.sim.get_mut::<WorldPosition>(entity) {
                pos.0.x = next;
            }
            if !arrived {
                continue;
            }

            // Arrived: stand facing the road
            ctx.sim.remove::<CrossingState>(entity);
            if let Some(mut facing) = ctx.sim.get_mut::<Facing>(entity) {
                *facing = Facing::Forward;
            }
            trace!(
                id = ctx.sim.identity(entity).unwrap_or_default(),
                x = state.target_x,
                "crossing_finished"
            );
        }
    }
}
