//! Ragdoll system - converts hit pedestrians into timed, fading ragdolls.
//!
//! Conversion is reactive: every pedestrian that gained [`Hit`] since the
//! last tick is released to unconstrained physics, receives its pending
//! knockback and starts a despawn timer. The number of live ragdolls is
//! capped; the oldest one is evicted without a fade when the cap is hit.

use bevy_ecs::prelude::*;
use tracing::{debug, info, warn};

use crate::components::*;
use crate::config::RagdollConfig;
use crate::ecs::{Collector, CollectorTrigger, Group, SimContext, Simulation, Store, System};
use crate::outbox::PhysicsCommand;
use crate::systems::remove_pedestrian;

pub struct RagdollSystem {
    config: RagdollConfig,
    hits: Collector<Simulation, Hit>,
    ragdolls: Group<Simulation, (With<PedestrianTag>, With<Ragdolled>)>,
    victims: Vec<Entity>,
    buffer: Vec<Entity>,
}

impl RagdollSystem {
    pub fn new(config: RagdollConfig, sim: &mut Store<Simulation>) -> Self {
        Self {
            config,
            hits: sim.collector(CollectorTrigger::Added),
            ragdolls: sim.group(),
            victims: Vec::new(),
            buffer: Vec::new(),
        }
    }

    /// Remove ragdolls, oldest first, until one more fits under the cap.
    fn make_room(&mut self, ctx: &mut SimContext<'_>) {
        let cap = self.config.max_active_ragdolls.max(1);
        loop {
            self.ragdolls.snapshot(ctx.sim, &mut self.buffer);
            if self.buffer.len() < cap {
                return;
            }
            let oldest = self
                .buffer
                .iter()
                .copied()
                .filter_map(|e| ctx.sim.get::<Ragdolled>(e).map(|r| (e, r.hit_time)))
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(e, _)| e);
            let Some(oldest) = oldest else {
                return;
            };
            debug!(
                id = ctx.sim.identity(oldest).unwrap_or_default(),
                cap, "ragdoll_evicted"
            );
            remove_pedestrian(ctx.sim, ctx.outbox, oldest);
        }
    }

    fn convert(&mut self, ctx: &mut SimContext<'_>, entity: Entity) {
        if !ctx.sim.is_alive(entity) || ctx.sim.has::<Ragdolled>(entity) {
            return;
        }
        let Some(id) = ctx.sim.identity(entity) else {
            return;
        };

        // Nothing on the host can fall over; drop it right away
        if !ctx.sim.has::<BodyLink>(entity) {
            info!(id, "unrepresented_hit_destroyed");
            ctx.sim.destroy(entity);
            return;
        }

        self.make_room(ctx);

        let now = ctx.now();
        ctx.sim.remove::<CrossingState>(entity);
        let ragdoll = Ragdolled {
            hit_time: now,
            despawn_time: now + self.config.despawn_delay + self.config.fade_duration,
        };
        let attached = ctx
            .sim
            .replace(entity, ragdoll)
            .and_then(|_| ctx.sim.replace(entity, RagdollFade::default()));
        if let Err(err) = attached {
            warn!(id, error = %err, "ragdoll_convert_failed");
            return;
        }

        ctx.outbox.physics(PhysicsCommand::ReleaseBody { id });
        if let Some(knockback) = ctx.sim.remove::<PendingKnockback>(entity) {
            ctx.outbox.physics(PhysicsCommand::ApplyImpulse {
                id,
                impulse: knockback.impulse,
                torque: knockback.torque,
            });
        }
        debug!(id, despawn_time = ragdoll.despawn_time, "ragdoll_started");
    }

    fn age(&mut self, ctx: &mut SimContext<'_>) {
        let now = ctx.now();
        self.ragdolls.snapshot(ctx.sim, &mut self.buffer);
        for &entity in &self.buffer {
            let Some(ragdoll) = ctx.sim.get::<Ragdolled>(entity).copied() else {
                continue;
            };
            if ragdoll.is_expired(now) {
                remove_pedestrian(ctx.sim, ctx.outbox, entity);
                continue;
            }

            let alpha = ragdoll.alpha_at(now, self.config.fade_duration);
            let Some(id) = ctx.sim.identity(entity) else {
                continue;
            };
            let Some(mut fade) = ctx.sim.get_mut::<RagdollFade>(entity) else {
                continue;
            };
            if fade.alpha == alpha {
                continue;
            }
            fade.alpha = alpha;
            ctx.outbox.physics(PhysicsCommand::SetAlpha { id, alpha });
        }
    }
}

impl System for RagdollSystem {
    fn name(&self) -> &'static str {
        "ragdoll"
    }

    fn execute(&mut self, ctx: &mut SimContext<'_>) {
        self.hits.drain(ctx.sim, &mut self.victims);
        let victims = std::mem::take(&mut self.victims);
        for &entity in &victims {
            self.convert(ctx, entity);
        }
        self.victims = victims;

        self.age(ctx);
    }
}
