//! Despawn system - removes pedestrians the hero has left behind.

use bevy_ecs::prelude::*;
use tracing::debug;

use crate::components::*;
use crate::ecs::{Group, SimContext, Simulation, Store, System};
use crate::systems::{remove_pedestrian, HeroFilter};

/// Destroys every pedestrian (hit or not) further than `despawn_distance`
/// behind the hero, asking the host to drop its body.
pub struct DespawnSystem {
    despawn_distance: f32,
    hero: Group<Simulation, HeroFilter>,
    pedestrians: Group<Simulation, With<PedestrianTag>>,
    buffer: Vec<Entity>,
}

impl DespawnSystem {
    pub fn new(despawn_distance: f32, sim: &mut Store<Simulation>) -> Self {
        Self {
            despawn_distance,
            hero: sim.group(),
            pedestrians: sim.group(),
            buffer: Vec::new(),
        }
    }
}

impl System for DespawnSystem {
    fn name(&self) -> &'static str {
        "despawn"
    }

    fn execute(&mut self, ctx: &mut SimContext<'_>) {
        let Some(hero_z) = self
            .hero
            .first(ctx.sim)
            .and_then(|hero| ctx.sim.get::<WorldPosition>(hero))
            .map(WorldPosition::longitudinal)
        else {
            return;
        };
        let threshold = hero_z - self.despawn_distance;

        self.pedestrians.snapshot(ctx.sim, &mut self.buffer);
        let mut removed = 0usize;
        for &entity in &self.buffer {
            let behind = ctx
                .sim
                .get::<WorldPosition>(entity)
                .is_some_and(|pos| pos.longitudinal() < threshold);
            if behind && remove_pedestrian(ctx.sim, ctx.outbox, entity) {
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(removed, threshold, "pedestrians_despawned");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbox::PhysicsCommand;
    use crate::systems::test_support::Harness;
    use glam::Vec3;

    #[test]
    fn test_removes_only_pedestrians_far_behind() {
        let mut h = Harness::new();
        h.spawn_hero(Vec3::new(0.0, 0.0, 100.0));
        let behind = h.spawn_pedestrian(PedestrianKind::Walker, Vec3::new(0.0, 0.0, 60.0));
        let near = h.spawn_pedestrian(PedestrianKind::Walker, Vec3::new(0.0, 0.0, 75.0));
        let ahead = h.spawn_pedestrian(PedestrianKind::Walker, Vec3::new(0.0, 0.0, 140.0));
        let behind_id = h.sim.identity(behind).unwrap();
        h.outbox.clear();

        let mut system = DespawnSystem::new(30.0, &mut h.sim);
        h.run_execute(&mut system, 0.1);

        assert!(!h.sim.is_alive(behind));
        assert!(h.sim.is_alive(near));
        assert!(h.sim.is_alive(ahead));
        assert_eq!(
            h.outbox.pending_physics(),
            &[PhysicsCommand::RemoveBody { id: behind_id }]
        );
    }

    #[test]
    fn test_hit_pedestrians_are_also_removed() {
        let mut h = Harness::new();
        h.spawn_hero(Vec3::new(0.0, 0.0, 100.0));
        let e = h.spawn_pedestrian(PedestrianKind::Elder, Vec3::new(0.0, 0.0, 10.0));
        h.sim.add(e, Hit).unwrap();

        let mut system = DespawnSystem::new(30.0, &mut h.sim);
        h.run_execute(&mut system, 0.1);
        assert!(!h.sim.is_alive(e));
    }

    #[test]
    fn test_no_hero_no_despawn() {
        let mut h = Harness::new();
        let e = h.spawn_pedestrian(PedestrianKind::Walker, Vec3::new(0.0, 0.0, -1000.0));
        let mut system = DespawnSystem::new(30.0, &mut h.sim);
        h.run_execute(&mut system, 0.1);
        assert!(h.sim.is_alive(e));
    }
}
