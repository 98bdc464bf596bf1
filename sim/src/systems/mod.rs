//! Day systems for the lane runner simulation.
//!
//! Systems run in a fixed, declared order every tick:
//!
//! 1. `spawn` - places pedestrians ahead of the hero
//! 2. `crossing_motion` - lateral crossing (fixed tick)
//! 3. `despawn` - removes pedestrians left behind
//! 4. `contact_collision` (fixed tick) or `proximity_collision`
//! 5. `ragdoll` - converts hits, fades and expires ragdolls
//! 6. `quest_generation` (initialize only), `quest_progress`, `quest_reward`
//! 7. `economy` - wallet setup, milestone bonus, violation penalties
//! 8. `event_cleanup` - recycles one-frame events (cleanup phase)

pub mod cleanup;
pub mod collision;
pub mod crossing;
pub mod despawn;
pub mod economy;
pub mod quest;
pub mod ragdoll;
pub mod spawn;

#[cfg(test)]
pub(crate) mod test_support;

pub use cleanup::EventCleanupSystem;
pub use collision::{
    knockback_impulse, random_torque, register_hit, ContactCollisionSystem,
    ProximityCollisionSystem,
};
pub use crossing::CrossingMotionSystem;
pub use despawn::DespawnSystem;
pub use economy::{apply_penalty, credit, EconomySystem};
pub use quest::{QuestGenerationSystem, QuestProgressSystem, QuestRewardSystem};
pub use ragdoll::RagdollSystem;
pub use spawn::{pick_archetype, spawn_pedestrian, SpawnSystem};

use bevy_ecs::prelude::*;

use crate::components::{BodyLink, Hero, Hit, PedestrianTag};
use crate::config::CollisionMode;
use crate::ecs::{Feature, Progress, Simulation, Store};
use crate::outbox::{Outbox, PhysicsCommand};
use crate::params::DayParameters;

/// Pedestrians that have not been hit.
pub type ActivePedestrians = (With<PedestrianTag>, Without<Hit>);

pub type HeroFilter = With<Hero>;

/// Destroy a pedestrian, asking the host to drop its body if it has one.
/// Returns false if the entity was already gone.
pub fn remove_pedestrian(sim: &mut Store<Simulation>, outbox: &mut Outbox, entity: Entity) -> bool {
    if sim.has::<BodyLink>(entity) {
        if let Some(id) = sim.identity(entity) {
            outbox.physics(PhysicsCommand::RemoveBody { id });
        }
    }
    sim.destroy(entity)
}

/// Compose the systems for one day. Exactly one collision strategy is
/// installed, chosen by the configured mode.
pub fn build_day_feature(
    params: &DayParameters,
    sim: &mut Store<Simulation>,
    progress: &mut Store<Progress>,
) -> Feature {
    let mut actors = Feature::new("actors")
        .with(SpawnSystem::new(params.spawn.clone(), sim))
        .with(CrossingMotionSystem::new(params.spawn.max_crossing_speed, sim))
        .with(DespawnSystem::new(params.spawn.despawn_distance, sim));
    match params.collision.mode {
        CollisionMode::Contact => {
            actors.add(ContactCollisionSystem::new(params.collision.clone(), sim))
        }
        CollisionMode::Proximity => {
            actors.add(ProximityCollisionSystem::new(params.collision.clone(), sim))
        }
    }
    actors.add(RagdollSystem::new(params.ragdoll.clone(), sim));

    let quests = &params.quests;
    let progression = Feature::new("progression")
        .with(QuestGenerationSystem::new(quests.clone(), progress))
        .with(QuestProgressSystem::new(
            quests.protected_kind,
            params.economy.violation_penalty,
            sim,
            progress,
        ))
        .with(QuestRewardSystem::new(
            quests.reward_policy,
            params.economy.money_multiplier,
            progress,
        ))
        .with(EconomySystem::new(params.economy.clone(), sim));

    Feature::new("day")
        .with(actors)
        .with(progression)
        .with(EventCleanupSystem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::ecs::IdGenerator;
    use crate::persistence::SavedProgress;

    fn params(mode: CollisionMode) -> DayParameters {
        let mut config = GameConfig::default();
        config.collision.mode = mode;
        let saved = SavedProgress {
            money: 0,
            day: 1,
            money_multiplier_level: 0,
        };
        DayParameters::derive(&config, &saved)
    }

    fn leaf_names(mode: CollisionMode) -> Vec<&'static str> {
        let ids = IdGenerator::new();
        let mut sim = Store::new(ids.clone());
        let mut progress = Store::new(ids);
        build_day_feature(&params(mode), &mut sim, &mut progress).leaf_names()
    }

    #[test]
    fn test_declared_order_with_contact_collision() {
        assert_eq!(
            leaf_names(CollisionMode::Contact),
            vec![
                "spawn",
                "crossing_motion",
                "despawn",
                "contact_collision",
                "ragdoll",
                "quest_generation",
                "quest_progress",
                "quest_reward",
                "economy",
                "event_cleanup",
            ]
        );
    }

    #[test]
    fn test_proximity_mode_replaces_contact_strategy() {
        let names = leaf_names(CollisionMode::Proximity);
        assert!(names.contains(&"proximity_collision"));
        assert!(!names.contains(&"contact_collision"));
    }
}
