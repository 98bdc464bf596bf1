//! Per-day parameters.
//!
//! Difficulty is computed once when a day starts and folded together with
//! the static configuration into the settings each system is built with.

use serde::Serialize;

use crate::components::PedestrianKind;
use crate::config::{
    CollisionConfig, GameConfig, PedestrianArchetype, QuestTemplate, RagdollConfig,
    RewardPolicy, RoadLayout,
};
use crate::difficulty::{difficulty_for_day, DifficultyLevel};
use crate::persistence::SavedProgress;

/// Spawn, placement, motion and despawn settings for the day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpawnSettings {
    pub archetypes: Vec<PedestrianArchetype>,
    pub min_interval: f32,
    pub max_interval: f32,
    pub max_active: usize,
    pub crossing_chance: f32,
    /// Crossing speed with the day's speed multiplier applied.
    pub crossing_speed: f32,
    pub max_crossing_speed: f32,
    pub spawn_ahead_min: f32,
    pub spawn_ahead_max: f32,
    pub despawn_distance: f32,
    pub road: RoadLayout,
}

/// Quest generation settings for the day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestSettings {
    pub min_count: u32,
    pub max_count: u32,
    pub pool: Vec<QuestTemplate>,
    pub protected_kind: Option<PedestrianKind>,
    pub reward_policy: RewardPolicy,
}

/// Money rules for the day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EconomySettings {
    pub starting_money: u64,
    pub violation_penalty: u64,
    pub money_multiplier: f32,
    pub milestone_bonus: u64,
}

/// Everything a day is built from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayParameters {
    pub day: u32,
    pub day_duration: f32,
    pub fixed_timestep: f32,
    pub seed: u64,
    pub difficulty: DifficultyLevel,
    pub spawn: SpawnSettings,
    pub collision: CollisionConfig,
    pub ragdoll: RagdollConfig,
    pub quests: QuestSettings,
    pub economy: EconomySettings,
}

impl DayParameters {
    pub fn derive(config: &GameConfig, saved: &SavedProgress) -> Self {
        let difficulty = difficulty_for_day(&config.difficulty, saved.day);
        let spawn = &config.spawn;

        let jitter = spawn.interval_jitter.clamp(0.0, 0.99);
        let crossing_speed =
            (spawn.crossing_speed * difficulty.speed_multiplier).min(spawn.max_crossing_speed);

        let max_count = difficulty.quest_count;
        let min_count = config.quests.min_count.min(max_count);

        Self {
            day: difficulty.day,
            day_duration: config.timing.day_duration,
            fixed_timestep: config.timing.fixed_timestep,
            seed: config.timing.seed,
            spawn: SpawnSettings {
                archetypes: spawn.archetypes.clone(),
                min_interval: difficulty.spawn_interval * (1.0 - jitter),
                max_interval: difficulty.spawn_interval * (1.0 + jitter),
                max_active: difficulty.max_pedestrians as usize,
                crossing_chance: difficulty.crossing_chance,
                crossing_speed,
                max_crossing_speed: spawn.max_crossing_speed,
                spawn_ahead_min: spawn.spawn_ahead_min,
                spawn_ahead_max: spawn.spawn_ahead_max,
                despawn_distance: spawn.despawn_distance,
                road: spawn.road.clone(),
            },
            collision: config.collision.clone(),
            ragdoll: config.ragdoll.clone(),
            quests: QuestSettings {
                min_count,
                max_count,
                pool: config.quests.pool.clone(),
                protected_kind: config.quests.protected_kind,
                reward_policy: config.quests.reward_policy,
            },
            economy: EconomySettings {
                starting_money: saved.money,
                violation_penalty: config.economy.violation_penalty,
                money_multiplier: 1.0
                    + config.economy.multiplier_per_upgrade * saved.money_multiplier_level as f32,
                milestone_bonus: difficulty.milestone_bonus,
            },
            difficulty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn saved(day: u32) -> SavedProgress {
        SavedProgress {
            money: 100,
            day,
            money_multiplier_level: 3,
        }
    }

    #[test]
    fn test_spawn_window_follows_difficulty() {
        let config = GameConfig::default();
        let params = DayParameters::derive(&config, &saved(1));
        let interval = config.difficulty.base_spawn_interval;
        let jitter = config.spawn.interval_jitter;
        assert!((params.spawn.min_interval - interval * (1.0 - jitter)).abs() < 1e-5);
        assert!((params.spawn.max_interval - interval * (1.0 + jitter)).abs() < 1e-5);
        assert_eq!(
            params.spawn.max_active,
            config.difficulty.base_max_pedestrians as usize
        );
    }

    #[test]
    fn test_crossing_speed_is_clamped() {
        let mut config = GameConfig::default();
        config.spawn.crossing_speed = 2.9;
        config.spawn.max_crossing_speed = 3.0;
        let params = DayParameters::derive(&config, &saved(200));
        assert_eq!(params.spawn.crossing_speed, 3.0);
    }

    #[test]
    fn test_money_multiplier_from_upgrades() {
        let params = DayParameters::derive(&GameConfig::default(), &saved(1));
        assert!((params.economy.money_multiplier - 1.3).abs() < 1e-5);
        assert_eq!(params.economy.starting_money, 100);
    }
}
