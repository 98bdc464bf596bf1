//! Difficulty scaling.
//!
//! [`difficulty_for_day`] is a pure function of the day number. Quest count
//! and pedestrian cap step up every N days; spawn interval shrinks and
//! speed/crossing chance grow every day. Every field stops at its cap.

use serde::{Deserialize, Serialize};

use crate::config::DifficultyConfig;

/// Tunables for one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyLevel {
    pub day: u32,
    pub quest_count: u32,
    /// Seconds between spawns.
    pub spawn_interval: f32,
    pub speed_multiplier: f32,
    pub crossing_chance: f32,
    pub max_pedestrians: u32,
    pub is_milestone: bool,
    pub milestone_bonus: u64,
}

/// Compute the tunables for `day` (1-based; day 0 is treated as day 1).
pub fn difficulty_for_day(config: &DifficultyConfig, day: u32) -> DifficultyLevel {
    let day = day.max(1);
    let elapsed = day - 1;
    let elapsed_f = elapsed as f32;

    let quest_steps = elapsed / config.quest_count_step_days.max(1);
    let quest_count = config
        .base_quest_count
        .saturating_add(quest_steps)
        .min(config.max_quest_count);

    let spawn_interval = (config.base_spawn_interval - config.spawn_interval_step * elapsed_f)
        .max(config.min_spawn_interval);

    let speed_multiplier = (config.base_speed_multiplier + config.speed_step * elapsed_f)
        .min(config.max_speed_multiplier);

    let crossing_chance = (config.base_crossing_chance + config.crossing_step * elapsed_f)
        .min(config.max_crossing_chance);

    let pedestrian_steps = elapsed / config.pedestrian_step_days.max(1);
    let max_pedestrians = config
        .base_max_pedestrians
        .saturating_add(pedestrian_steps.saturating_mul(config.pedestrians_per_step))
        .min(config.pedestrian_cap);

    let is_milestone = config.milestone_every_days > 0 && day % config.milestone_every_days == 0;
    let milestone_bonus = if is_milestone {
        let index = u64::from(day / config.milestone_every_days);
        config.milestone_base_bonus.saturating_mul(index)
    } else {
        0
    };

    DifficultyLevel {
        day,
        quest_count,
        spawn_interval,
        speed_multiplier,
        crossing_chance,
        max_pedestrians,
        is_milestone,
        milestone_bonus,
    }
}
