//! Configuration for a day session.
//!
//! All tunables are plain data, immutable for the duration of a day. A
//! complete [`GameConfig`] can be built in code (every section implements
//! `Default`) or loaded from JSON with [`GameConfig::from_json`], in which case
//! every section must be present.

use serde::{Deserialize, Serialize};

use crate::components::PedestrianKind;
use crate::error::ConfigError;

/// Fixed timestep, day length and RNG seed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopConfig {
    /// Fixed timestep in seconds (e.g., 1/50 = 0.02 for 50 Hz).
    pub fixed_timestep: f32,
    /// Length of a day in seconds.
    pub day_duration: f32,
    pub seed: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            fixed_timestep: 1.0 / 50.0,
            day_duration: 120.0,
            seed: 42,
        }
    }
}

/// A spawnable pedestrian type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PedestrianArchetype {
    pub kind: PedestrianKind,
    /// Relative spawn weight. Zero disables the archetype.
    pub weight: f32,
    pub mass: f32,
    /// Archetypes without a visual are never spawned.
    pub has_visual: bool,
}

impl PedestrianArchetype {
    pub fn new(kind: PedestrianKind, weight: f32, mass: f32) -> Self {
        Self {
            kind,
            weight,
            mass,
            has_visual: true,
        }
    }

    pub fn is_spawnable(&self) -> bool {
        self.has_visual && self.weight > 0.0
    }
}

/// Lateral layout of the road, centered on x = 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadLayout {
    /// Distance from the center line to the curb.
    pub half_width: f32,
    /// Keep-out band inside each curb for stationary pedestrians.
    pub lane_margin: f32,
    /// Distance from the center line to each sidewalk.
    pub sidewalk_offset: f32,
}

impl Default for RoadLayout {
    fn default() -> Self {
        Self {
            half_width: 6.0,
            lane_margin: 1.0,
            sidewalk_offset: 7.5,
        }
    }
}

/// Pedestrian spawn, placement, motion and despawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnConfig {
    pub archetypes: Vec<PedestrianArchetype>,
    /// The day's spawn interval is widened to `interval * (1 ± jitter)`.
    pub interval_jitter: f32,
    /// Base lateral crossing speed, scaled by the day's speed multiplier.
    pub crossing_speed: f32,
    pub max_crossing_speed: f32,
    pub spawn_ahead_min: f32,
    pub spawn_ahead_max: f32,
    /// Pedestrians further than this behind the hero are removed.
    pub despawn_distance: f32,
    pub road: RoadLayout,
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            archetypes: vec![
                PedestrianArchetype::new(PedestrianKind::Walker, 4.0, 70.0),
                PedestrianArchetype::new(PedestrianKind::Jogger, 2.0, 65.0),
                PedestrianArchetype::new(PedestrianKind::Cyclist, 1.5, 90.0),
                PedestrianArchetype::new(PedestrianKind::Elder, 1.0, 60.0),
                PedestrianArchetype::new(PedestrianKind::Child, 1.0, 30.0),
            ],
            interval_jitter: 0.3,
            crossing_speed: 1.4,
            max_crossing_speed: 3.0,
            spawn_ahead_min: 40.0,
            spawn_ahead_max: 80.0,
            despawn_distance: 30.0,
            road: RoadLayout::default(),
        }
    }
}

/// Which collision strategy the day installs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CollisionMode {
    /// Contact records from the physics provider (primary).
    #[default]
    Contact,
    /// Hero/pedestrian distance check, for hosts without contact callbacks.
    Proximity,
}

/// Hit detection and knockback tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionConfig {
    pub mode: CollisionMode,
    /// Hit radius for the proximity strategy.
    pub hit_radius: f32,
    pub force_multiplier: f32,
    pub lift_multiplier: f32,
    pub min_speed_for_lift: f32,
    pub max_lift_speed: f32,
    /// Upper bound of each random torque component.
    pub max_torque: f32,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            mode: CollisionMode::Contact,
            hit_radius: 1.2,
            force_multiplier: 1.5,
            lift_multiplier: 0.6,
            min_speed_for_lift: 5.0,
            max_lift_speed: 25.0,
            max_torque: 2.0,
        }
    }
}

/// Ragdoll lifetime and pool cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagdollConfig {
    /// Seconds a ragdoll stays fully visible.
    pub despawn_delay: f32,
    /// Seconds of fade-out before removal.
    pub fade_duration: f32,
    pub max_active_ragdolls: usize,
}

impl Default for RagdollConfig {
    fn default() -> Self {
        Self {
            despawn_delay: 4.0,
            fade_duration: 1.5,
            max_active_ragdolls: 8,
        }
    }
}

/// A quest the generator can draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestTemplate {
    pub target_kind: PedestrianKind,
    pub min_required: u32,
    pub max_required: u32,
    pub reward: u64,
}

/// How quest rewards are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RewardPolicy {
    /// The reward drawn at generation time is all the quest ever pays.
    #[default]
    Fixed,
    /// Matching hits after completion pay `bonus` each.
    BonusPerExtra { bonus: u64 },
}

/// Daily quest generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestConfig {
    /// Lower bound of the daily quest count; the upper bound comes from difficulty.
    pub min_count: u32,
    pub pool: Vec<QuestTemplate>,
    /// Hitting this kind is a violation.
    pub protected_kind: Option<PedestrianKind>,
    pub reward_policy: RewardPolicy,
}

impl Default for QuestConfig {
    fn default() -> Self {
        Self {
            min_count: 1,
            pool: vec![
                QuestTemplate {
                    target_kind: PedestrianKind::Walker,
                    min_required: 3,
                    max_required: 6,
                    reward: 150,
                },
                QuestTemplate {
                    target_kind: PedestrianKind::Jogger,
                    min_required: 2,
                    max_required: 4,
                    reward: 200,
                },
                QuestTemplate {
                    target_kind: PedestrianKind::Cyclist,
                    min_required: 1,
                    max_required: 3,
                    reward: 250,
                },
                QuestTemplate {
                    target_kind: PedestrianKind::Elder,
                    min_required: 1,
                    max_required: 2,
                    reward: 300,
                },
            ],
            protected_kind: Some(PedestrianKind::Child),
            reward_policy: RewardPolicy::Fixed,
        }
    }
}

/// Money rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomyConfig {
    pub violation_penalty: u64,
    /// Reward multiplier gained per purchased multiplier upgrade level.
    pub multiplier_per_upgrade: f32,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            violation_penalty: 250,
            multiplier_per_upgrade: 0.1,
        }
    }
}

/// Bases, caps and step sizes for per-day scaling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyConfig {
    pub base_quest_count: u32,
    pub max_quest_count: u32,
    pub quest_count_step_days: u32,

    /// Seconds between spawns on day 1.
    pub base_spawn_interval: f32,
    pub min_spawn_interval: f32,
    /// Seconds removed from the interval per day.
    pub spawn_interval_step: f32,

    pub base_speed_multiplier: f32,
    pub max_speed_multiplier: f32,
    pub speed_step: f32,

    pub base_crossing_chance: f32,
    pub max_crossing_chance: f32,
    pub crossing_step: f32,

    pub base_max_pedestrians: u32,
    pub pedestrian_cap: u32,
    pub pedestrian_step_days: u32,
    pub pedestrians_per_step: u32,

    /// Every Nth day is a milestone. Zero disables milestones.
    pub milestone_every_days: u32,
    /// Bonus for the first milestone; the k-th milestone pays `k` times this.
    pub milestone_base_bonus: u64,
}

impl Default for DifficultyConfig {
    fn default() -> Self {
        Self {
            base_quest_count: 2,
            max_quest_count: 4,
            quest_count_step_days: 3,
            base_spawn_interval: 2.0,
            min_spawn_interval: 0.6,
            spawn_interval_step: 0.1,
            base_speed_multiplier: 1.0,
            max_speed_multiplier: 1.8,
            speed_step: 0.05,
            base_crossing_chance: 0.2,
            max_crossing_chance: 0.6,
            crossing_step: 0.03,
            base_max_pedestrians: 12,
            pedestrian_cap: 30,
            pedestrian_step_days: 2,
            pedestrians_per_step: 2,
            milestone_every_days: 5,
            milestone_base_bonus: 500,
        }
    }
}

/// Complete configuration for a session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GameConfig {
    pub timing: LoopConfig,
    pub spawn: SpawnConfig,
    pub collision: CollisionConfig,
    pub ragdoll: RagdollConfig,
    pub quests: QuestConfig,
    pub economy: EconomyConfig,
    pub difficulty: DifficultyConfig,
}

/// On-disk form: every section optional so absence can be reported.
#[derive(Debug, Deserialize)]
struct ConfigDocument {
    timing: Option<LoopConfig>,
    spawn: Option<SpawnConfig>,
    collision: Option<CollisionConfig>,
    ragdoll: Option<RagdollConfig>,
    quests: Option<QuestConfig>,
    economy: Option<EconomyConfig>,
    difficulty: Option<DifficultyConfig>,
}

fn require<T>(section: Option<T>, name: &'static str) -> Result<T, ConfigError> {
    section.ok_or(ConfigError::MissingSection(name))
}

fn ensure(condition: bool, field: &'static str, reason: &str) -> Result<(), ConfigError> {
    if condition {
        Ok(())
    } else {
        Err(ConfigError::invalid(field, reason))
    }
}

fn unit_interval(value: f32) -> bool {
    (0.0..=1.0).contains(&value)
}

impl GameConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let document: ConfigDocument = serde_json::from_str(text)?;
        let config = Self {
            timing: require(document.timing, "timing")?,
            spawn: require(document.spawn, "spawn")?,
            collision: require(document.collision, "collision")?,
            ragdoll: require(document.ragdoll, "ragdoll")?,
            quests: require(document.quests, "quests")?,
            economy: require(document.economy, "economy")?,
            difficulty: require(document.difficulty, "difficulty")?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Check ranges and cross-field consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.timing;
        ensure(t.fixed_timestep > 0.0, "timing.fixed_timestep", "must be positive")?;
        ensure(t.day_duration > 0.0, "timing.day_duration", "must be positive")?;

        let s = &self.spawn;
        ensure(
            s.archetypes.iter().all(|a| a.weight >= 0.0 && a.weight.is_finite()),
            "spawn.archetypes.weight",
            "weights must be finite and non-negative",
        )?;
        ensure(
            s.archetypes.iter().all(|a| a.mass > 0.0),
            "spawn.archetypes.mass",
            "must be positive",
        )?;
        ensure(
            (0.0..1.0).contains(&s.interval_jitter),
            "spawn.interval_jitter",
            "must be in [0, 1)",
        )?;
        ensure(s.crossing_speed >= 0.0, "spawn.crossing_speed", "must not be negative")?;
        ensure(
            s.max_crossing_speed >= s.crossing_speed,
            "spawn.max_crossing_speed",
            "must be at least crossing_speed",
        )?;
        ensure(
            s.spawn_ahead_min >= 0.0 && s.spawn_ahead_min <= s.spawn_ahead_max,
            "spawn.spawn_ahead_min",
            "must be non-negative and not above spawn_ahead_max",
        )?;
        ensure(s.despawn_distance > 0.0, "spawn.despawn_distance", "must be positive")?;
        ensure(
            s.road.half_width > s.road.lane_margin && s.road.lane_margin >= 0.0,
            "spawn.road.lane_margin",
            "must leave a drivable band inside the curbs",
        )?;
        ensure(
            s.road.sidewalk_offset > 0.0,
            "spawn.road.sidewalk_offset",
            "must be positive",
        )?;

        let c = &self.collision;
        ensure(c.hit_radius > 0.0, "collision.hit_radius", "must be positive")?;
        ensure(
            c.max_lift_speed > c.min_speed_for_lift,
            "collision.max_lift_speed",
            "must exceed min_speed_for_lift",
        )?;
        ensure(c.max_torque >= 0.0, "collision.max_torque", "must not be negative")?;

        let r = &self.ragdoll;
        ensure(r.despawn_delay >= 0.0, "ragdoll.despawn_delay", "must not be negative")?;
        ensure(r.fade_duration >= 0.0, "ragdoll.fade_duration", "must not be negative")?;
        ensure(
            r.max_active_ragdolls > 0,
            "ragdoll.max_active_ragdolls",
            "must be at least 1",
        )?;

        ensure(
            self.quests
                .pool
                .iter()
                .all(|q| q.min_required >= 1 && q.min_required <= q.max_required),
            "quests.pool.required",
            "min_required must be >= 1 and <= max_required",
        )?;

        let d = &self.difficulty;
        ensure(
            d.base_quest_count <= d.max_quest_count,
            "difficulty.base_quest_count",
            "must not exceed max_quest_count",
        )?;
        ensure(
            self.quests.min_count <= d.max_quest_count,
            "quests.min_count",
            "must not exceed difficulty.max_quest_count",
        )?;
        ensure(
            d.quest_count_step_days >= 1 && d.pedestrian_step_days >= 1,
            "difficulty.step_days",
            "must be at least 1",
        )?;
        ensure(
            d.min_spawn_interval > 0.0 && d.min_spawn_interval <= d.base_spawn_interval,
            "difficulty.min_spawn_interval",
            "must be positive and not above base_spawn_interval",
        )?;
        ensure(
            d.base_speed_multiplier > 0.0 && d.base_speed_multiplier <= d.max_speed_multiplier,
            "difficulty.base_speed_multiplier",
            "must be positive and not above max_speed_multiplier",
        )?;
        ensure(
            unit_interval(d.base_crossing_chance)
                && unit_interval(d.max_crossing_chance)
                && d.base_crossing_chance <= d.max_crossing_chance,
            "difficulty.crossing_chance",
            "must be probabilities with base <= max",
        )?;
        ensure(
            d.base_max_pedestrians <= d.pedestrian_cap,
            "difficulty.base_max_pedestrians",
            "must not exceed pedestrian_cap",
        )?;
        ensure(
            d.spawn_interval_step >= 0.0 && d.speed_step >= 0.0 && d.crossing_step >= 0.0,
            "difficulty.step",
            "steps must not be negative",
        )?;
        Ok(())
    }
}
