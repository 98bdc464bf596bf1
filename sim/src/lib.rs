//! Lane Runner - Simulation Core
//!
//! A deterministic day-session simulation for a vehicular lane runner: the
//! hero drives down a road, pedestrians spawn ahead of it, hits turn them into
//! ragdolls, daily quests count hits and pay out money, and difficulty grows
//! with each day. Uses `bevy_ecs` for entity storage.
//!
//! Physics, rendering and audio stay with the host. The core consumes
//! transforms and contacts and emits [`PhysicsCommand`]s and [`Signal`]s.

pub mod clock;
pub mod components;
pub mod config;
pub mod day;
pub mod difficulty;
pub mod ecs;
pub mod error;
pub mod outbox;
pub mod params;
pub mod persistence;
pub mod snapshot;
pub mod systems;

pub use clock::SimClock;
pub use components::*;
pub use config::{CollisionMode, GameConfig, RewardPolicy};
pub use day::{DayLoop, DayPhase};
pub use difficulty::{difficulty_for_day, DifficultyLevel};
pub use error::{ConfigError, SimError, SimResult, StoreError};
pub use outbox::{DaySummary, Outbox, PhysicsCommand, Signal};
pub use params::DayParameters;
pub use persistence::{MemoryPersistence, ProgressPersistence, SavedProgress};
pub use snapshot::DaySnapshot;
