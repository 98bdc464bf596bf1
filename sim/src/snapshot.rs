//! Day state snapshots.
//!
//! A [`DaySnapshot`] is a serializable, read-only view of the day that a host
//! can render, log or inspect. Entries are ordered by identity.

use bevy_ecs::prelude::*;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::components::*;
use crate::ecs::{Progress, Simulation, Store};

/// Snapshot of the hero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeroSnapshot {
    pub id: u64,
    pub position: Vec3,
    pub speed: f32,
}

/// Snapshot of a single pedestrian.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PedestrianSnapshot {
    pub id: u64,
    pub kind: PedestrianKind,
    pub position: Vec3,
    pub facing: Facing,
    pub crossing: bool,
    pub hit: bool,
    /// Fade alpha while ragdolled, `None` otherwise.
    pub ragdoll_alpha: Option<f32>,
}

/// Snapshot of one of today's quests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestSnapshot {
    pub id: u64,
    pub target_kind: PedestrianKind,
    pub current_count: u32,
    pub required_count: u32,
    pub reward: u64,
    pub completed: bool,
    pub extra: u32,
}

/// Complete day state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DaySnapshot {
    pub day: u32,
    /// Variable ticks run so far.
    pub tick: u64,
    /// Elapsed simulation time in seconds.
    pub time: f32,
    pub remaining: f32,
    pub finished: bool,
    pub hero: Option<HeroSnapshot>,
    pub pedestrians: Vec<PedestrianSnapshot>,
    pub quests: Vec<QuestSnapshot>,
    pub money: u64,
    pub earned_today: u64,
    pub penalties_today: u64,
}

/// Timing fields copied into a snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct DayClock {
    pub day: u32,
    pub tick: u64,
    pub time: f32,
    pub remaining: f32,
    pub finished: bool,
}

impl DaySnapshot {
    pub fn capture(
        sim: &mut Store<Simulation>,
        progress: &mut Store<Progress>,
        clock: DayClock,
    ) -> Self {
        let world = sim.world_mut();

        let mut hero_query =
            world.query_filtered::<(&Identity, &WorldPosition, Option<&Velocity>), With<Hero>>();
        let hero = hero_query
            .iter(world)
            .next()
            .map(|(id, pos, vel)| HeroSnapshot {
                id: id.value(),
                position: pos.0,
                speed: vel.map_or(0.0, Velocity::speed),
            });

        let mut pedestrians = Vec::new();
        let mut query = world.query::<(
            &Identity,
            &PedestrianKind,
            &WorldPosition,
            Option<&Facing>,
            Option<&CrossingState>,
            Option<&Hit>,
            Option<&RagdollFade>,
        )>();
        for (id, kind, pos, facing, crossing, hit, fade) in query.iter(world) {
            pedestrians.push(PedestrianSnapshot {
                id: id.value(),
                kind: *kind,
                position: pos.0,
                facing: facing.copied().unwrap_or_default(),
                crossing: crossing.is_some(),
                hit: hit.is_some(),
                ragdoll_alpha: fade.map(|f| f.alpha),
            });
        }
        pedestrians.sort_by_key(|p| p.id);

        let money = progress.unique::<PlayerMoney>().map_or(0, |m| m.amount);
        let earned_today = progress.unique::<EarnedThisDay>().map_or(0, |m| m.amount);
        let penalties_today = progress.unique::<PenaltiesThisDay>().map_or(0, |m| m.amount);

        let world = progress.world_mut();
        let mut quests = Vec::new();
        let mut quest_query = world.query::<(
            &Identity,
            &DailyQuest,
            &QuestProgress,
            Option<&QuestOverflow>,
            Option<&QuestCompleted>,
        )>();
        for (id, quest, counter, overflow, completed) in quest_query.iter(world) {
            quests.push(QuestSnapshot {
                id: id.value(),
                target_kind: quest.target_kind,
                current_count: counter.current_count,
                required_count: quest.required_count,
                reward: quest.reward,
                completed: completed.is_some(),
                extra: overflow.map_or(0, |o| o.extra),
            });
        }
        quests.sort_by_key(|q| q.id);

        Self {
            day: clock.day,
            tick: clock.tick,
            time: clock.time,
            remaining: clock.remaining,
            finished: clock.finished,
            hero,
            pedestrians,
            quests,
            money,
            earned_today,
            penalties_today,
        }
    }

    pub fn active_pedestrians(&self) -> usize {
        self.pedestrians.iter().filter(|p| !p.hit).count()
    }

    /// Serialize snapshot to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize snapshot to pretty JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
