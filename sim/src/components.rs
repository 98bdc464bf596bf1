//! ECS Components for the lane runner simulation.
//!
//! Components are pure data containers attached to entities.
//! All game logic lives in systems that operate on these components through
//! the [`Store`](crate::ecs::Store).
//!
//! Axis convention: `x` is lateral (left/right across the road), `y` is up and
//! `z` is longitudinal (the direction the hero drives).

use bevy_ecs::prelude::*;
use glam::Vec3;
use serde::{Deserialize, Serialize};

// ============================================================================
// IDENTITY COMPONENTS
// ============================================================================

/// Immutable integer id attached to every entity created through a store.
///
/// Ids come from the shared [`IdGenerator`](crate::ecs::IdGenerator) and are
/// never reused, so they are safe to hand to external collaborators.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(u64);

impl Identity {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

// ============================================================================
// SPATIAL COMPONENTS
// ============================================================================

/// Position in world space, synced with the physics provider's transform.
#[derive(Component, Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldPosition(pub Vec3);

impl WorldPosition {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self(Vec3::new(x, y, z))
    }

    /// Longitudinal coordinate along the road.
    pub fn longitudinal(&self) -> f32 {
        self.0.z
    }

    pub fn distance_squared(&self, other: &WorldPosition) -> f32 {
        self.0.distance_squared(other.0)
    }
}

/// Linear velocity reported by the physics provider (hero only).
#[derive(Component, Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity(pub Vec3);

impl Velocity {
    pub fn speed(&self) -> f32 {
        self.0.length()
    }
}

/// Which way a pedestrian's body is turned.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Facing {
    #[default]
    Forward,
    Left,
    Right,
}

// ============================================================================
// ACTOR COMPONENTS
// ============================================================================

/// Marker for the player's vehicle. Spawn placement and despawn distances are
/// measured relative to it.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Hero;

/// Marker for pedestrian entities.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct PedestrianTag;

/// Pedestrian archetype.
#[derive(
    Component, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum PedestrianKind {
    Walker,
    Jogger,
    Cyclist,
    Elder,
    Child,
}

impl PedestrianKind {
    pub const ALL: [PedestrianKind; 5] = [
        PedestrianKind::Walker,
        PedestrianKind::Jogger,
        PedestrianKind::Cyclist,
        PedestrianKind::Elder,
        PedestrianKind::Child,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PedestrianKind::Walker => "Walker",
            PedestrianKind::Jogger => "Jogger",
            PedestrianKind::Cyclist => "Cyclist",
            PedestrianKind::Elder => "Elder",
            PedestrianKind::Child => "Child",
        }
    }
}

/// Lateral crossing in progress. Removed on arrival.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrossingState {
    pub start_x: f32,
    pub target_x: f32,
    /// Lateral speed in units per second.
    pub speed: f32,
    pub moving_right: bool,
}

impl CrossingState {
    /// True once `x` has reached or passed the target sidewalk.
    pub fn has_arrived(&self, x: f32) -> bool {
        if self.moving_right {
            x >= self.target_x
        } else {
            x <= self.target_x
        }
    }

    pub fn direction(&self) -> f32 {
        if self.moving_right {
            1.0
        } else {
            -1.0
        }
    }
}

/// The pedestrian is represented by a physics body and visual on the host.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct BodyLink;

/// Physical properties used by knockback.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PedestrianBody {
    pub mass: f32,
}

impl Default for PedestrianBody {
    fn default() -> Self {
        Self { mass: 70.0 }
    }
}

// ============================================================================
// HIT / RAGDOLL COMPONENTS
// ============================================================================

/// Terminal flag: the pedestrian has been struck. Set at most once.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Hit;

/// Knockback computed by the contact pipeline, delivered once the body has
/// been handed to unconstrained physics.
#[derive(Component, Debug, Clone, Copy, PartialEq, Default)]
pub struct PendingKnockback {
    pub impulse: Vec3,
    pub torque: Vec3,
}

/// One-frame event: a pedestrian was hit.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitEvent {
    pub kind: PedestrianKind,
    pub pedestrian_id: u64,
}

/// One-frame companion of [`HitEvent`] describing the impact.
#[derive(Component, Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CollisionImpact {
    pub force: f32,
    pub point: Vec3,
    pub normal: Vec3,
}

/// Ragdoll lifecycle timestamps in simulation seconds.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Ragdolled {
    pub hit_time: f32,
    pub despawn_time: f32,
}

impl Ragdolled {
    /// Alpha for the fade that runs over the final `fade_duration` seconds.
    pub fn alpha_at(&self, now: f32, fade_duration: f32) -> f32 {
        if now >= self.despawn_time {
            return 0.0;
        }
        if fade_duration <= 0.0 {
            return 1.0;
        }
        let fade_start = self.despawn_time - fade_duration;
        if now <= fade_start {
            1.0
        } else {
            ((self.despawn_time - now) / fade_duration).clamp(0.0, 1.0)
        }
    }

    pub fn is_expired(&self, now: f32) -> bool {
        now >= self.despawn_time
    }
}

/// Current fade alpha of a ragdoll (1 = opaque).
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct RagdollFade {
    pub alpha: f32,
}

impl Default for RagdollFade {
    fn default() -> Self {
        Self { alpha: 1.0 }
    }
}

/// One-frame event: a protected pedestrian was hit.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViolationEvent {
    pub kind: PedestrianKind,
    pub pedestrian_id: u64,
    pub penalty: u64,
}

// ============================================================================
// QUEST COMPONENTS (progress store)
// ============================================================================

/// A quest drawn for the current day.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyQuest {
    pub target_kind: PedestrianKind,
    pub required_count: u32,
    pub reward: u64,
}

/// Hits counted toward a quest. Never exceeds `required_count`.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuestProgress {
    pub current_count: u32,
}

/// Matching hits landed after the quest was already complete.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuestOverflow {
    pub extra: u32,
    /// Extras already paid out as bonus.
    pub paid: u32,
}

impl QuestOverflow {
    pub fn unpaid(&self) -> u32 {
        self.extra.saturating_sub(self.paid)
    }
}

/// Marker: quest belongs to today's set.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct ActiveQuest;

/// Marker: quest requirement met. Sticky for the day.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct QuestCompleted;

// ============================================================================
// ECONOMY COMPONENTS (progress store, unique)
// ============================================================================

/// Persistent wallet balance.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerMoney {
    pub amount: u64,
}

/// Money credited during the current day.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EarnedThisDay {
    pub amount: u64,
}

/// Penalties charged during the current day (full amount, before flooring).
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PenaltiesThisDay {
    pub amount: u64,
}

/// The day currently being played (1-based).
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayNumber(pub u32);

impl Default for DayNumber {
    fn default() -> Self {
        Self(1)
    }
}

// ============================================================================
// INPUT COMPONENTS (input store)
// ============================================================================

/// A contact reported by the physics provider against the hero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// Identity of the other body.
    pub other_id: u64,
    pub relative_velocity: Vec3,
    pub point: Vec3,
    pub normal: Vec3,
}

/// Contacts waiting for the next fixed tick (unique in the input store).
#[derive(Component, Debug, Clone, Default)]
pub struct ContactQueue {
    pub contacts: Vec<Contact>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crossing_arrival() {
        let right = CrossingState {
            start_x: -5.0,
            target_x: 5.0,
            speed: 1.0,
            moving_right: true,
        };
        assert!(!right.has_arrived(4.9));
        assert!(right.has_arrived(5.0));

        let left = CrossingState {
            start_x: 5.0,
            target_x: -5.0,
            speed: 1.0,
            moving_right: false,
        };
        assert!(!left.has_arrived(-4.0));
        assert!(left.has_arrived(-5.5));
        assert_eq!(left.direction(), -1.0);
    }

    #[test]
    fn test_ragdoll_alpha_fades_over_final_window() {
        let ragdoll = Ragdolled {
            hit_time: 0.0,
            despawn_time: 5.0,
        };
        assert_eq!(ragdoll.alpha_at(1.0, 2.0), 1.0);
        assert_eq!(ragdoll.alpha_at(3.0, 2.0), 1.0);
        assert!((ragdoll.alpha_at(4.0, 2.0) - 0.5).abs() < 1e-5);
        assert_eq!(ragdoll.alpha_at(5.0, 2.0), 0.0);
        assert!(ragdoll.is_expired(5.0));
        assert!(!ragdoll.is_expired(4.99));
    }
}
