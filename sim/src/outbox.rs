//! Outbound queues toward external collaborators.
//!
//! The core never calls into the physics, presentation or audio layers.
//! It records what happened in an [`Outbox`]; the host drains it after each
//! frame.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::components::PedestrianKind;

/// Requests for the physics/render provider, in the order they were issued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PhysicsCommand {
    /// Create a body and visual for a new pedestrian.
    SpawnBody {
        id: u64,
        kind: PedestrianKind,
        position: Vec3,
    },
    /// Hand the body to unconstrained physics.
    ReleaseBody { id: u64 },
    ApplyImpulse { id: u64, impulse: Vec3, torque: Vec3 },
    SetAlpha { id: u64, alpha: f32 },
    RemoveBody { id: u64 },
}

/// End-of-day report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub day: u32,
    pub earned: u64,
    pub penalties: u64,
    pub balance: u64,
    pub quests_completed: usize,
    pub quests_total: usize,
}

/// One-way notifications for presentation, audio and UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Signal {
    Hit {
        id: u64,
        kind: PedestrianKind,
        force: f32,
        point: Vec3,
    },
    Violation {
        id: u64,
        kind: PedestrianKind,
        penalty: u64,
    },
    QuestCompleted {
        quest_id: u64,
        kind: PedestrianKind,
        reward: u64,
    },
    /// Balance changed by `delta` (negative for penalties).
    MoneyChanged { delta: i64, balance: u64 },
    DayFinished(DaySummary),
}

/// Queues filled by systems during a frame.
#[derive(Debug, Default)]
pub struct Outbox {
    physics: Vec<PhysicsCommand>,
    signals: Vec<Signal>,
}

impl Outbox {
    pub fn physics(&mut self, command: PhysicsCommand) {
        self.physics.push(command);
    }

    pub fn signal(&mut self, signal: Signal) {
        self.signals.push(signal);
    }

    pub fn pending_physics(&self) -> &[PhysicsCommand] {
        &self.physics
    }

    pub fn pending_signals(&self) -> &[Signal] {
        &self.signals
    }

    pub fn drain_physics(&mut self) -> Vec<PhysicsCommand> {
        std::mem::take(&mut self.physics)
    }

    pub fn drain_signals(&mut self) -> Vec<Signal> {
        std::mem::take(&mut self.signals)
    }

    pub fn clear(&mut self) {
        self.physics.clear();
        self.signals.clear();
    }
}
