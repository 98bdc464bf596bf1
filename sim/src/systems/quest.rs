//! Quest systems - daily quest generation, hit counting and rewards.

use bevy_ecs::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::components::*;
use crate::config::RewardPolicy;
use crate::ecs::{Collector, CollectorTrigger, Group, Progress, SimContext, Simulation, Store, System};
use crate::error::SimResult;
use crate::outbox::Signal;
use crate::params::QuestSettings;
use crate::systems::economy;

type Quests = (With<ActiveQuest>, With<DailyQuest>);

// ============================================================================
// GENERATION
// ============================================================================

/// Replaces the previous day's quests with a fresh draw from the pool.
///
/// Templates are drawn without replacement, so the count is also bounded by
/// the pool size.
pub struct QuestGenerationSystem {
    settings: QuestSettings,
    quests: Group<Progress, With<DailyQuest>>,
    buffer: Vec<Entity>,
}

impl QuestGenerationSystem {
    pub fn new(settings: QuestSettings, progress: &mut Store<Progress>) -> Self {
        Self {
            settings,
            quests: progress.group(),
            buffer: Vec::new(),
        }
    }
}

impl System for QuestGenerationSystem {
    fn name(&self) -> &'static str {
        "quest_generation"
    }

    fn initialize(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        self.quests.snapshot(ctx.progress, &mut self.buffer);
        for &quest in &self.buffer {
            ctx.progress.destroy(quest);
        }

        let pool = &self.settings.pool;
        if pool.is_empty() {
            warn!("quest_pool_empty");
            return Ok(());
        }

        let (min, max) = (self.settings.min_count, self.settings.max_count);
        let count = if max <= min {
            max
        } else {
            ctx.rng.random_range(min..=max)
        };
        let count = (count as usize).min(pool.len());

        let mut order: Vec<usize> = (0..pool.len()).collect();
        order.shuffle(&mut *ctx.rng);

        for &index in order.iter().take(count) {
            let template = &pool[index];
            let required = if template.max_required <= template.min_required {
                template.min_required
            } else {
                ctx.rng
                    .random_range(template.min_required..=template.max_required)
            };
            let quest = DailyQuest {
                target_kind: template.target_kind,
                required_count: required.max(1),
                reward: template.reward,
            };

            let entity = ctx.progress.create_entity();
            ctx.progress.add(entity, quest)?;
            ctx.progress.add(entity, QuestProgress::default())?;
            ctx.progress.add(entity, QuestOverflow::default())?;
            ctx.progress.add(entity, ActiveQuest)?;
            debug!(
                kind = quest.target_kind.as_str(),
                required = quest.required_count,
                reward = quest.reward,
                "quest_generated"
            );
        }
        info!(count, "quests_generated");
        Ok(())
    }
}

// ============================================================================
// PROGRESS
// ============================================================================

/// Counts hit events toward matching quests and raises violations for hits on
/// the protected kind.
pub struct QuestProgressSystem {
    protected_kind: Option<PedestrianKind>,
    violation_penalty: u64,
    hit_events: Collector<Simulation, HitEvent>,
    quests: Group<Progress, Quests>,
    events: Vec<Entity>,
    buffer: Vec<Entity>,
}

impl QuestProgressSystem {
    pub fn new(
        protected_kind: Option<PedestrianKind>,
        violation_penalty: u64,
        sim: &mut Store<Simulation>,
        progress: &mut Store<Progress>,
    ) -> Self {
        Self {
            protected_kind,
            violation_penalty,
            hit_events: sim.collector(CollectorTrigger::Added),
            quests: progress.group(),
            events: Vec::new(),
            buffer: Vec::new(),
        }
    }

    fn raise_violation(&self, sim: &mut Store<Simulation>, hit: HitEvent) {
        let event = sim.create_event();
        let violation = ViolationEvent {
            kind: hit.kind,
            pedestrian_id: hit.pedestrian_id,
            penalty: self.violation_penalty,
        };
        if let Err(err) = sim.add(event, violation) {
            warn!(error = %err, "violation_event_failed");
        }
    }

    fn count_hit(&mut self, progress: &mut Store<Progress>, kind: PedestrianKind) {
        self.quests.snapshot(progress, &mut self.buffer);
        for &quest in &self.buffer {
            let Some(target) = progress.get::<DailyQuest>(quest).copied() else {
                continue;
            };
            if target.target_kind != kind {
                continue;
            }

            if progress.has::<QuestCompleted>(quest) {
                // Replace so the reward system sees the new extra
                let overflow = progress.get::<QuestOverflow>(quest).copied().unwrap_or_default();
                let bumped = QuestOverflow {
                    extra: overflow.extra.saturating_add(1),
                    ..overflow
                };
                if let Err(err) = progress.replace(quest, bumped) {
                    warn!(error = %err, "quest_overflow_failed");
                }
                continue;
            }

            let Some(mut counter) = progress.get_mut::<QuestProgress>(quest) else {
                continue;
            };
            counter.current_count = (counter.current_count + 1).min(target.required_count);
            let done = counter.current_count >= target.required_count;
            let current = counter.current_count;
            drop(counter);

            debug!(
                kind = kind.as_str(),
                current,
                required = target.required_count,
                "quest_progress"
            );
            if done {
                if let Err(err) = progress.add(quest, QuestCompleted) {
                    warn!(error = %err, "quest_complete_failed");
                }
            }
        }
    }
}

impl System for QuestProgressSystem {
    fn name(&self) -> &'static str {
        "quest_progress"
    }

    fn execute(&mut self, ctx: &mut SimContext<'_>) {
        self.hit_events.drain(ctx.sim, &mut self.events);
        let events = std::mem::take(&mut self.events);
        for &event in &events {
            let Some(hit) = ctx.sim.get::<HitEvent>(event).copied() else {
                continue;
            };
            if self.protected_kind == Some(hit.kind) {
                self.raise_violation(ctx.sim, hit);
            }
            self.count_hit(ctx.progress, hit.kind);
        }
        self.events = events;
    }
}

// ============================================================================
// REWARDS
// ============================================================================

/// Credits each completed quest once, plus per-extra bonuses when the reward
/// policy pays them.
pub struct QuestRewardSystem {
    policy: RewardPolicy,
    multiplier: f32,
    completed: Collector<Progress, QuestCompleted>,
    overflow: Collector<Progress, QuestOverflow>,
    buffer: Vec<Entity>,
}

impl QuestRewardSystem {
    pub fn new(policy: RewardPolicy, multiplier: f32, progress: &mut Store<Progress>) -> Self {
        Self {
            policy,
            multiplier,
            completed: progress.collector(CollectorTrigger::Added),
            overflow: progress.collector(CollectorTrigger::AddedOrReplaced),
            buffer: Vec::new(),
        }
    }

    fn pay_completions(&mut self, ctx: &mut SimContext<'_>) {
        self.completed.drain(ctx.progress, &mut self.buffer);
        for &quest in &self.buffer {
            let Some(target) = ctx.progress.get::<DailyQuest>(quest).copied() else {
                continue;
            };
            let quest_id = ctx.progress.identity(quest).unwrap_or_default();
            let paid = economy::credit(ctx.progress, ctx.outbox, target.reward, self.multiplier);
            info!(
                quest_id,
                kind = target.target_kind.as_str(),
                reward = paid,
                "quest_completed"
            );
            ctx.outbox.signal(Signal::QuestCompleted {
                quest_id,
                kind: target.target_kind,
                reward: paid,
            });
        }
    }

    fn pay_extras(&mut self, ctx: &mut SimContext<'_>) {
        self.overflow.drain(ctx.progress, &mut self.buffer);
        let RewardPolicy::BonusPerExtra { bonus } = self.policy else {
            return;
        };
        for &quest in &self.buffer {
            let Some(mut overflow) = ctx.progress.get_mut::<QuestOverflow>(quest) else {
                continue;
            };
            let unpaid = overflow.unpaid();
            overflow.paid = overflow.extra;
            drop(overflow);
            if unpaid > 0 {
                let amount = bonus.saturating_mul(u64::from(unpaid));
                economy::credit(ctx.progress, ctx.outbox, amount, self.multiplier);
            }
        }
    }
}

impl System for QuestRewardSystem {
    fn name(&self) -> &'static str {
        "quest_reward"
    }

    fn execute(&mut self, ctx: &mut SimContext<'_>) {
        self.pay_completions(ctx);
        self.pay_extras(ctx);
    }
}
