//! Economy - the wallet ledger and violation penalties.
//!
//! All balance changes go through [`credit`] and [`apply_penalty`], which
//! keep the daily counters in step and announce every change. The balance
//! never drops below zero.

use bevy_ecs::prelude::*;
use tracing::{info, warn};

use crate::components::*;
use crate::ecs::{Collector, CollectorTrigger, Progress, SimContext, Simulation, Store, System};
use crate::error::SimResult;
use crate::outbox::{Outbox, Signal};
use crate::params::EconomySettings;

/// Install the wallet uniques. The balance is set to `starting_money`; the
/// daily counters start at zero.
pub fn ensure_ledger(progress: &mut Store<Progress>, starting_money: u64) {
    progress.set_unique(PlayerMoney {
        amount: starting_money,
    });
    progress.set_unique(EarnedThisDay::default());
    progress.set_unique(PenaltiesThisDay::default());
}

pub fn balance(progress: &Store<Progress>) -> u64 {
    progress.unique::<PlayerMoney>().map_or(0, |m| m.amount)
}

fn to_delta(amount: u64) -> i64 {
    i64::try_from(amount).unwrap_or(i64::MAX)
}

/// Add `base * multiplier` (rounded) to the balance and today's earnings.
/// Returns the amount credited.
pub fn credit(
    progress: &mut Store<Progress>,
    outbox: &mut Outbox,
    base: u64,
    multiplier: f32,
) -> u64 {
    let amount = (base as f64 * f64::from(multiplier.max(0.0))).round() as u64;
    if amount == 0 {
        return 0;
    }

    let Some(mut money) = progress.unique_mut::<PlayerMoney>() else {
        warn!(amount, "credit_without_wallet");
        return 0;
    };
    money.amount = money.amount.saturating_add(amount);
    let balance = money.amount;
    drop(money);

    if let Some(mut earned) = progress.unique_mut::<EarnedThisDay>() {
        earned.amount = earned.amount.saturating_add(amount);
    }
    outbox.signal(Signal::MoneyChanged {
        delta: to_delta(amount),
        balance,
    });
    amount
}

/// Charge `penalty`. The balance floors at zero while today's penalty total
/// records the full amount. Returns the amount actually deducted.
pub fn apply_penalty(progress: &mut Store<Progress>, outbox: &mut Outbox, penalty: u64) -> u64 {
    let Some(mut money) = progress.unique_mut::<PlayerMoney>() else {
        warn!(penalty, "penalty_without_wallet");
        return 0;
    };
    let deducted = penalty.min(money.amount);
    money.amount -= deducted;
    let balance = money.amount;
    drop(money);

    if let Some(mut penalties) = progress.unique_mut::<PenaltiesThisDay>() {
        penalties.amount = penalties.amount.saturating_add(penalty);
    }
    if deducted > 0 {
        outbox.signal(Signal::MoneyChanged {
            delta: -to_delta(deducted),
            balance,
        });
    }
    deducted
}

/// Sets up the wallet for the day, pays the milestone bonus and charges
/// violation penalties.
pub struct EconomySystem {
    settings: EconomySettings,
    violations: Collector<Simulation, ViolationEvent>,
    buffer: Vec<Entity>,
}

impl EconomySystem {
    pub fn new(settings: EconomySettings, sim: &mut Store<Simulation>) -> Self {
        Self {
            settings,
            violations: sim.collector(CollectorTrigger::Added),
            buffer: Vec::new(),
        }
    }
}

impl System for EconomySystem {
    fn name(&self) -> &'static str {
        "economy"
    }

    fn initialize(&mut self, ctx: &mut SimContext<'_>) -> SimResult<()> {
        ensure_ledger(ctx.progress, self.settings.starting_money);
        if self.settings.milestone_bonus > 0 {
            let paid = credit(ctx.progress, ctx.outbox, self.settings.milestone_bonus, 1.0);
            info!(bonus = paid, "milestone_bonus");
        }
        Ok(())
    }

    fn execute(&mut self, ctx: &mut SimContext<'_>) {
        self.violations.drain(ctx.sim, &mut self.buffer);
        for &event in &self.buffer {
            let Some(violation) = ctx.sim.get::<ViolationEvent>(event).copied() else {
                continue;
            };
            let penalty = violation.penalty;
            let deducted = apply_penalty(ctx.progress, ctx.outbox, penalty);
            info!(
                id = violation.pedestrian_id,
                kind = violation.kind.as_str(),
                penalty,
                deducted,
                "violation_penalty"
            );
            ctx.outbox.signal(Signal::Violation {
                id: violation.pedestrian_id,
                kind: violation.kind,
                penalty,
            });
        }
    }
}
