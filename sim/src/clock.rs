//! Simulation time source.
//!
//! One monotonic simulation time (`now`) advances with the variable-rate
//! tick. Fixed ticks use a constant step and only advance their own counter,
//! so ragdoll and fade timestamps never mix two time bases.

/// Tracks simulation time for both ticking regimes.
#[derive(Debug, Clone)]
pub struct SimClock {
    now: f32,
    delta: f32,
    fixed_delta: f32,
    tick: u64,
    fixed_tick: u64,
}

impl SimClock {
    pub fn new(fixed_delta: f32) -> Self {
        Self {
            now: 0.0,
            delta: 0.0,
            fixed_delta,
            tick: 0,
            fixed_tick: 0,
        }
    }

    /// Advance by one variable-rate tick of `dt` seconds.
    pub fn advance(&mut self, dt: f32) -> u64 {
        self.delta = dt.max(0.0);
        self.now += self.delta;
        self.tick += 1;
        self.tick
    }

    /// Count one fixed tick.
    pub fn advance_fixed(&mut self) -> u64 {
        self.fixed_tick += 1;
        self.fixed_tick
    }

    /// Seconds of simulation time since the day started.
    pub fn now(&self) -> f32 {
        self.now
    }

    /// Duration of the current variable tick.
    pub fn delta(&self) -> f32 {
        self.delta
    }

    pub fn fixed_delta(&self) -> f32 {
        self.fixed_delta
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn fixed_tick(&self) -> u64 {
        self.fixed_tick
    }
}
