//! Persisted progress.
//!
//! The core reads money, day number and upgrade levels at day start and
//! writes them back at day end through an opaque key-value collaborator. It
//! owns no file or wire format; hosts plug in their own save backend.

use std::collections::HashMap;

pub const KEY_MONEY: &str = "money";
pub const KEY_DAY: &str = "day";
pub const KEY_MONEY_MULTIPLIER_LEVEL: &str = "upgrade.money_multiplier";

/// Key-value save backend.
pub trait ProgressPersistence {
    fn load(&self, key: &str) -> Option<u64>;
    fn store(&mut self, key: &str, value: u64);
}

/// In-memory backend, used by tests and hosts that save elsewhere.
#[derive(Debug, Clone, Default)]
pub struct MemoryPersistence {
    values: HashMap<String, u64>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, key: &str, value: u64) -> Self {
        self.values.insert(key.to_string(), value);
        self
    }
}

impl ProgressPersistence for MemoryPersistence {
    fn load(&self, key: &str) -> Option<u64> {
        self.values.get(key).copied()
    }

    fn store(&mut self, key: &str, value: u64) {
        self.values.insert(key.to_string(), value);
    }
}

/// Progress read at the start of a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedProgress {
    pub money: u64,
    pub day: u32,
    pub money_multiplier_level: u32,
}

impl SavedProgress {
    pub fn load(persistence: &dyn ProgressPersistence) -> Self {
        let day = persistence
            .load(KEY_DAY)
            .map(|d| u32::try_from(d).unwrap_or(u32::MAX))
            .unwrap_or(1)
            .max(1);
        let level = persistence
            .load(KEY_MONEY_MULTIPLIER_LEVEL)
            .map(|l| u32::try_from(l).unwrap_or(u32::MAX))
            .unwrap_or(0);
        Self {
            money: persistence.load(KEY_MONEY).unwrap_or(0),
            day,
            money_multiplier_level: level,
        }
    }
}
