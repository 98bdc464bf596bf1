//! Reactive collectors.
//!
//! A [`Collector`] is a subscription handle on one store. The store buffers
//! every entity whose watched component was added (or replaced, depending on
//! the trigger); [`Collector::drain`] hands the buffer to the consumer once and
//! empties it, whether or not the consumer acts on it.

use std::marker::PhantomData;

use bevy_ecs::prelude::*;

use crate::ecs::store::{Partition, Store};

/// What kind of mutation wakes a collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorTrigger {
    /// Only when the component is attached to an entity that lacked it.
    Added,
    /// On attach and on every `replace`.
    AddedOrReplaced,
}

/// Subscription to changes of component `T` in partition `P`.
pub struct Collector<P: Partition, T: Component> {
    slot: usize,
    _marker: PhantomData<(fn() -> P, fn() -> T)>,
}

impl<P: Partition, T: Component> Collector<P, T> {
    pub(crate) fn new(slot: usize) -> Self {
        Self {
            slot,
            _marker: PhantomData,
        }
    }

    /// Move the pending entities into `out`. Entities destroyed, or stripped
    /// of `T`, since notification are skipped.
    pub fn drain(&self, store: &mut Store<P>, out: &mut Vec<Entity>) {
        store.drain_subscription(self.slot, out);
    }
}
