//! Partitioned entity store.
//!
//! A [`Store`] owns one `bevy_ecs` [`World`] and routes every structural
//! mutation through notification-aware operations so that reactive
//! [`Collector`]s see exactly the additions and replacements they subscribed
//! to. Each store is typed by a [`Partition`] marker, so groups and collectors
//! built for one store cannot be used against another.

use std::any::{type_name, TypeId};
use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::rc::Rc;

use bevy_ecs::prelude::*;
use bevy_ecs::query::QueryFilter;

use crate::components::Identity;
use crate::ecs::collector::{Collector, CollectorTrigger};
use crate::ecs::group::Group;
use crate::error::StoreError;

/// Marker trait for store partitions.
pub trait Partition: 'static {
    const NAME: &'static str;
}

/// Actors (hero, pedestrians) and per-frame event entities.
pub enum Simulation {}

/// Quests and money; survives between frames and, for money, between days.
pub enum Progress {}

/// Single snapshot of inbound data (contacts) for the current tick.
pub enum Input {}

impl Partition for Simulation {
    const NAME: &'static str = "simulation";
}

impl Partition for Progress {
    const NAME: &'static str = "progress";
}

impl Partition for Input {
    const NAME: &'static str = "input";
}

/// Monotonically increasing id source shared by all stores of a session.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    next: Rc<Cell<u64>>,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next id. Ids start at 1 and are never reused.
    pub fn next_id(&self) -> u64 {
        let id = self.next.get() + 1;
        self.next.set(id);
        id
    }

    /// Last id handed out (0 if none).
    pub fn last_id(&self) -> u64 {
        self.next.get()
    }
}

/// Marker for pooled event entities.
#[derive(Component, Debug, Clone, Copy, Default)]
pub(crate) struct EventSlot;

pub(crate) struct Subscription {
    trigger: CollectorTrigger,
    buffer: Vec<Entity>,
    pending: HashSet<Entity>,
    has_component: fn(&World, Entity) -> bool,
}

fn world_has<T: Component>(world: &World, entity: Entity) -> bool {
    world.get::<T>(entity).is_some()
}

/// Typed component table for one partition.
pub struct Store<P: Partition> {
    world: World,
    ids: IdGenerator,
    /// Identity value -> entity.
    index: HashMap<u64, Entity>,
    subscriptions: Vec<Subscription>,
    by_component: HashMap<TypeId, Vec<usize>>,
    uniques: HashMap<TypeId, Entity>,
    free_events: Vec<Entity>,
    live_events: Vec<Entity>,
    _partition: PhantomData<P>,
}

impl<P: Partition> Store<P> {
    pub fn new(ids: IdGenerator) -> Self {
        Self {
            world: World::new(),
            ids,
            index: HashMap::new(),
            subscriptions: Vec::new(),
            by_component: HashMap::new(),
            uniques: HashMap::new(),
            free_events: Vec::new(),
            live_events: Vec::new(),
            _partition: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        P::NAME
    }

    pub fn ids(&self) -> &IdGenerator {
        &self.ids
    }

    /// Read-only access to the backing world (snapshots, tests).
    pub fn world(&self) -> &World {
        &self.world
    }

    pub(crate) fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Create an entity carrying only its [`Identity`].
    pub fn create_entity(&mut self) -> Entity {
        let id = self.ids.next_id();
        let entity = self.world.spawn(Identity::new(id)).id();
        self.index.insert(id, entity);
        entity
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.world.entities().contains(entity)
    }

    /// Number of live entities, not counting parked event slots.
    pub fn entity_count(&self) -> usize {
        self.index.len() - self.free_events.len()
    }

    fn ensure_alive(&self, entity: Entity) -> Result<(), StoreError> {
        if self.is_alive(entity) {
            Ok(())
        } else {
            Err(StoreError::EntityNotFound(entity, P::NAME))
        }
    }

    fn check_unique<T: Component>(&self, entity: Entity) -> Result<(), StoreError> {
        match self.uniques.get(&TypeId::of::<T>()) {
            Some(owner) if *owner != entity && self.is_alive(*owner) => {
                Err(StoreError::UniqueViolation(type_name::<T>()))
            }
            _ => Ok(()),
        }
    }

    /// Attach a component. Fails if the entity already carries one of this type.
    pub fn add<T: Component>(&mut self, entity: Entity, value: T) -> Result<(), StoreError> {
        self.ensure_alive(entity)?;
        if self.has::<T>(entity) {
            return Err(StoreError::ComponentExists {
                entity,
                component: type_name::<T>(),
            });
        }
        self.check_unique::<T>(entity)?;
        self.world.entity_mut(entity).insert(value);
        self.notify::<T>(entity, true);
        Ok(())
    }

    /// Attach or overwrite a component and notify subscribers.
    pub fn replace<T: Component>(&mut self, entity: Entity, value: T) -> Result<(), StoreError> {
        self.ensure_alive(entity)?;
        self.check_unique::<T>(entity)?;
        let existed = self.has::<T>(entity);
        self.world.entity_mut(entity).insert(value);
        self.notify::<T>(entity, !existed);
        Ok(())
    }

    /// Detach a component, returning it. Identity cannot be removed.
    pub fn remove<T: Component>(&mut self, entity: Entity) -> Option<T> {
        if TypeId::of::<T>() == TypeId::of::<Identity>() || !self.is_alive(entity) {
            return None;
        }
        let taken = self.world.entity_mut(entity).take::<T>();
        if taken.is_some() && self.uniques.get(&TypeId::of::<T>()) == Some(&entity) {
            self.uniques.remove(&TypeId::of::<T>());
        }
        taken
    }

    /// Strip every component and free the entity. Returns false if it was
    /// already gone.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        if let Some(id) = self.identity(entity) {
            self.index.remove(&id);
        }
        self.uniques.retain(|_, owner| *owner != entity);
        self.live_events.retain(|e| *e != entity);
        self.free_events.retain(|e| *e != entity);
        self.purge_pending(entity);
        self.world.despawn(entity)
    }

    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        if !self.is_alive(entity) {
            return None;
        }
        self.world.get::<T>(entity)
    }

    /// In-place mutation. Does not notify; use [`Store::replace`] when a
    /// change must be observed reactively.
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<Mut<'_, T>> {
        if !self.is_alive(entity) {
            return None;
        }
        self.world.get_mut::<T>(entity)
    }

    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.get::<T>(entity).is_some()
    }

    /// Look an entity up by its identity value.
    pub fn entity(&self, id: u64) -> Option<Entity> {
        self.index
            .get(&id)
            .copied()
            .filter(|entity| self.is_alive(*entity))
    }

    pub fn identity(&self, entity: Entity) -> Option<u64> {
        self.get::<Identity>(entity).map(Identity::value)
    }

    // ------------------------------------------------------------------------
    // Unique components
    // ------------------------------------------------------------------------

    /// Set a unique component, creating its owning entity on first use.
    pub fn set_unique<T: Component>(&mut self, value: T) -> Entity {
        if let Some(owner) = self.unique_entity::<T>() {
            self.world.entity_mut(owner).insert(value);
            self.notify::<T>(owner, false);
            return owner;
        }
        let owner = self.create_entity();
        self.uniques.insert(TypeId::of::<T>(), owner);
        self.world.entity_mut(owner).insert(value);
        self.notify::<T>(owner, true);
        owner
    }

    pub fn unique_entity<T: Component>(&self) -> Option<Entity> {
        self.uniques
            .get(&TypeId::of::<T>())
            .copied()
            .filter(|owner| self.has::<T>(*owner))
    }

    pub fn unique<T: Component>(&self) -> Option<&T> {
        self.unique_entity::<T>().and_then(|owner| self.get::<T>(owner))
    }

    pub fn unique_mut<T: Component>(&mut self) -> Option<Mut<'_, T>> {
        let owner = self.unique_entity::<T>()?;
        self.get_mut::<T>(owner)
    }

    // ------------------------------------------------------------------------
    // Event slots
    // ------------------------------------------------------------------------

    /// Take an entity from the event pool. Event entities are recycled by
    /// [`Store::recycle_events`] at the end of every frame.
    pub fn create_event(&mut self) -> Entity {
        let entity = match self.free_events.pop() {
            Some(slot) if self.is_alive(slot) => slot,
            _ => {
                let slot = self.create_entity();
                self.world.entity_mut(slot).insert(EventSlot);
                slot
            }
        };
        self.live_events.push(entity);
        entity
    }

    /// Number of event entities created since the last recycle.
    pub fn live_event_count(&self) -> usize {
        self.live_events.len()
    }

    /// Strip every live event entity back to an empty pooled slot.
    pub fn recycle_events(&mut self) -> usize {
        let live = std::mem::take(&mut self.live_events);
        let mut recycled = 0;
        for slot in live {
            if !self.is_alive(slot) {
                continue;
            }
            self.world.entity_mut(slot).retain::<(Identity, EventSlot)>();
            self.purge_pending(slot);
            self.free_events.push(slot);
            recycled += 1;
        }
        recycled
    }

    // ------------------------------------------------------------------------
    // Groups and collectors
    // ------------------------------------------------------------------------

    /// Build a live group over entities matching `F`.
    pub fn group<F: QueryFilter + 'static>(&mut self) -> Group<P, F> {
        Group::from_state(self.world.query_filtered::<Entity, F>())
    }

    /// Subscribe to additions (or additions and replacements) of `T`.
    pub fn collector<T: Component>(&mut self, trigger: CollectorTrigger) -> Collector<P, T> {
        let slot = self.subscriptions.len();
        self.subscriptions.push(Subscription {
            trigger,
            buffer: Vec::new(),
            pending: HashSet::new(),
            has_component: world_has::<T>,
        });
        self.by_component
            .entry(TypeId::of::<T>())
            .or_default()
            .push(slot);
        Collector::new(slot)
    }

    /// Move the pending entities of one subscription into `out`.
    pub(crate) fn drain_subscription(&mut self, slot: usize, out: &mut Vec<Entity>) {
        out.clear();
        let Some(subscription) = self.subscriptions.get_mut(slot) else {
            return;
        };
        let pending = std::mem::take(&mut subscription.buffer);
        subscription.pending.clear();
        let has_component = subscription.has_component;
        out.extend(
            pending
                .into_iter()
                .filter(|entity| self.world.entities().contains(*entity))
                .filter(|entity| has_component(&self.world, *entity)),
        );
    }

    /// Drop every subscription. Collectors created before this call go quiet.
    pub fn clear_subscriptions(&mut self) {
        self.subscriptions.clear();
        self.by_component.clear();
    }

    /// Destroy every entity and subscription.
    pub fn clear(&mut self) {
        self.world.clear_entities();
        self.index.clear();
        self.uniques.clear();
        self.free_events.clear();
        self.live_events.clear();
        self.clear_subscriptions();
    }

    fn notify<T: Component>(&mut self, entity: Entity, added: bool) {
        let Some(slots) = self.by_component.get(&TypeId::of::<T>()) else {
            return;
        };
        for &slot in slots {
            let subscription = &mut self.subscriptions[slot];
            let wanted = added || subscription.trigger == CollectorTrigger::AddedOrReplaced;
            if wanted && subscription.pending.insert(entity) {
                subscription.buffer.push(entity);
            }
        }
    }

    fn purge_pending(&mut self, entity: Entity) {
        for subscription in &mut self.subscriptions {
            if subscription.pending.remove(&entity) {
                subscription.buffer.retain(|e| *e != entity);
            }
        }
    }
}
