//! Live entity groups.
//!
//! A [`Group`] wraps a `bevy_ecs` [`QueryState`] whose matched archetype set is
//! maintained incrementally by the world as components are added and removed.
//! Iteration always goes through a caller-owned snapshot buffer, so systems
//! are free to destroy entities while walking the snapshot.

use std::marker::PhantomData;

use bevy_ecs::prelude::*;
use bevy_ecs::query::{QueryFilter, QueryState};

use crate::ecs::store::{Partition, Store};

/// Entities of one partition matching the filter `F` (e.g.
/// `(With<PedestrianTag>, Without<Hit>)` for AllOf/NoneOf predicates).
pub struct Group<P: Partition, F: QueryFilter + 'static> {
    state: QueryState<Entity, F>,
    _partition: PhantomData<P>,
}

impl<P: Partition, F: QueryFilter + 'static> Group<P, F> {
    pub(crate) fn from_state(state: QueryState<Entity, F>) -> Self {
        Self {
            state,
            _partition: PhantomData,
        }
    }

    /// Copy the current members into `buffer`, replacing its contents.
    pub fn snapshot(&mut self, store: &Store<P>, buffer: &mut Vec<Entity>) {
        buffer.clear();
        buffer.extend(self.state.iter(store.world()));
    }

    pub fn count(&mut self, store: &Store<P>) -> usize {
        self.state.iter(store.world()).count()
    }

    pub fn is_empty(&mut self, store: &Store<P>) -> bool {
        self.first(store).is_none()
    }

    /// Any member, for groups expected to hold a single entity.
    pub fn first(&mut self, store: &Store<P>) -> Option<Entity> {
        self.state.iter(store.world()).next()
    }

    pub fn contains(&mut self, store: &Store<P>, entity: Entity) -> bool {
        self.state.get(store.world(), entity).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Hit, PedestrianTag};
    use crate::ecs::store::{IdGenerator, Simulation};

    #[test]
    fn test_group_tracks_membership() {
        let mut store: Store<Simulation> = Store::new(IdGenerator::new());
        let mut active = store.group::<(With<PedestrianTag>, Without<Hit>)>();

        let a = store.create_entity();
        let b = store.create_entity();
        store.add(a, PedestrianTag).unwrap();
        store.add(b, PedestrianTag).unwrap();
        assert_eq!(active.count(&store), 2);

        store.add(a, Hit).unwrap();
        assert_eq!(active.count(&store), 1);
        assert!(!active.contains(&store, a));
        assert!(active.contains(&store, b));
    }

    #[test]
    fn test_snapshot_survives_destroy_during_iteration() {
        let mut store: Store<Simulation> = Store::new(IdGenerator::new());
        let mut peds = store.group::<With<PedestrianTag>>();
        for _ in 0..5 {
            let e = store.create_entity();
            store.add(e, PedestrianTag).unwrap();
        }

        let mut buffer = Vec::new();
        peds.snapshot(&store, &mut buffer);
        for &entity in &buffer {
            store.destroy(entity);
        }
        assert_eq!(buffer.len(), 5);
        assert!(peds.is_empty(&store));
    }
}
