//! Per-component-type columns: a sparse map from entity id to value behind
//! a private reader-writer lock, plus the owned guards handed out for point
//! access.
//!
//! Zero-sized marker components need no dedicated representation: the dense
//! value vector of a ZST never allocates, so such a column costs only its
//! key set.

use std::any::Any;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::lock_api::{ArcRwLockReadGuard, ArcRwLockWriteGuard};
use parking_lot::{RawRwLock, RwLock};

use crate::comp::Component;
use crate::entity::{EntityId, EntityIdIndexer};
use crate::sparse::SparseMap;

type Cells<T> = SparseMap<EntityId, T, EntityIdIndexer>;

/// A shared handle to one component column.
///
/// All operations take `&self`; reads acquire the column lock shared,
/// mutations acquire it exclusive. Cloning the handle shares the column.
pub(crate) struct ComponentStorage<T: Component> {
    cells: Arc<RwLock<Cells<T>>>,
}

impl<T: Component> ComponentStorage<T> {
    pub(crate) fn new() -> Self { Self { cells: Arc::new(RwLock::new(SparseMap::new())) } }

    pub(crate) fn cells(&self) -> &Arc<RwLock<Cells<T>>> { &self.cells }

    /// Inserts or overwrites, returning the replaced value.
    pub(crate) fn assign(&self, id: EntityId, value: T) -> Option<T> {
        self.cells.write().insert(id, value)
    }

    /// Inserts only if absent, then hands back a write guard on the slot.
    pub(crate) fn ensure(&self, id: EntityId, value: T) -> ComponentWrite<T> {
        let mut guard = self.cells.write_arc();
        guard.get_or_insert_with(id, || value);
        let index = guard.dense_index_of(id).expect("slot inserted above");
        ComponentWrite { guard, index }
    }

    pub(crate) fn remove(&self, id: EntityId) -> Option<T> {
        self.cells.write().swap_remove(id)
    }

    pub(crate) fn remove_all(&self) -> usize {
        let mut cells = self.cells.write();
        let count = cells.len();
        cells.clear();
        count
    }

    pub(crate) fn contains(&self, id: EntityId) -> bool { self.cells.read().contains(id) }

    pub(crate) fn read(&self, id: EntityId) -> Option<ComponentRead<T>> {
        let guard = self.cells.read_arc();
        let index = guard.dense_index_of(id)?;
        Some(ComponentRead { guard, index })
    }

    pub(crate) fn write(&self, id: EntityId) -> Option<ComponentWrite<T>> {
        let guard = self.cells.write_arc();
        let index = guard.dense_index_of(id)?;
        Some(ComponentWrite { guard, index })
    }

    pub(crate) fn len(&self) -> usize { self.cells.read().len() }

    /// Visits every `(entity, component)` pair under the shared lock.
    ///
    /// The callback must not re-enter this column through the registry;
    /// the lock is not re-entrant.
    pub(crate) fn for_each(&self, mut f: impl FnMut(EntityId, &T)) {
        let cells = self.cells.read();
        for index in 0..cells.len() {
            f(cells.key_at(index), cells.value_at(index));
        }
    }

    /// Visits every `(entity, component)` pair under the exclusive lock.
    ///
    /// The callback must not re-enter this column through the registry;
    /// the lock is not re-entrant.
    pub(crate) fn for_each_mut(&self, mut f: impl FnMut(EntityId, &mut T)) {
        let mut cells = self.cells.write();
        for index in 0..cells.len() {
            f(cells.key_at(index), cells.value_at_mut(index));
        }
    }

    pub(crate) fn memory_usage(&self) -> usize { self.cells.read().memory_usage() }
}

impl<T: Component> Clone for ComponentStorage<T> {
    fn clone(&self) -> Self { Self { cells: Arc::clone(&self.cells) } }
}

/// The type-erased face of a column, for registry-wide walks
/// (entity destruction, cloning, memory accounting).
pub(crate) trait AnyStorage: Send + Sync {
    fn remove(&self, id: EntityId) -> bool;
    fn contains(&self, id: EntityId) -> bool;
    fn clone_component(&self, from: EntityId, to: EntityId);
    fn memory_usage(&self) -> usize;
    fn as_any(&self) -> &dyn Any;
}

impl<T: Component> AnyStorage for ComponentStorage<T> {
    fn remove(&self, id: EntityId) -> bool { ComponentStorage::remove(self, id).is_some() }

    fn contains(&self, id: EntityId) -> bool { ComponentStorage::contains(self, id) }

    fn clone_component(&self, from: EntityId, to: EntityId) {
        let value = self.read(from).map(|guard| (*guard).clone());
        if let Some(value) = value {
            self.assign(to, value);
        }
    }

    fn memory_usage(&self) -> usize { ComponentStorage::memory_usage(self) }

    fn as_any(&self) -> &dyn Any { self }
}

/// An owned shared-lock guard on one component value.
///
/// The column lock is held shared for the guard's lifetime, so the value
/// cannot be mutated or removed while the guard lives.
pub struct ComponentRead<T: Component> {
    guard: ArcRwLockReadGuard<RawRwLock, Cells<T>>,
    index: usize,
}

impl<T: Component> Deref for ComponentRead<T> {
    type Target = T;

    fn deref(&self) -> &T { self.guard.value_at(self.index) }
}

impl<T: Component + fmt::Debug> fmt::Debug for ComponentRead<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ComponentRead").field(&**self).finish()
    }
}

/// An owned exclusive-lock guard on one component value.
///
/// The column lock is held exclusive for the guard's lifetime; all other
/// access to the same component type blocks until the guard is dropped.
pub struct ComponentWrite<T: Component> {
    guard: ArcRwLockWriteGuard<RawRwLock, Cells<T>>,
    index: usize,
}

impl<T: Component> Deref for ComponentWrite<T> {
    type Target = T;

    fn deref(&self) -> &T { self.guard.value_at(self.index) }
}

impl<T: Component> DerefMut for ComponentWrite<T> {
    fn deref_mut(&mut self) -> &mut T { self.guard.value_at_mut(self.index) }
}

impl<T: Component + fmt::Debug> fmt::Debug for ComponentWrite<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ComponentWrite").field(&**self).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(index: u32) -> EntityId { EntityId::join(index, 0) }

    #[test]
    fn assign_overwrites_ensure_does_not() {
        let storage = ComponentStorage::<i64>::new();

        assert_eq!(storage.assign(id(1), 10), None);
        assert_eq!(storage.assign(id(1), 20), Some(10));

        {
            let ensured = storage.ensure(id(1), 99);
            assert_eq!(*ensured, 20);
        }
        {
            let ensured = storage.ensure(id(2), 99);
            assert_eq!(*ensured, 99);
        }

        assert_eq!(storage.len(), 2);
    }

    #[test]
    fn remove_then_read_reports_absence() {
        let storage = ComponentStorage::<i64>::new();
        storage.assign(id(3), 30);

        assert_eq!(storage.remove(id(3)), Some(30));
        assert_eq!(storage.remove(id(3)), None);
        assert!(storage.read(id(3)).is_none());
        assert!(!storage.contains(id(3)));
    }

    #[test]
    fn write_guard_publishes_mutation() {
        let storage = ComponentStorage::<i64>::new();
        storage.assign(id(4), 1);

        {
            let mut guard = storage.write(id(4)).expect("assigned above");
            *guard += 41;
        }

        assert_eq!(*storage.read(id(4)).expect("still present"), 42);
    }

    #[test]
    fn erased_clone_copies_between_entities() {
        let storage = ComponentStorage::<String>::new();
        storage.assign(id(5), "hello".to_owned());

        let erased: &dyn AnyStorage = &storage;
        erased.clone_component(id(5), id(6));
        erased.clone_component(id(7), id(8));

        assert_eq!(*storage.read(id(6)).expect("cloned"), "hello");
        assert!(!erased.contains(id(8)));
    }

    #[test]
    fn zero_sized_markers_cost_only_the_key_set() {
        #[derive(Clone)]
        struct Marker;

        let storage = ComponentStorage::<Marker>::new();
        for index in 1..=100 {
            storage.assign(id(index), Marker);
        }
        assert_eq!(storage.len(), 100);

        let mut keys_only = crate::sparse::SparseSet::<EntityId, EntityIdIndexer>::new();
        for index in 1..=100 {
            keys_only.insert(id(index));
        }
        assert_eq!(storage.memory_usage(), keys_only.memory_usage());
    }
}
