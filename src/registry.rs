//! The registry: owner of all entities, component columns and features, and
//! the sole entry point of the API.

use std::any::type_name;
use std::fmt;
use std::mem;

use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

use crate::comp::{Comp, Component};
use crate::entity::{ConstEntity, Entity, EntityId, EntityIdIndexer, INDEX_MASK};
use crate::family::{Family, FamilyId};
use crate::feature::Feature;
use crate::filter::{Always, Filter};
use crate::prototype::Prototype;
use crate::sparse::{SparseMap, SparseSet};
use crate::storage::{AnyStorage, ComponentRead, ComponentStorage, ComponentWrite};
use crate::util::{next_capacity_size, IncrementalLocker};

mod join;
pub use join::ComponentSet;


/// Failures surfaced by registry operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// A `get_component` style lookup found no component of the named type.
    #[error("component `{0}` not found on entity")]
    MissingComponent(&'static str),

    /// A `get_feature` lookup found no feature under the named tag.
    #[error("feature `{0}` not found")]
    MissingFeature(&'static str),

    /// Every one of the 2^22 − 1 entity indices is live. The caller must
    /// destroy entities before creating more.
    #[error("entity index space exhausted")]
    EntityIndexExhausted,
}

/// Byte totals reported by [`Registry::memory_usage`], split between the
/// entity bookkeeping and the component columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryUsage {
    pub entities:   usize,
    pub components: usize,
}

/// Read-guard on a [`Feature`] inside the registry's feature table.
///
/// All [`Feature`] operations take `&self`, so this guard is enough to
/// configure and drive the feature.
pub type FeatureRef<'r> = MappedRwLockReadGuard<'r, Feature>;

#[derive(Default)]
struct EntityPool {
    last_index: u32,
    free:       Vec<EntityId>,
    live:       SparseSet<EntityId, EntityIdIndexer>,
}

impl EntityPool {
    fn allocate(&mut self) -> Result<EntityId, Error> {
        if let Some(spent) = self.free.pop() {
            let id = spent.bump_version();
            self.live.insert(id);
            return Ok(id);
        }

        if self.last_index >= INDEX_MASK {
            return Err(Error::EntityIndexExhausted);
        }

        // Keep enough free-list capacity for every live id plus the new one,
        // so release() below never has to allocate.
        if self.free.capacity() <= self.live.len() {
            let target = next_capacity_size(
                self.free.capacity(),
                self.live.len() + 1,
                INDEX_MASK as usize,
            );
            self.free.reserve(target);
        }

        self.last_index += 1;
        let id = EntityId::join(self.last_index, 0);
        self.live.insert(id);
        Ok(id)
    }

    fn release(&mut self, id: EntityId) -> bool {
        if !self.live.swap_remove(id) {
            return false;
        }
        debug_assert!(self.free.len() < self.free.capacity(), "capacity reserved in allocate");
        self.free.push(id);
        true
    }

    fn memory_usage(&self) -> usize {
        self.free.capacity() * mem::size_of::<EntityId>() + self.live.memory_usage()
    }
}

/// Owner of entities, component columns and features.
///
/// The registry is `Send + Sync`; every operation takes `&self` and
/// synchronizes internally. Each component type gets its own column with a
/// private reader-writer lock, created lazily on the first assignment of
/// that type. One more lock protects the entity pool and another the
/// feature table.
///
/// Entity ids are recycled: destroying an entity pushes its id onto a free
/// list, and the next creation reissues the same slot with the version
/// field incremented, so stale handles stop matching
/// ([`valid_entity`](Self::valid_entity) turns false).
pub struct Registry {
    pool:      RwLock<EntityPool>,
    storages:  RwLock<SparseMap<FamilyId, Box<dyn AnyStorage>>>,
    features:  RwLock<SparseMap<FamilyId, Feature>>,
    iteration: IncrementalLocker,
}

impl Default for Registry {
    fn default() -> Self { Self::new() }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            pool:      RwLock::new(EntityPool::default()),
            storages:  RwLock::new(SparseMap::new()),
            features:  RwLock::new(SparseMap::new()),
            iteration: IncrementalLocker::new(),
        }
    }

    // --- entity lifecycle ---

    /// Creates a fresh entity, reusing a destroyed slot when one is
    /// available.
    pub fn create_entity(&self) -> Result<Entity<'_>, Error> {
        let id = self.pool.write().allocate()?;
        log::trace!("created entity {id:?}");
        Ok(Entity::new(self, id))
    }

    /// Creates an entity and stamps every component of the prototype onto
    /// it.
    pub fn create_entity_with(&self, proto: &Prototype) -> Result<Entity<'_>, Error> {
        let ent = self.create_entity()?;
        proto.apply_to_entity(ent, true);
        Ok(ent)
    }

    /// Creates an entity carrying a clone of every component of `source`.
    ///
    /// A dead source contributes nothing; the new entity starts bare.
    pub fn create_entity_from(&self, source: impl Into<EntityId>) -> Result<Entity<'_>, Error> {
        let source = source.into();
        let ent = self.create_entity()?;
        let storages = self.storages.read();
        for (_, storage) in storages.iter() {
            storage.clone_component(source, ent.id());
        }
        Ok(ent)
    }

    /// Destroys an entity: removes every component, retires the id for
    /// reissue with a bumped version. Returns `false` if the entity was
    /// already dead.
    ///
    /// The entity pool stays locked while the components are removed, so a
    /// concurrent create cannot reuse the slot mid-destroy; a concurrent
    /// joined iteration may still observe the entity with only part of its
    /// components remaining.
    pub fn destroy_entity(&self, ent: impl Into<EntityId>) -> bool {
        let id = ent.into();
        let mut pool = self.pool.write();
        if !pool.live.contains(id) {
            return false;
        }
        {
            let storages = self.storages.read();
            for (_, storage) in storages.iter() {
                storage.remove(id);
            }
        }
        log::trace!("destroyed entity {id:?}");
        pool.release(id)
    }

    /// Whether the id names a currently live entity.
    pub fn valid_entity(&self, ent: impl Into<EntityId>) -> bool {
        self.pool.read().live.contains(ent.into())
    }

    /// Builds a handle from a raw id without checking liveness.
    pub fn wrap_entity(&self, id: EntityId) -> Entity<'_> { Entity::new(self, id) }

    /// Builds a typed component accessor from a raw id without checking
    /// liveness.
    pub fn wrap_component<T: Component>(&self, ent: impl Into<EntityId>) -> Comp<'_, T> {
        self.wrap_entity(ent.into()).comp()
    }

    pub fn entity_count(&self) -> usize { self.pool.read().live.len() }

    // --- component storage plumbing ---

    pub(crate) fn find_storage<T: Component>(&self) -> Option<ComponentStorage<T>> {
        let storages = self.storages.read();
        let storage = storages.get(Family::<T>::id())?;
        let storage = storage
            .as_any()
            .downcast_ref::<ComponentStorage<T>>()
            .expect("storage keyed by the family id of its component type");
        Some(storage.clone())
    }

    fn get_or_create_storage<T: Component>(&self) -> ComponentStorage<T> {
        if let Some(storage) = self.find_storage::<T>() {
            return storage;
        }

        let mut storages = self.storages.write();
        // Double check: another thread may have created the column between
        // the two locks.
        let storage = storages.get_or_insert_with(Family::<T>::id(), || {
            log::debug!("creating component storage for {}", type_name::<T>());
            Box::new(ComponentStorage::<T>::new())
        });
        storage
            .as_any()
            .downcast_ref::<ComponentStorage<T>>()
            .expect("storage keyed by the family id of its component type")
            .clone()
    }

    // --- component operations ---

    /// Inserts or overwrites a component, returning the replaced value.
    ///
    /// A dead entity is left untouched and `None` is returned.
    pub fn assign_component<T: Component>(
        &self,
        ent: impl Into<EntityId>,
        value: T,
    ) -> Option<T> {
        let id = ent.into();
        if !self.valid_entity(id) {
            return None;
        }
        self.get_or_create_storage::<T>().assign(id, value)
    }

    /// Inserts a component only if absent, returning a write guard on the
    /// slot. A dead entity is left untouched and `None` is returned.
    pub fn ensure_component<T: Component>(
        &self,
        ent: impl Into<EntityId>,
        value: T,
    ) -> Option<ComponentWrite<T>> {
        let id = ent.into();
        if !self.valid_entity(id) {
            return None;
        }
        Some(self.get_or_create_storage::<T>().ensure(id, value))
    }

    /// Removes a component, returning its value.
    pub fn remove_component<T: Component>(&self, ent: impl Into<EntityId>) -> Option<T> {
        self.find_storage::<T>()?.remove(ent.into())
    }

    pub fn exists_component<T: Component>(&self, ent: impl Into<EntityId>) -> bool {
        match self.find_storage::<T>() {
            Some(storage) => storage.contains(ent.into()),
            None => false,
        }
    }

    /// Read access to a component that must be present.
    pub fn get_component<T: Component>(
        &self,
        ent: impl Into<EntityId>,
    ) -> Result<ComponentRead<T>, Error> {
        self.find_component::<T>(ent).ok_or(Error::MissingComponent(type_name::<T>()))
    }

    /// Write access to a component that must be present.
    pub fn get_component_mut<T: Component>(
        &self,
        ent: impl Into<EntityId>,
    ) -> Result<ComponentWrite<T>, Error> {
        self.find_component_mut::<T>(ent).ok_or(Error::MissingComponent(type_name::<T>()))
    }

    pub fn find_component<T: Component>(
        &self,
        ent: impl Into<EntityId>,
    ) -> Option<ComponentRead<T>> {
        self.find_storage::<T>()?.read(ent.into())
    }

    pub fn find_component_mut<T: Component>(
        &self,
        ent: impl Into<EntityId>,
    ) -> Option<ComponentWrite<T>> {
        self.find_storage::<T>()?.write(ent.into())
    }

    /// Read guards on several components at once; fails if any is absent.
    pub fn get_components<S: ComponentSet>(
        &self,
        ent: impl Into<EntityId>,
    ) -> Result<S::Reads, Error> {
        S::read_components(self, ent.into())
    }

    /// Write guards on several components at once; fails if any is absent.
    pub fn get_components_mut<S: ComponentSet>(
        &self,
        ent: impl Into<EntityId>,
    ) -> Result<S::Writes, Error> {
        S::write_components(self, ent.into())
    }

    /// Per-component optional read guards.
    pub fn find_components<S: ComponentSet>(&self, ent: impl Into<EntityId>) -> S::Finds {
        S::find_components(self, ent.into())
    }

    /// Per-component optional write guards.
    pub fn find_components_mut<S: ComponentSet>(&self, ent: impl Into<EntityId>) -> S::FindsMut {
        S::find_components_mut(self, ent.into())
    }

    /// Removes every component of one entity, returning how many were
    /// removed. The entity itself stays alive.
    pub fn remove_all_components(&self, ent: impl Into<EntityId>) -> usize {
        let id = ent.into();
        let storages = self.storages.read();
        let mut removed = 0;
        for (_, storage) in storages.iter() {
            if storage.remove(id) {
                removed += 1;
            }
        }
        removed
    }

    /// Removes the `T` component from every entity, returning how many
    /// were removed.
    pub fn clear_components<T: Component>(&self) -> usize {
        match self.find_storage::<T>() {
            Some(storage) => storage.remove_all(),
            None => 0,
        }
    }

    /// How many entities currently carry a `T` component.
    pub fn component_count<T: Component>(&self) -> usize {
        match self.find_storage::<T>() {
            Some(storage) => storage.len(),
            None => 0,
        }
    }

    /// How many components the entity currently carries.
    pub fn entity_component_count(&self, ent: impl Into<EntityId>) -> usize {
        let id = ent.into();
        let storages = self.storages.read();
        storages.iter().filter(|(_, storage)| storage.contains(id)).count()
    }

    // --- iteration ---

    /// Visits every live entity.
    ///
    /// The entity pool is read-locked for the duration, so the callback
    /// may assign and remove components but must not create or destroy
    /// entities.
    pub fn for_each_entity(&self, f: impl FnMut(Entity<'_>)) {
        self.for_each_entity_filtered(f, Always(true));
    }

    /// Visits every live entity matching the filter.
    pub fn for_each_entity_filtered(&self, mut f: impl FnMut(Entity<'_>), filter: impl Filter) {
        let _iter = self.iteration.guard();
        let pool = self.pool.read();
        for &id in pool.live.iter() {
            let ent = Entity::new(self, id);
            if filter.matches(ent.as_const()) {
                f(ent);
            }
        }
    }

    /// Visits every `(entity, component)` pair of one column under its
    /// shared lock.
    pub fn for_each_component<T: Component>(&self, f: impl FnMut(ConstEntity<'_>, &T)) {
        self.for_each_component_filtered(f, Always(true));
    }

    /// Like [`for_each_component`](Self::for_each_component), restricted by
    /// a filter. The filter must not test the iterated component type; the
    /// column lock is not re-entrant.
    pub fn for_each_component_filtered<T: Component>(
        &self,
        mut f: impl FnMut(ConstEntity<'_>, &T),
        filter: impl Filter,
    ) {
        let Some(storage) = self.find_storage::<T>() else { return };
        storage.for_each(|id, value| {
            let ent = ConstEntity::new(self, id);
            if filter.matches(ent) {
                f(ent, value);
            }
        });
    }

    /// Visits every `(entity, component)` pair of one column under its
    /// exclusive lock, with mutable access to the values.
    pub fn for_each_component_mut<T: Component>(&self, f: impl FnMut(Entity<'_>, &mut T)) {
        self.for_each_component_mut_filtered(f, Always(true));
    }

    /// Like [`for_each_component_mut`](Self::for_each_component_mut),
    /// restricted by a filter. The callback and the filter must not
    /// re-enter the iterated column; its lock is held exclusively.
    pub fn for_each_component_mut_filtered<T: Component>(
        &self,
        mut f: impl FnMut(Entity<'_>, &mut T),
        filter: impl Filter,
    ) {
        let Some(storage) = self.find_storage::<T>() else { return };
        storage.for_each_mut(|id, value| {
            let ent = Entity::new(self, id);
            if filter.matches(ent.as_const()) {
                f(ent, value);
            }
        });
    }

    /// Visits every entity carrying all components of the tuple `S`, with
    /// shared references to the component values.
    ///
    /// The leftmost tuple element is the **driver**: its column is walked
    /// in dense order and its lock is held for the whole loop, while the
    /// remaining columns are probed per entity. Listing the scarcest
    /// component first is the intended way to tune this loop.
    ///
    /// Each matching entity is visited exactly once. Iteration order
    /// follows the driver's dense order and is not stable across removals.
    pub fn for_joined_components<S: ComponentSet, F>(&self, f: F)
    where
        F: FnMut(ConstEntity<'_>, S::Refs<'_>),
    {
        S::for_each(self, &Always(true), f);
    }

    /// Like [`for_joined_components`](Self::for_joined_components),
    /// restricted by a filter evaluated before the probe lookups.
    pub fn for_joined_components_filtered<S: ComponentSet, F>(&self, f: F, filter: impl Filter)
    where
        F: FnMut(ConstEntity<'_>, S::Refs<'_>),
    {
        S::for_each(self, &filter, f);
    }

    /// Joined iteration with mutable access to every component of the
    /// tuple. See [`for_joined_components`](Self::for_joined_components)
    /// for the driver contract.
    ///
    /// The callback and the filter must not re-enter any iterated column;
    /// all the involved locks are held exclusively.
    pub fn for_joined_components_mut<S: ComponentSet, F>(&self, f: F)
    where
        F: FnMut(Entity<'_>, S::Muts<'_>),
    {
        S::for_each_mut(self, &Always(true), f);
    }

    /// Like [`for_joined_components_mut`](Self::for_joined_components_mut),
    /// restricted by a filter evaluated before the probe lookups.
    pub fn for_joined_components_mut_filtered<S: ComponentSet, F>(
        &self,
        f: F,
        filter: impl Filter,
    ) where
        F: FnMut(Entity<'_>, S::Muts<'_>),
    {
        S::for_each_mut(self, &filter, f);
    }

    /// Whether some entity iteration is currently in progress on any
    /// thread.
    pub fn is_iterating(&self) -> bool { self.iteration.is_locked() }

    // --- features and events ---

    /// Installs a feature under the tag type, replacing any previous one.
    pub fn assign_feature<Tag: 'static>(&self, feature: Feature) -> FeatureRef<'_> {
        let family = Family::<Tag>::id();
        let mut features = self.features.write();
        features.insert(family, feature);
        log::debug!("assigned feature {}", type_name::<Tag>());
        let features = RwLockWriteGuard::downgrade(features);
        RwLockReadGuard::map(features, |map| map.get(family).expect("inserted above"))
    }

    /// Installs a feature under the tag type only if none is present,
    /// returning the installed one either way.
    pub fn ensure_feature<Tag: 'static>(&self, feature: Feature) -> FeatureRef<'_> {
        let family = Family::<Tag>::id();
        let mut features = self.features.write();
        features.get_or_insert_with(family, move || feature);
        let features = RwLockWriteGuard::downgrade(features);
        RwLockReadGuard::map(features, |map| map.get(family).expect("present above"))
    }

    pub fn has_feature<Tag: 'static>(&self) -> bool {
        self.features.read().contains(Family::<Tag>::id())
    }

    pub fn get_feature<Tag: 'static>(&self) -> Result<FeatureRef<'_>, Error> {
        let family = Family::<Tag>::id();
        let features = self.features.read();
        if !features.contains(family) {
            return Err(Error::MissingFeature(type_name::<Tag>()));
        }
        Ok(RwLockReadGuard::map(features, |map| map.get(family).expect("checked above")))
    }

    /// Delivers an event to every enabled feature, each dispatching its
    /// systems in three phases (before, main, after).
    pub fn process_event<E: 'static>(&self, event: &E) -> &Self {
        let features = self.features.read();
        for (_, feature) in features.iter() {
            if feature.is_enabled() {
                feature.process_event(self, event);
            }
        }
        self
    }

    // --- introspection ---

    /// Bytes owned by the registry, split between entity bookkeeping and
    /// component columns.
    pub fn memory_usage(&self) -> MemoryUsage {
        let entities = self.pool.read().memory_usage();
        let storages = self.storages.read();
        let components = storages.iter().map(|(_, storage)| storage.memory_usage()).sum();
        MemoryUsage { entities, components }
    }

    /// Bytes owned by the `T` column.
    pub fn component_memory_usage<T: Component>(&self) -> usize {
        match self.find_storage::<T>() {
            Some(storage) => storage.memory_usage(),
            None => 0,
        }
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("entities", &self.entity_count())
            .field("storages", &self.storages.read().len())
            .field("features", &self.features.read().len())
            .finish()
    }
}

/// Chains feature registrations onto one registry.
pub struct RegistryFiller<'r> {
    registry: &'r Registry,
}

impl<'r> RegistryFiller<'r> {
    pub fn new(registry: &'r Registry) -> Self { Self { registry } }

    pub fn feature<Tag: 'static>(&mut self, feature: Feature) -> &mut Self {
        self.registry.assign_feature::<Tag>(feature);
        self
    }

    pub fn registry(&self) -> &'r Registry { self.registry }
}
