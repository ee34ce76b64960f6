//! Entity identity: a packed (index, version) id plus the handle types that
//! pair an id with the registry owning it.
//!
//! The index addresses a slot; the version counts how many times the slot
//! has been recycled, so a handle kept across a destroy stops matching the
//! slot's next occupant. Versions wrap after 2^10 recycles of one slot;
//! callers must not hold handles across that many destroys.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ptr;

use static_assertions::const_assert_eq;

use crate::comp::{Comp, Component, ConstComp};
use crate::registry::{ComponentSet, Error, Registry};
use crate::sparse::Indexer;
use crate::storage::{ComponentRead, ComponentWrite};

/// Bits of an [`EntityId`] holding the slot index.
pub const INDEX_BITS: u32 = 22;
/// Bits of an [`EntityId`] holding the recycle version.
pub const VERSION_BITS: u32 = 10;

pub(crate) const INDEX_MASK: u32 = (1 << INDEX_BITS) - 1;
pub(crate) const VERSION_MASK: u32 = (1 << VERSION_BITS) - 1;

const_assert_eq!(INDEX_BITS + VERSION_BITS, u32::BITS);

/// A packed entity id: the low [`INDEX_BITS`] hold the slot index, the high
/// [`VERSION_BITS`] hold the version.
///
/// The all-zero id is never allocated and serves as the null handle.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EntityId(u32);

impl EntityId {
    /// The id no live entity ever carries.
    pub const NULL: Self = Self(0);

    /// Packs an index and a version into an id.
    pub const fn join(index: u32, version: u32) -> Self {
        assert!(index <= INDEX_MASK && version <= VERSION_MASK);
        Self(index | (version << INDEX_BITS))
    }

    pub const fn from_bits(bits: u32) -> Self { Self(bits) }

    pub const fn to_bits(self) -> u32 { self.0 }

    pub const fn index(self) -> u32 { self.0 & INDEX_MASK }

    pub const fn version(self) -> u32 { (self.0 >> INDEX_BITS) & VERSION_MASK }

    /// The id reissued for this slot after one more recycle: same index,
    /// version incremented mod 2^[`VERSION_BITS`].
    pub const fn bump_version(self) -> Self {
        Self::join(self.index(), (self.version() + 1) & VERSION_MASK)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({}v{})", self.index(), self.version())
    }
}

/// Indexes the live-entity sparse set and component columns by the id's
/// index field, ignoring the version, so liveness lookup survives version
/// bumps without re-keying.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityIdIndexer;

impl Indexer<EntityId> for EntityIdIndexer {
    fn index(&self, id: &EntityId) -> usize {
        id.index().try_into().expect("usize >= u32")
    }
}

/// A handle to an entity that can read and mutate its components.
///
/// Handles are cheap copies of `(registry, id)`. Equality and ordering
/// compare the owning registry (by address) first, then the id; handles of
/// different registries never compare equal. A handle to a destroyed entity
/// stays safe to use: lookups report absence and mutations are no-ops.
pub struct Entity<'r> {
    owner: &'r Registry,
    id:    EntityId,
}

impl<'r> Entity<'r> {
    pub(crate) fn new(owner: &'r Registry, id: EntityId) -> Self { Self { owner, id } }

    pub fn owner(self) -> &'r Registry { self.owner }

    pub fn id(self) -> EntityId { self.id }

    pub fn as_const(self) -> ConstEntity<'r> { ConstEntity::new(self.owner, self.id) }

    /// Whether this handle still names a live entity.
    pub fn valid(self) -> bool { self.owner.valid_entity(self.id) }

    /// Creates a new entity carrying a clone of every component of this one.
    pub fn duplicate(self) -> Result<Entity<'r>, Error> { self.owner.create_entity_from(self.id) }

    /// Destroys the entity, returning `false` if it was already dead.
    pub fn destroy(self) -> bool { self.owner.destroy_entity(self.id) }

    /// Typed component accessor for this entity.
    pub fn comp<T: Component>(self) -> Comp<'r, T> { Comp::new(self) }

    pub fn assign_component<T: Component>(self, value: T) -> Option<T> {
        self.owner.assign_component(self.id, value)
    }

    pub fn ensure_component<T: Component>(self, value: T) -> Option<ComponentWrite<T>> {
        self.owner.ensure_component(self.id, value)
    }

    pub fn remove_component<T: Component>(self) -> Option<T> {
        self.owner.remove_component::<T>(self.id)
    }

    pub fn exists_component<T: Component>(self) -> bool {
        self.owner.exists_component::<T>(self.id)
    }

    pub fn get_component<T: Component>(self) -> Result<ComponentRead<T>, Error> {
        self.owner.get_component::<T>(self.id)
    }

    pub fn get_component_mut<T: Component>(self) -> Result<ComponentWrite<T>, Error> {
        self.owner.get_component_mut::<T>(self.id)
    }

    pub fn find_component<T: Component>(self) -> Option<ComponentRead<T>> {
        self.owner.find_component::<T>(self.id)
    }

    pub fn find_component_mut<T: Component>(self) -> Option<ComponentWrite<T>> {
        self.owner.find_component_mut::<T>(self.id)
    }

    pub fn get_components<S: ComponentSet>(self) -> Result<S::Reads, Error> {
        self.owner.get_components::<S>(self.id)
    }

    pub fn get_components_mut<S: ComponentSet>(self) -> Result<S::Writes, Error> {
        self.owner.get_components_mut::<S>(self.id)
    }

    pub fn find_components<S: ComponentSet>(self) -> S::Finds {
        self.owner.find_components::<S>(self.id)
    }

    pub fn find_components_mut<S: ComponentSet>(self) -> S::FindsMut {
        self.owner.find_components_mut::<S>(self.id)
    }

    pub fn remove_all_components(self) -> usize { self.owner.remove_all_components(self.id) }

    pub fn component_count(self) -> usize { self.owner.entity_component_count(self.id) }
}

impl Clone for Entity<'_> {
    fn clone(&self) -> Self { *self }
}

impl Copy for Entity<'_> {}

impl fmt::Debug for Entity<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Entity").field(&self.id).finish()
    }
}

/// A read-only handle to an entity.
///
/// Constructible from [`Entity`]; exposes only the non-mutating subset.
pub struct ConstEntity<'r> {
    owner: &'r Registry,
    id:    EntityId,
}

impl<'r> ConstEntity<'r> {
    pub(crate) fn new(owner: &'r Registry, id: EntityId) -> Self { Self { owner, id } }

    pub fn owner(self) -> &'r Registry { self.owner }

    pub fn id(self) -> EntityId { self.id }

    pub fn valid(self) -> bool { self.owner.valid_entity(self.id) }

    /// Typed read-only component accessor for this entity.
    pub fn comp<T: Component>(self) -> ConstComp<'r, T> { ConstComp::new(self) }

    pub fn exists_component<T: Component>(self) -> bool {
        self.owner.exists_component::<T>(self.id)
    }

    pub fn get_component<T: Component>(self) -> Result<ComponentRead<T>, Error> {
        self.owner.get_component::<T>(self.id)
    }

    pub fn find_component<T: Component>(self) -> Option<ComponentRead<T>> {
        self.owner.find_component::<T>(self.id)
    }

    pub fn get_components<S: ComponentSet>(self) -> Result<S::Reads, Error> {
        self.owner.get_components::<S>(self.id)
    }

    pub fn find_components<S: ComponentSet>(self) -> S::Finds {
        self.owner.find_components::<S>(self.id)
    }

    pub fn component_count(self) -> usize { self.owner.entity_component_count(self.id) }
}

impl Clone for ConstEntity<'_> {
    fn clone(&self) -> Self { *self }
}

impl Copy for ConstEntity<'_> {}

impl<'r> From<Entity<'r>> for ConstEntity<'r> {
    fn from(entity: Entity<'r>) -> Self { entity.as_const() }
}

impl fmt::Debug for ConstEntity<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConstEntity").field(&self.id).finish()
    }
}

impl<'r> From<Entity<'r>> for EntityId {
    fn from(entity: Entity<'r>) -> Self { entity.id }
}

impl<'r> From<ConstEntity<'r>> for EntityId {
    fn from(entity: ConstEntity<'r>) -> Self { entity.id }
}

fn owner_key(registry: &Registry) -> usize { ptr::from_ref(registry) as usize }

macro_rules! impl_handle_cmp {
    ($lhs:ident, $rhs:ident) => {
        impl PartialEq<$rhs<'_>> for $lhs<'_> {
            fn eq(&self, other: &$rhs<'_>) -> bool {
                ptr::eq(self.owner, other.owner) && self.id == other.id
            }
        }
    };
}

impl_handle_cmp!(Entity, Entity);
impl_handle_cmp!(Entity, ConstEntity);
impl_handle_cmp!(ConstEntity, ConstEntity);
impl_handle_cmp!(ConstEntity, Entity);

impl Eq for Entity<'_> {}
impl Eq for ConstEntity<'_> {}

macro_rules! impl_handle_ord_hash {
    ($handle:ident) => {
        impl Ord for $handle<'_> {
            fn cmp(&self, other: &Self) -> Ordering {
                (owner_key(self.owner), self.id).cmp(&(owner_key(other.owner), other.id))
            }
        }

        impl PartialOrd for $handle<'_> {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
        }

        impl Hash for $handle<'_> {
            fn hash<H: Hasher>(&self, state: &mut H) {
                owner_key(self.owner).hash(state);
                self.id.hash(state);
            }
        }
    };
}

impl_handle_ord_hash!(Entity);
impl_handle_ord_hash!(ConstEntity);

/// Chains component assignments onto one entity.
///
/// ```
/// # use weft::{EntityFiller, Registry};
/// # #[derive(Clone)] struct Position(i32);
/// # #[derive(Clone)] struct Velocity(i32);
/// # let registry = Registry::new();
/// let ent = registry.create_entity().unwrap();
/// EntityFiller::new(ent)
///     .component(Position(1))
///     .component(Velocity(2));
/// ```
pub struct EntityFiller<'r> {
    entity: Entity<'r>,
}

impl<'r> EntityFiller<'r> {
    pub fn new(entity: Entity<'r>) -> Self { Self { entity } }

    pub fn component<T: Component>(&mut self, value: T) -> &mut Self {
        self.entity.assign_component(value);
        self
    }

    pub fn entity(&self) -> Entity<'r> { self.entity }
}
