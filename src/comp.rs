//! The component contract and the typed per-entity accessor handles.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::entity::{ConstEntity, Entity};
use crate::registry::Error;
use crate::storage::{ComponentRead, ComponentWrite};

/// Types usable as components.
///
/// Components are plain values: `Clone` lets the registry clone whole
/// entities and lets prototypes stamp stored values onto new entities, and
/// `Send + Sync` lets columns be shared across worker threads.
///
/// Implemented automatically; never implement it by hand.
pub trait Component: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> Component for T {}

/// A typed view of one component slot of one entity, with mutation.
///
/// This is sugar over the corresponding [`Entity`] methods for call sites
/// that talk about a single component type repeatedly.
pub struct Comp<'r, T> {
    owner: Entity<'r>,
    _ph:   PhantomData<fn() -> T>,
}

impl<'r, T: Component> Comp<'r, T> {
    pub(crate) fn new(owner: Entity<'r>) -> Self { Self { owner, _ph: PhantomData } }

    pub fn owner(self) -> Entity<'r> { self.owner }

    pub fn as_const(self) -> ConstComp<'r, T> { ConstComp::new(self.owner.as_const()) }

    /// Whether the owning entity is alive.
    pub fn valid(self) -> bool { self.owner.valid() }

    pub fn exists(self) -> bool { self.owner.exists_component::<T>() }

    pub fn assign(self, value: T) -> Option<T> { self.owner.assign_component(value) }

    pub fn ensure(self, value: T) -> Option<ComponentWrite<T>> {
        self.owner.ensure_component(value)
    }

    pub fn remove(self) -> Option<T> { self.owner.remove_component::<T>() }

    pub fn get(self) -> Result<ComponentRead<T>, Error> { self.owner.get_component::<T>() }

    pub fn get_mut(self) -> Result<ComponentWrite<T>, Error> {
        self.owner.get_component_mut::<T>()
    }

    pub fn find(self) -> Option<ComponentRead<T>> { self.owner.find_component::<T>() }

    pub fn find_mut(self) -> Option<ComponentWrite<T>> { self.owner.find_component_mut::<T>() }
}

/// A read-only typed view of one component slot of one entity.
pub struct ConstComp<'r, T> {
    owner: ConstEntity<'r>,
    _ph:   PhantomData<fn() -> T>,
}

impl<'r, T: Component> ConstComp<'r, T> {
    pub(crate) fn new(owner: ConstEntity<'r>) -> Self { Self { owner, _ph: PhantomData } }

    pub fn owner(self) -> ConstEntity<'r> { self.owner }

    pub fn valid(self) -> bool { self.owner.valid() }

    pub fn exists(self) -> bool { self.owner.exists_component::<T>() }

    pub fn get(self) -> Result<ComponentRead<T>, Error> { self.owner.get_component::<T>() }

    pub fn find(self) -> Option<ComponentRead<T>> { self.owner.find_component::<T>() }
}

impl<'r, T: Component> From<Comp<'r, T>> for ConstComp<'r, T> {
    fn from(comp: Comp<'r, T>) -> Self { comp.as_const() }
}

macro_rules! impl_comp_traits {
    ($handle:ident) => {
        impl<T> Clone for $handle<'_, T> {
            fn clone(&self) -> Self { Self { owner: self.owner, _ph: PhantomData } }
        }

        impl<T> Copy for $handle<'_, T> {}

        impl<T> fmt::Debug for $handle<'_, T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($handle))
                    .field("owner", &self.owner.id())
                    .field("component", &std::any::type_name::<T>())
                    .finish()
            }
        }

        impl<T> PartialEq for $handle<'_, T> {
            fn eq(&self, other: &Self) -> bool { self.owner == other.owner }
        }

        impl<T> Eq for $handle<'_, T> {}

        impl<T> Ord for $handle<'_, T> {
            fn cmp(&self, other: &Self) -> Ordering { self.owner.cmp(&other.owner) }
        }

        impl<T> PartialOrd for $handle<'_, T> {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
        }

        impl<T> Hash for $handle<'_, T> {
            fn hash<H: Hasher>(&self, state: &mut H) { self.owner.hash(state); }
        }
    };
}

impl_comp_traits!(Comp);
impl_comp_traits!(ConstComp);

impl<T> PartialEq<ConstComp<'_, T>> for Comp<'_, T> {
    fn eq(&self, other: &ConstComp<'_, T>) -> bool { self.owner == other.owner }
}

impl<T> PartialEq<Comp<'_, T>> for ConstComp<'_, T> {
    fn eq(&self, other: &Comp<'_, T>) -> bool { self.owner == other.owner }
}
