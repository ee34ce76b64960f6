//! Prototypes: type-erased bundles of component values that can be stamped
//! onto entities.
//!
//! Each recorded component is held by an *applier* — an erased record that
//! knows how to clone its value onto an entity or into an existing
//! component slot. A prototype is a sparse map from family id to applier,
//! so recording the same component type twice replaces the earlier record.

use std::any::Any;
use std::fmt;

use crate::comp::Component;
use crate::entity::Entity;
use crate::family::{Family, FamilyId};
use crate::sparse::SparseMap;

trait AnyApplier: Send + Sync {
    fn clone_box(&self) -> Box<dyn AnyApplier>;
    fn apply_to_entity(&self, entity: Entity<'_>, overwrite: bool);
    fn as_any(&self) -> &dyn Any;
}

struct ValueApplier<T: Component> {
    value: T,
}

impl<T: Component> AnyApplier for ValueApplier<T> {
    fn clone_box(&self) -> Box<dyn AnyApplier> {
        Box::new(Self { value: self.value.clone() })
    }

    fn apply_to_entity(&self, entity: Entity<'_>, overwrite: bool) {
        if overwrite || !entity.exists_component::<T>() {
            entity.assign_component(self.value.clone());
        }
    }

    fn as_any(&self) -> &dyn Any { self }
}

/// A reusable recipe for populating entities with components.
///
/// ```
/// # use weft::{Prototype, Registry};
/// # #[derive(Clone, Debug, PartialEq)] struct Position { x: i32, y: i32 }
/// # #[derive(Clone, Debug, PartialEq)] struct Velocity { x: i32, y: i32 }
/// let proto = Prototype::new()
///     .component(Position { x: 9, y: 9 })
///     .component(Velocity { x: 1, y: 1 });
///
/// let registry = Registry::new();
/// let ent = registry.create_entity_with(&proto).unwrap();
/// assert_eq!(*ent.get_component::<Position>().unwrap(), Position { x: 9, y: 9 });
/// ```
#[derive(Default)]
pub struct Prototype {
    appliers: SparseMap<FamilyId, Box<dyn AnyApplier>>,
}

impl Prototype {
    pub fn new() -> Self { Self::default() }

    /// Records a component value, replacing any earlier record of the same
    /// type. Consuming builder form of [`set_component`](Self::set_component).
    pub fn component<T: Component>(mut self, value: T) -> Self {
        self.set_component(value);
        self
    }

    /// Records a component value, replacing any earlier record of the same
    /// type.
    pub fn set_component<T: Component>(&mut self, value: T) -> &mut Self {
        self.appliers.insert(Family::<T>::id(), Box::new(ValueApplier { value }));
        self
    }

    pub fn has_component<T: Component>(&self) -> bool {
        self.appliers.contains(Family::<T>::id())
    }

    /// Unions the other prototype's appliers into this one. On a collision
    /// the other side wins only when `overwrite` is set.
    pub fn merge_with(&mut self, other: &Prototype, overwrite: bool) -> &mut Self {
        for (family, applier) in other.appliers.iter() {
            if overwrite || !self.appliers.contains(family) {
                self.appliers.insert(family, applier.clone_box());
            }
        }
        self
    }

    /// Applies every recorded component to the entity. When `overwrite` is
    /// unset, components the entity already has are left untouched.
    pub fn apply_to_entity(&self, entity: Entity<'_>, overwrite: bool) {
        for (_, applier) in self.appliers.iter() {
            applier.apply_to_entity(entity, overwrite);
        }
    }

    /// Overwrites an existing component value in place, returning whether a
    /// record for `T` was present.
    pub fn apply_to_component<T: Component>(&self, component: &mut T) -> bool {
        let Some(applier) = self.appliers.get(Family::<T>::id()) else { return false };
        let applier = applier
            .as_any()
            .downcast_ref::<ValueApplier<T>>()
            .expect("applier stored under the family id of its component type");
        *component = applier.value.clone();
        true
    }

    pub fn clear(&mut self) { self.appliers.clear(); }

    pub fn is_empty(&self) -> bool { self.appliers.is_empty() }

    pub fn len(&self) -> usize { self.appliers.len() }
}

impl Clone for Prototype {
    fn clone(&self) -> Self {
        let mut appliers = SparseMap::new();
        for (family, applier) in self.appliers.iter() {
            appliers.insert(family, applier.clone_box());
        }
        Self { appliers }
    }
}

impl fmt::Debug for Prototype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prototype").field("components", &self.appliers.len()).finish()
    }
}
