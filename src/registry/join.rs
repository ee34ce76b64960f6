//! Tuples of component types and the joined iteration built over them.
//!
//! The trait is implemented for tuples up to six component types. The
//! leftmost type is always the driver: its column is walked densely while
//! the rest are probed per entity, so the declared order is part of the
//! performance contract.

use crate::comp::Component;
use crate::entity::{ConstEntity, Entity, EntityId};
use crate::filter::Filter;
use crate::registry::{Error, Registry};
use crate::storage::{ComponentRead, ComponentWrite};

/// A tuple of component types used for joined iteration, batch access and
/// the `exists_any`/`exists_all` filters.
pub trait ComponentSet: 'static {
    /// Shared references to the components of one entity.
    type Refs<'a>;
    /// Mutable references to the components of one entity.
    type Muts<'a>;
    /// Tuple of read guards, one per component.
    type Reads;
    /// Tuple of write guards, one per component.
    type Writes;
    /// Tuple of optional read guards, one per component.
    type Finds;
    /// Tuple of optional write guards, one per component.
    type FindsMut;

    fn all_exist(entity: ConstEntity<'_>) -> bool;
    fn any_exists(entity: ConstEntity<'_>) -> bool;

    fn for_each<Flt: Filter, Fun>(registry: &Registry, filter: &Flt, f: Fun)
    where
        Fun: FnMut(ConstEntity<'_>, Self::Refs<'_>);

    fn for_each_mut<Flt: Filter, Fun>(registry: &Registry, filter: &Flt, f: Fun)
    where
        Fun: FnMut(Entity<'_>, Self::Muts<'_>);

    fn read_components(registry: &Registry, id: EntityId) -> Result<Self::Reads, Error>;
    fn write_components(registry: &Registry, id: EntityId) -> Result<Self::Writes, Error>;
    fn find_components(registry: &Registry, id: EntityId) -> Self::Finds;
    fn find_components_mut(registry: &Registry, id: EntityId) -> Self::FindsMut;
}

/// The empty set: joined iteration degenerates to plain entity iteration.
impl ComponentSet for () {
    type Refs<'a> = ();
    type Muts<'a> = ();
    type Reads = ();
    type Writes = ();
    type Finds = ();
    type FindsMut = ();

    fn all_exist(_entity: ConstEntity<'_>) -> bool { true }

    fn any_exists(_entity: ConstEntity<'_>) -> bool { false }

    fn for_each<Flt: Filter, Fun>(registry: &Registry, filter: &Flt, mut f: Fun)
    where
        Fun: FnMut(ConstEntity<'_>, ()),
    {
        registry.for_each_entity_filtered(|ent| f(ent.as_const(), ()), filter);
    }

    fn for_each_mut<Flt: Filter, Fun>(registry: &Registry, filter: &Flt, mut f: Fun)
    where
        Fun: FnMut(Entity<'_>, ()),
    {
        registry.for_each_entity_filtered(|ent| f(ent, ()), filter);
    }

    fn read_components(_registry: &Registry, _id: EntityId) -> Result<(), Error> { Ok(()) }

    fn write_components(_registry: &Registry, _id: EntityId) -> Result<(), Error> { Ok(()) }

    fn find_components(_registry: &Registry, _id: EntityId) {}

    fn find_components_mut(_registry: &Registry, _id: EntityId) {}
}

macro_rules! impl_component_set {
    ($first:ident $(, $rest:ident / $storage:ident $guard:ident $index:ident)*) => {
        impl<$first: Component $(, $rest: Component)*> ComponentSet for ($first, $($rest,)*) {
            type Refs<'a> = (&'a $first, $(&'a $rest,)*);
            type Muts<'a> = (&'a mut $first, $(&'a mut $rest,)*);
            type Reads = (ComponentRead<$first>, $(ComponentRead<$rest>,)*);
            type Writes = (ComponentWrite<$first>, $(ComponentWrite<$rest>,)*);
            type Finds = (Option<ComponentRead<$first>>, $(Option<ComponentRead<$rest>>,)*);
            type FindsMut = (Option<ComponentWrite<$first>>, $(Option<ComponentWrite<$rest>>,)*);

            fn all_exist(entity: ConstEntity<'_>) -> bool {
                entity.exists_component::<$first>() $(&& entity.exists_component::<$rest>())*
            }

            fn any_exists(entity: ConstEntity<'_>) -> bool {
                entity.exists_component::<$first>() $(|| entity.exists_component::<$rest>())*
            }

            fn for_each<Flt: Filter, Fun>(registry: &Registry, filter: &Flt, mut f: Fun)
            where
                Fun: FnMut(ConstEntity<'_>, Self::Refs<'_>),
            {
                let Some(driver) = registry.find_storage::<$first>() else { return };
                $(let Some($storage) = registry.find_storage::<$rest>() else { return };)*

                let cells = driver.cells().read();
                for dense in 0..cells.len() {
                    let id = cells.key_at(dense);
                    let entity = ConstEntity::new(registry, id);
                    if !filter.matches(entity) {
                        continue;
                    }
                    $(
                        let $guard = $storage.cells().read();
                        let Some($index) = $guard.dense_index_of(id) else { continue };
                    )*
                    f(entity, (cells.value_at(dense), $($guard.value_at($index),)*));
                }
            }

            fn for_each_mut<Flt: Filter, Fun>(registry: &Registry, filter: &Flt, mut f: Fun)
            where
                Fun: FnMut(Entity<'_>, Self::Muts<'_>),
            {
                let Some(driver) = registry.find_storage::<$first>() else { return };
                $(let Some($storage) = registry.find_storage::<$rest>() else { return };)*

                let mut cells = driver.cells().write();
                for dense in 0..cells.len() {
                    let id = cells.key_at(dense);
                    let entity = Entity::new(registry, id);
                    if !filter.matches(entity.as_const()) {
                        continue;
                    }
                    $(
                        let mut $guard = $storage.cells().write();
                        let Some($index) = $guard.dense_index_of(id) else { continue };
                    )*
                    f(entity, (cells.value_at_mut(dense), $($guard.value_at_mut($index),)*));
                }
            }

            fn read_components(registry: &Registry, id: EntityId) -> Result<Self::Reads, Error> {
                Ok((
                    registry.get_component::<$first>(id)?,
                    $(registry.get_component::<$rest>(id)?,)*
                ))
            }

            fn write_components(registry: &Registry, id: EntityId) -> Result<Self::Writes, Error> {
                Ok((
                    registry.get_component_mut::<$first>(id)?,
                    $(registry.get_component_mut::<$rest>(id)?,)*
                ))
            }

            fn find_components(registry: &Registry, id: EntityId) -> Self::Finds {
                (
                    registry.find_component::<$first>(id),
                    $(registry.find_component::<$rest>(id),)*
                )
            }

            fn find_components_mut(registry: &Registry, id: EntityId) -> Self::FindsMut {
                (
                    registry.find_component_mut::<$first>(id),
                    $(registry.find_component_mut::<$rest>(id),)*
                )
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B / s_b g_b i_b);
impl_component_set!(A, B / s_b g_b i_b, C / s_c g_c i_c);
impl_component_set!(A, B / s_b g_b i_b, C / s_c g_c i_c, D / s_d g_d i_d);
impl_component_set!(A, B / s_b g_b i_b, C / s_c g_c i_c, D / s_d g_d i_d, E / s_e g_e i_e);
impl_component_set!(
    A,
    B / s_b g_b i_b,
    C / s_c g_c i_c,
    D / s_d g_d i_d,
    E / s_e g_e i_e,
    F / s_f g_f i_f
);
