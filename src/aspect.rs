//! Aspects: compile-time bundles of required component types.
//!
//! An aspect names the components an entity must carry to be interesting to
//! some piece of logic, and offers iteration and matching helpers bound to
//! that bundle.

use std::marker::PhantomData;

use crate::entity::{ConstEntity, Entity};
use crate::filter::{exists_all, ExistsAll, Filter};
use crate::registry::{ComponentSet, Registry};

/// Static facade over a component-set tuple.
///
/// ```
/// # use weft::{Aspect, Registry};
/// # #[derive(Clone)] struct Position(i32);
/// # #[derive(Clone)] struct Velocity(i32);
/// type Moving = Aspect<(Position, Velocity)>;
///
/// # let registry = Registry::new();
/// # let ent = registry.create_entity().unwrap();
/// # ent.assign_component(Position(0));
/// # ent.assign_component(Velocity(0));
/// assert!(Moving::matches(ent.as_const()));
/// Moving::for_each_entity(&registry, |e| { assert_eq!(e, ent.as_const()); });
/// ```
pub struct Aspect<S>(PhantomData<fn() -> S>);

impl<S: ComponentSet> Aspect<S> {
    /// The conjunction of `exists` predicates over the bundle. Degenerates
    /// to an always-true filter for the empty tuple.
    pub fn to_filter() -> ExistsAll<S> { exists_all::<S>() }

    /// Whether the entity carries every component of the bundle.
    pub fn matches(entity: ConstEntity<'_>) -> bool { S::all_exist(entity) }

    /// Visits every entity carrying the bundle.
    pub fn for_each_entity(registry: &Registry, f: impl FnMut(ConstEntity<'_>)) {
        Self::for_each_entity_filtered(registry, f, crate::filter::Always(true));
    }

    /// Visits every entity carrying the bundle and matching the filter.
    pub fn for_each_entity_filtered(
        registry: &Registry,
        mut f: impl FnMut(ConstEntity<'_>),
        filter: impl Filter,
    ) {
        registry.for_each_entity_filtered(|entity| f(entity.as_const()), Self::to_filter() & filter);
    }

    /// Joined iteration over the bundle with shared component references.
    pub fn for_joined_components<F>(registry: &Registry, f: F)
    where
        F: FnMut(ConstEntity<'_>, S::Refs<'_>),
    {
        registry.for_joined_components::<S, F>(f);
    }

    /// Joined iteration over the bundle with mutable component references.
    pub fn for_joined_components_mut<F>(registry: &Registry, f: F)
    where
        F: FnMut(Entity<'_>, S::Muts<'_>),
    {
        registry.for_joined_components_mut::<S, F>(f);
    }

    /// Filtered joined iteration with shared component references.
    pub fn for_joined_components_filtered<F>(registry: &Registry, f: F, filter: impl Filter)
    where
        F: FnMut(ConstEntity<'_>, S::Refs<'_>),
    {
        registry.for_joined_components_filtered::<S, F>(f, filter);
    }

    /// Filtered joined iteration with mutable component references.
    pub fn for_joined_components_mut_filtered<F>(registry: &Registry, f: F, filter: impl Filter)
    where
        F: FnMut(Entity<'_>, S::Muts<'_>),
    {
        registry.for_joined_components_mut_filtered::<S, F>(f, filter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::exists;

    #[derive(Clone)]
    struct Position(#[allow(dead_code)] i32);

    #[derive(Clone)]
    struct Velocity(i32);

    #[derive(Clone)]
    struct Frozen;

    #[test]
    fn matches_requires_the_whole_bundle() {
        let registry = Registry::new();
        let full = registry.create_entity().expect("fresh registry");
        full.assign_component(Position(1));
        full.assign_component(Velocity(1));
        let partial = registry.create_entity().expect("fresh registry");
        partial.assign_component(Position(1));

        assert!(Aspect::<(Position, Velocity)>::matches(full.as_const()));
        assert!(!Aspect::<(Position, Velocity)>::matches(partial.as_const()));

        assert!(Aspect::<(Position, Velocity)>::to_filter().matches(full.as_const()));
        assert!(!Aspect::<(Position, Velocity)>::to_filter().matches(partial.as_const()));
    }

    #[test]
    fn empty_bundle_matches_everything() {
        let registry = Registry::new();
        let bare = registry.create_entity().expect("fresh registry");

        assert!(Aspect::<()>::matches(bare.as_const()));
        assert!(Aspect::<()>::to_filter().matches(bare.as_const()));
    }

    #[test]
    fn iteration_visits_exactly_the_bundle_carriers() {
        let registry = Registry::new();
        let moving = registry.create_entity().expect("fresh registry");
        moving.assign_component(Position(0));
        moving.assign_component(Velocity(5));
        let stuck = registry.create_entity().expect("fresh registry");
        stuck.assign_component(Position(0));

        let mut seen = Vec::new();
        Aspect::<(Position, Velocity)>::for_each_entity(&registry, |e| seen.push(e.id()));
        assert_eq!(seen, [moving.id()]);

        Aspect::<(Position, Velocity)>::for_joined_components_mut(&registry, |_, (p, v)| {
            p.0 += v.0;
        });
        assert_eq!(moving.get_component::<Position>().expect("assigned").0, 5);
    }

    #[test]
    fn filtered_iteration_applies_extra_predicates() {
        let registry = Registry::new();
        let moving = registry.create_entity().expect("fresh registry");
        moving.assign_component(Position(0));
        moving.assign_component(Velocity(5));
        let frozen = registry.create_entity().expect("fresh registry");
        frozen.assign_component(Position(0));
        frozen.assign_component(Velocity(5));
        frozen.assign_component(Frozen);

        let mut seen = Vec::new();
        Aspect::<(Position, Velocity)>::for_each_entity_filtered(
            &registry,
            |e| seen.push(e.id()),
            !exists::<Frozen>(),
        );
        assert_eq!(seen, [moving.id()]);
    }
}
