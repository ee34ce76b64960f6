//! Entity predicates and their combinators.
//!
//! A filter is a boolean predicate over an entity, evaluated during
//! iteration before the user closure runs. The set is closed: the leaf
//! predicates test component presence, and combinators negate, conjoin and
//! disjoin them. Rust's `&&`/`||` cannot be overloaded, so the conventional
//! combinator operators `!`, `&` and `|` are implemented instead; both
//! still evaluate left to right and short-circuit.
//!
//! ```
//! # use weft::{filter, Filter, Registry};
//! # #[derive(Clone)] struct Position(i32);
//! # #[derive(Clone)] struct Velocity(i32);
//! # let registry = Registry::new();
//! # let ent = registry.create_entity().unwrap();
//! # ent.assign_component(Position(0));
//! let moving = filter::exists::<Position>() & filter::exists::<Velocity>();
//! assert!(!moving.matches(ent.as_const()));
//! ```

use std::marker::PhantomData;
use std::ops;

use crate::comp::Component;
use crate::entity::ConstEntity;
use crate::registry::ComponentSet;

/// A boolean predicate over an entity.
pub trait Filter {
    fn matches(&self, entity: ConstEntity<'_>) -> bool;
}

impl<F: Filter + ?Sized> Filter for &F {
    fn matches(&self, entity: ConstEntity<'_>) -> bool { (**self).matches(entity) }
}

/// Matches entities carrying a `T` component. See [`exists`].
#[derive(Debug)]
pub struct Exists<T>(PhantomData<fn() -> T>);

/// Matches entities carrying a `T` component.
pub fn exists<T: Component>() -> Exists<T> { Exists(PhantomData) }

impl<T: Component> Filter for Exists<T> {
    fn matches(&self, entity: ConstEntity<'_>) -> bool { entity.exists_component::<T>() }
}

/// Matches entities carrying at least one component of the set `S`.
/// See [`exists_any`].
#[derive(Debug)]
pub struct ExistsAny<S>(PhantomData<fn() -> S>);

/// Matches entities carrying at least one component of the tuple `S`.
pub fn exists_any<S: ComponentSet>() -> ExistsAny<S> { ExistsAny(PhantomData) }

impl<S: ComponentSet> Filter for ExistsAny<S> {
    fn matches(&self, entity: ConstEntity<'_>) -> bool { S::any_exists(entity) }
}

/// Matches entities carrying every component of the set `S`.
/// See [`exists_all`].
#[derive(Debug)]
pub struct ExistsAll<S>(PhantomData<fn() -> S>);

/// Matches entities carrying every component of the tuple `S`.
pub fn exists_all<S: ComponentSet>() -> ExistsAll<S> { ExistsAll(PhantomData) }

impl<S: ComponentSet> Filter for ExistsAll<S> {
    fn matches(&self, entity: ConstEntity<'_>) -> bool { S::all_exist(entity) }
}

/// Negation of a filter; built with `!`.
#[derive(Debug, Clone, Copy)]
pub struct Not<F>(pub F);

impl<F: Filter> Filter for Not<F> {
    fn matches(&self, entity: ConstEntity<'_>) -> bool { !self.0.matches(entity) }
}

/// Short-circuit conjunction; built with `&`.
#[derive(Debug, Clone, Copy)]
pub struct And<A, B>(pub A, pub B);

impl<A: Filter, B: Filter> Filter for And<A, B> {
    fn matches(&self, entity: ConstEntity<'_>) -> bool {
        self.0.matches(entity) && self.1.matches(entity)
    }
}

/// Short-circuit disjunction; built with `|`.
#[derive(Debug, Clone, Copy)]
pub struct Or<A, B>(pub A, pub B);

impl<A: Filter, B: Filter> Filter for Or<A, B> {
    fn matches(&self, entity: ConstEntity<'_>) -> bool {
        self.0.matches(entity) || self.1.matches(entity)
    }
}

/// A constant predicate, the unit of conjunction and disjunction.
#[derive(Debug, Clone, Copy)]
pub struct Always(pub bool);

impl Filter for Always {
    fn matches(&self, _entity: ConstEntity<'_>) -> bool { self.0 }
}

macro_rules! impl_marker_copy {
    ($ty:ident) => {
        impl<S> Clone for $ty<S> {
            fn clone(&self) -> Self { *self }
        }

        impl<S> Copy for $ty<S> {}
    };
}

impl_marker_copy!(Exists);
impl_marker_copy!(ExistsAny);
impl_marker_copy!(ExistsAll);

macro_rules! impl_filter_ops {
    ($ty:ty => $($param:ident),*) => {
        impl<$($param),*> ops::Not for $ty
        where
            Self: Filter,
        {
            type Output = Not<Self>;

            fn not(self) -> Not<Self> { Not(self) }
        }

        impl<$($param,)* RhsF> ops::BitAnd<RhsF> for $ty
        where
            Self: Filter,
            RhsF: Filter,
        {
            type Output = And<Self, RhsF>;

            fn bitand(self, rhs: RhsF) -> And<Self, RhsF> { And(self, rhs) }
        }

        impl<$($param,)* RhsF> ops::BitOr<RhsF> for $ty
        where
            Self: Filter,
            RhsF: Filter,
        {
            type Output = Or<Self, RhsF>;

            fn bitor(self, rhs: RhsF) -> Or<Self, RhsF> { Or(self, rhs) }
        }
    };
}

impl_filter_ops!(Exists<T> => T);
impl_filter_ops!(ExistsAny<S> => S);
impl_filter_ops!(ExistsAll<S> => S);
impl_filter_ops!(Not<F> => F);
impl_filter_ops!(And<A, B> => A, B);
impl_filter_ops!(Or<A, B> => A, B);
impl_filter_ops!(Always =>);
