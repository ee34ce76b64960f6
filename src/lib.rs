//! A sparse-set ECS runtime.
//!
//! # What is ECS?
//! ECS is a data-oriented programming paradigm that focuses on optimizing the CPU cache.
//! Objects ("Entities") store their data in "Components",
//! which are processed in "Systems".
//!
//! # The shape of this crate
//! weft is **registry-centric and dynamically shaped**.
//! An entity is nothing but an identity:
//! a 32-bit id carrying a slot index and a version counter
//! that detects stale handles after the slot has been recycled.
//! Any component type can be attached to or removed from any entity at any time;
//! there is no archetype graph and no up-front registration.
//!
//! Each component type lives in its own column —
//! a sparse map from entity id to value with contiguous dense storage —
//! so iterating one component type walks a plain slice.
//! Iterating several component types at once
//! ([`Registry::for_joined_components`]) walks the column of the *leftmost* type
//! and probes the remaining columns per entity.
//! The leftmost type is therefore a performance contract, not a heuristic:
//! list the scarcest component first.
//!
//! Behavior is organized into [`Feature`]s,
//! each an ordered list of [`System`]s sharing an enable switch.
//! Systems subscribe to plain user event types
//! and receive each event in three phases —
//! [`Before<E>`](system::Before), `E`, [`After<E>`](system::After) —
//! letting setup and teardown logic bracket the main handlers
//! without manual ordering tricks.
//!
//! # Concurrency model
//! A [`Registry`] is `Send + Sync` and every operation takes `&self`.
//! Each component column owns a private reader-writer lock;
//! reads take it shared, mutations take it exclusive.
//! There is no global lock and no built-in scheduler:
//! systems run synchronously on whichever thread calls
//! [`Registry::process_event`].
//! Component access hands out owned guards
//! ([`ComponentRead`](storage::ComponentRead) /
//! [`ComponentWrite`](storage::ComponentWrite))
//! that pin the column lock for their lifetime,
//! so a reference can never outlive the synchronization that protects it.
//!
//! # Example
//! ```
//! use weft::Registry;
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Position { x: i32, y: i32 }
//! #[derive(Clone, Debug, PartialEq)]
//! struct Velocity { x: i32, y: i32 }
//!
//! let registry = Registry::new();
//!
//! let ent = registry.create_entity().unwrap();
//! ent.assign_component(Position { x: 1, y: 2 });
//! ent.assign_component(Velocity { x: 3, y: 4 });
//!
//! registry.for_joined_components_mut::<(Position, Velocity), _>(|_, (p, v)| {
//!     p.x += v.x;
//!     p.y += v.y;
//! });
//!
//! assert_eq!(*ent.get_component::<Position>().unwrap(), Position { x: 4, y: 6 });
//! ```

pub mod aspect;
pub use aspect::Aspect;

pub mod comp;
pub use comp::{Comp, Component, ConstComp};

pub mod entity;
pub use entity::{ConstEntity, Entity, EntityFiller, EntityId};

pub mod family;
pub use family::{Family, FamilyId};

pub mod feature;
pub use feature::Feature;

pub mod filter;
pub use filter::Filter;

pub mod prototype;
pub use prototype::Prototype;

pub mod registry;
pub use registry::{ComponentSet, Error, FeatureRef, MemoryUsage, Registry, RegistryFiller};

pub mod sparse;

pub mod storage;
pub use storage::{ComponentRead, ComponentWrite};

pub mod system;
pub use system::{After, Before, Handler, Subscriptions, System};

pub mod util;
