//! Systems and their event subscriptions.
//!
//! An event is any `'static` user type; no registration is needed. A system
//! implements [`Handler<E>`] for each event it reacts to and lists those
//! events in [`System::subscriptions`]. The subscription table is the
//! runtime dispatch index: for every listed event type it stores a
//! monomorphized thunk that downcasts the erased system state and event
//! back to their concrete types.
//!
//! Every event is delivered in three phases: [`Before<E>`], then `E`
//! itself, then [`After<E>`]. The phase wrappers are ordinary event types —
//! a system that wants to run in the `before` phase of `Tick` subscribes to
//! `Before<Tick>` and implements `Handler<Before<Tick>>`.

use std::any::{Any, TypeId};
use std::marker::PhantomData;
use std::ops::Deref;

use crate::registry::Registry;

/// The phase delivered ahead of the main event.
///
/// Wraps the event transparently; handlers reach the payload through
/// `Deref` or the public field.
#[repr(transparent)]
pub struct Before<E>(pub E);

impl<E> Deref for Before<E> {
    type Target = E;

    fn deref(&self) -> &E { &self.0 }
}

/// The phase delivered after the main event.
#[repr(transparent)]
pub struct After<E>(pub E);

impl<E> Deref for After<E> {
    type Target = E;

    fn deref(&self) -> &E { &self.0 }
}

/// Reaction of one system to one event type.
pub trait Handler<E: 'static>: 'static {
    fn process(&mut self, owner: &Registry, event: &E);
}

/// A unit of behavior owned by a [`Feature`](crate::Feature).
///
/// ```
/// use weft::{Handler, Registry, Subscriptions, System};
///
/// struct Tick;
/// struct Movement;
///
/// impl Handler<Tick> for Movement {
///     fn process(&mut self, owner: &Registry, _event: &Tick) {
///         // walk components of `owner` here
///     }
/// }
///
/// impl System for Movement {
///     fn subscriptions(sub: &mut Subscriptions<Self>) {
///         sub.event::<Tick>();
///     }
/// }
/// ```
pub trait System: Send + 'static {
    /// Lists every event type this system handles, including any
    /// [`Before`]/[`After`] phases.
    fn subscriptions(sub: &mut Subscriptions<Self>)
    where
        Self: Sized;
}

pub(crate) type DispatchFn = fn(&mut dyn Any, &Registry, &dyn Any);

/// Collects the `(event type, dispatch thunk)` table of one system.
pub struct Subscriptions<S> {
    thunks: Vec<(TypeId, DispatchFn)>,
    _ph:    PhantomData<fn(S)>,
}

impl<S: System> Subscriptions<S> {
    pub(crate) fn new() -> Self { Self { thunks: Vec::new(), _ph: PhantomData } }

    /// Subscribes the system to event type `E`.
    pub fn event<E: 'static>(&mut self) -> &mut Self
    where
        S: Handler<E>,
    {
        self.thunks.push((TypeId::of::<E>(), |system, owner, event| {
            let system = system.downcast_mut::<S>().expect("thunk invoked with foreign system");
            let event = event.downcast_ref::<E>().expect("thunk invoked with foreign event");
            system.process(owner, event);
        }));
        self
    }

    pub(crate) fn into_thunks(self) -> Vec<(TypeId, DispatchFn)> { self.thunks }
}
