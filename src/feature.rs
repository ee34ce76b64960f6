//! Features: ordered groups of systems sharing an enable switch.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::registry::Registry;
use crate::system::{After, Before, DispatchFn, Subscriptions, System};

struct SystemCell {
    state:  Mutex<Box<dyn Any + Send>>,
    thunks: Vec<(TypeId, DispatchFn)>,
}

/// An ordered list of systems with a shared enable flag.
///
/// Insertion order is dispatch order. Disabling a feature only gates
/// dispatch; the systems stay registered and resume untouched when the
/// feature is re-enabled.
///
/// All operations take `&self`: the system list sits behind a
/// reader-writer lock and each system's state behind its own mutex, so a
/// feature can be driven from several threads while another one registers
/// systems.
#[derive(Default)]
pub struct Feature {
    disabled: AtomicBool,
    systems:  RwLock<Vec<SystemCell>>,
}

impl Feature {
    pub fn new() -> Self { Self::default() }

    /// Appends a system. Consuming builder form of
    /// [`add_system`](Self::add_system).
    pub fn with_system<S: System>(self, system: S) -> Self {
        self.add_system(system);
        self
    }

    /// Appends a system; it will be dispatched after every system added
    /// earlier.
    pub fn add_system<S: System>(&self, system: S) -> &Self {
        let mut sub = Subscriptions::new();
        S::subscriptions(&mut sub);
        self.systems.write().push(SystemCell {
            state:  Mutex::new(Box::new(system)),
            thunks: sub.into_thunks(),
        });
        self
    }

    pub fn enable(&self) -> &Self {
        self.disabled.store(false, Ordering::SeqCst);
        self
    }

    pub fn disable(&self) -> &Self {
        self.disabled.store(true, Ordering::SeqCst);
        self
    }

    pub fn is_enabled(&self) -> bool { !self.disabled.load(Ordering::SeqCst) }

    pub fn is_disabled(&self) -> bool { self.disabled.load(Ordering::SeqCst) }

    pub fn system_count(&self) -> usize { self.systems.read().len() }

    /// Delivers an event to every interested system, in three phases:
    /// [`Before<E>`], `E`, [`After<E>`]. Within each phase systems run in
    /// insertion order. The system list is read-locked for the whole
    /// delivery, so all three phases see the same list.
    ///
    /// Dispatch ignores the enable flag; gating happens in
    /// [`Registry::process_event`].
    pub fn process_event<E: 'static>(&self, owner: &Registry, event: &E) {
        let systems = self.systems.read();

        // Safety: Before<E> and After<E> are repr(transparent) over E, so a
        // reference to the event is a valid reference to either wrapper.
        let before = unsafe { &*(event as *const E as *const Before<E>) };
        let after = unsafe { &*(event as *const E as *const After<E>) };

        Self::fire(&systems, owner, before);
        Self::fire(&systems, owner, event);
        Self::fire(&systems, owner, after);
    }

    fn fire<E: 'static>(systems: &[SystemCell], owner: &Registry, event: &E) {
        let target = TypeId::of::<E>();
        for cell in systems {
            for &(type_id, thunk) in &cell.thunks {
                if type_id == target {
                    let mut state = cell.state.lock();
                    thunk(&mut **state, owner, event);
                }
            }
        }
    }
}

impl fmt::Debug for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Feature")
            .field("enabled", &self.is_enabled())
            .field("systems", &self.system_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::system::Handler;

    struct Step(#[allow(dead_code)] u32);
    struct Other;

    struct Recorder {
        name:  &'static str,
        trace: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder {
        fn log(&self, phase: &str) { self.trace.lock().push(format!("{phase}.{}", self.name)); }
    }

    impl Handler<Before<Step>> for Recorder {
        fn process(&mut self, _: &Registry, _: &Before<Step>) { self.log("before"); }
    }

    impl Handler<Step> for Recorder {
        fn process(&mut self, _: &Registry, _: &Step) { self.log("step"); }
    }

    impl Handler<After<Step>> for Recorder {
        fn process(&mut self, _: &Registry, _: &After<Step>) { self.log("after"); }
    }

    impl System for Recorder {
        fn subscriptions(sub: &mut Subscriptions<Self>) {
            sub.event::<Before<Step>>().event::<Step>().event::<After<Step>>();
        }
    }

    #[test]
    fn phases_run_in_order_over_all_systems() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let feature = Feature::new()
            .with_system(Recorder { name: "s1", trace: Arc::clone(&trace) })
            .with_system(Recorder { name: "s2", trace: Arc::clone(&trace) });

        let registry = Registry::new();
        feature.process_event(&registry, &Step(0));

        assert_eq!(
            *trace.lock(),
            ["before.s1", "before.s2", "step.s1", "step.s2", "after.s1", "after.s2"],
        );
    }

    #[test]
    fn unsubscribed_events_are_ignored() {
        let trace = Arc::new(Mutex::new(Vec::new()));
        let feature = Feature::new().with_system(Recorder { name: "s1", trace: Arc::clone(&trace) });

        let registry = Registry::new();
        feature.process_event(&registry, &Other);

        assert!(trace.lock().is_empty());
    }

    #[test]
    fn enable_flag_toggles() {
        let feature = Feature::new();
        assert!(feature.is_enabled());
        assert!(!feature.is_disabled());

        feature.disable();
        assert!(feature.is_disabled());

        feature.enable();
        assert!(feature.is_enabled());
    }

    #[test]
    fn systems_keep_state_between_events() {
        struct Counter {
            seen: u32,
            out:  Arc<Mutex<u32>>,
        }

        impl Handler<Step> for Counter {
            fn process(&mut self, _: &Registry, _: &Step) {
                self.seen += 1;
                *self.out.lock() = self.seen;
            }
        }

        impl System for Counter {
            fn subscriptions(sub: &mut Subscriptions<Self>) { sub.event::<Step>(); }
        }

        let out = Arc::new(Mutex::new(0));
        let feature = Feature::new().with_system(Counter { seen: 0, out: Arc::clone(&out) });

        let registry = Registry::new();
        feature.process_event(&registry, &Step(1));
        feature.process_event(&registry, &Step(2));

        assert_eq!(*out.lock(), 2);
    }
}
