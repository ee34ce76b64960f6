//! Process-wide monotonic type ids.
//!
//! Component and feature-tag types are keyed in the registry's sparse tables
//! by a small dense integer rather than by [`TypeId`], so that lookup is a
//! plain array index. Ids are handed out by a single process-wide counter on
//! first query and stay stable for the life of the process. They must not be
//! persisted or shared across processes; their relative order carries no
//! meaning.

use std::any::TypeId;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::OnceLock;

use parking_lot::RwLock;

/// Dense key assigned to a user type. Never zero.
pub type FamilyId = u16;

static FAMILIES: OnceLock<RwLock<Families>> = OnceLock::new();

#[derive(Default)]
struct Families {
    ids:  HashMap<TypeId, FamilyId>,
    next: FamilyId,
}

/// Accessor for the family id of a type.
pub struct Family<T: ?Sized>(PhantomData<fn() -> T>);

impl<T: 'static> Family<T> {
    /// Returns the family id of `T`, allocating it on first query.
    ///
    /// # Panics
    /// Panics if more than [`FamilyId::MAX`] distinct types are queried,
    /// which is a programming error.
    pub fn id() -> FamilyId {
        let families = FAMILIES.get_or_init(RwLock::default);
        let key = TypeId::of::<T>();

        if let Some(&id) = families.read().ids.get(&key) {
            return id;
        }

        let mut families = families.write();
        // Double check: another thread may have allocated between the locks.
        if let Some(&id) = families.ids.get(&key) {
            return id;
        }
        let id = families.next.checked_add(1).expect("family id space exhausted");
        families.next = id;
        families.ids.insert(key, id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Alpha;
    struct Beta;
    struct Gamma;

    #[test]
    fn ids_are_stable_and_distinct() {
        let a = Family::<Alpha>::id();
        let b = Family::<Beta>::id();
        let c = Family::<Gamma>::id();

        assert_ne!(a, 0);
        assert_ne!(b, 0);
        assert_ne!(c, 0);

        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);

        assert_eq!(a, Family::<Alpha>::id());
        assert_eq!(b, Family::<Beta>::id());
        assert_eq!(c, Family::<Gamma>::id());
    }

    #[test]
    fn ids_are_stable_across_threads() {
        let a = Family::<Alpha>::id();
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(Family::<Alpha>::id))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().expect("worker panicked"), a);
        }
    }
}
