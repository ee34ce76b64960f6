//! Small shared utilities: the capacity growth policy used by the sparse
//! containers and the re-entrant iteration guard.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Computes the next capacity for a container that currently holds `cur`
/// slots and must grow to at least `min`.
///
/// The policy doubles the current capacity, clamped so that the container
/// jumps straight to `max` once it has passed the halfway point.
///
/// # Panics
/// Panics if `min > max`; the request cannot be satisfied by any capacity.
pub fn next_capacity_size(cur: usize, min: usize, max: usize) -> usize {
    assert!(min <= max, "requested capacity {min} exceeds the container limit {max}");
    if cur >= max / 2 {
        return max;
    }
    // cur < max / 2, so the doubling cannot overflow.
    Ord::max(cur * 2, min)
}

/// A counting lock that supports nested "loans" of a resource.
///
/// [`lock`](Self::lock) bumps a counter and [`unlock`](Self::unlock)
/// decrements it; [`is_locked`](Self::is_locked) reports whether any loan is
/// outstanding. The locker never blocks — it only records that iteration is
/// in progress so that other code can query the fact.
#[derive(Debug, Default)]
pub struct IncrementalLocker {
    count: AtomicUsize,
}

impl IncrementalLocker {
    pub fn new() -> Self { Self::default() }

    pub fn lock(&self) { self.count.fetch_add(1, Ordering::SeqCst); }

    /// # Panics
    /// Panics if the locker is not currently locked.
    pub fn unlock(&self) {
        let prev = self.count.fetch_sub(1, Ordering::SeqCst);
        assert!(prev > 0, "unlock without a matching lock");
    }

    pub fn is_locked(&self) -> bool { self.count.load(Ordering::SeqCst) > 0 }

    /// Takes a loan for the lifetime of the returned guard.
    pub fn guard(&self) -> IncrementalGuard<'_> {
        self.lock();
        IncrementalGuard { locker: self }
    }
}

/// RAII loan on an [`IncrementalLocker`].
pub struct IncrementalGuard<'l> {
    locker: &'l IncrementalLocker,
}

impl Drop for IncrementalGuard<'_> {
    fn drop(&mut self) { self.locker.unlock(); }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_by_doubling_until_half_of_max() {
        assert_eq!(next_capacity_size(0, 1, 1024), 1);
        assert_eq!(next_capacity_size(4, 5, 1024), 8);
        assert_eq!(next_capacity_size(4, 100, 1024), 100);
        assert_eq!(next_capacity_size(512, 513, 1024), 1024);
        assert_eq!(next_capacity_size(1000, 1001, 1024), 1024);
    }

    #[test]
    #[should_panic(expected = "exceeds the container limit")]
    fn rejects_min_above_max() {
        next_capacity_size(0, 11, 10);
    }

    #[test]
    fn incremental_locker_counts_nested_loans() {
        let locker = IncrementalLocker::new();
        assert!(!locker.is_locked());

        let outer = locker.guard();
        assert!(locker.is_locked());
        {
            let _inner = locker.guard();
            assert!(locker.is_locked());
        }
        assert!(locker.is_locked());

        drop(outer);
        assert!(!locker.is_locked());
    }

    #[test]
    #[should_panic(expected = "unlock without a matching lock")]
    fn unlock_without_lock_panics() {
        IncrementalLocker::new().unlock();
    }
}
