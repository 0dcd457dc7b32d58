//! Single-flight admission per MR iid.
//!
//! An iid is a member of the set exactly while a review for it is between
//! admission and completion. The guard removes its iid on drop, so the
//! slot is released on every exit path, early returns and panics
//! included. The set lives in process memory only and starts empty on
//! restart; the review label covers rediscovery across restarts.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

/// Set of MR iids currently being reviewed. Clones share the same set.
#[derive(Debug, Clone, Default)]
pub struct ProcessingState {
    inner: Arc<Mutex<HashSet<u64>>>,
}

impl ProcessingState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admits `iid` unless a review for it is already in flight.
    /// Returns the guard whose drop releases the slot.
    pub fn try_acquire(&self, iid: u64) -> Option<ProcessingGuard> {
        let mut set = self.lock();
        if !set.insert(iid) {
            return None;
        }
        Some(ProcessingGuard {
            state: self.clone(),
            iid,
        })
    }

    /// Whether a review for `iid` is currently in flight.
    pub fn is_processing(&self, iid: u64) -> bool {
        self.lock().contains(&iid)
    }

    fn release(&self, iid: u64) {
        self.lock().remove(&iid);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<u64>> {
        // Poisoning only means another review panicked; the set itself is
        // still coherent (inserts/removes are atomic under the lock).
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Held for the duration of one pipeline run.
#[derive(Debug)]
pub struct ProcessingGuard {
    state: ProcessingState,
    iid: u64,
}

impl ProcessingGuard {
    pub fn iid(&self) -> u64 {
        self.iid
    }
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        self.state.release(self.iid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_admission_is_rejected_until_release() {
        let state = ProcessingState::new();

        let guard = state.try_acquire(42).expect("first admission");
        assert!(state.try_acquire(42).is_none());
        assert!(state.is_processing(42));

        // a different iid is unaffected
        assert!(state.try_acquire(43).is_some());

        drop(guard);
        assert!(!state.is_processing(42));
        assert!(state.try_acquire(42).is_some());
    }

    #[test]
    fn guard_releases_on_panic() {
        let state = ProcessingState::new();
        let inner = state.clone();

        let result = std::panic::catch_unwind(move || {
            let _guard = inner.try_acquire(7).expect("admission");
            panic!("pipeline blew up");
        });

        assert!(result.is_err());
        assert!(!state.is_processing(7));
    }

    #[test]
    fn repeated_admissions_yield_exactly_one_winner() {
        let state = ProcessingState::new();

        let guards: Vec<_> = (0..16).map(|_| state.try_acquire(99)).collect();
        let winners = guards.iter().filter(|g| g.is_some()).count();
        assert_eq!(winners, 1);

        drop(guards);
        assert!(!state.is_processing(99));
    }
}
