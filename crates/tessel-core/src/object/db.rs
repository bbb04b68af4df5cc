//! Live object table
//!
//! Append-only arena of auto-disposable objects. Disposal tombstones a slot
//! instead of removing it, so keys stay valid while a teardown sweep walks
//! the table backwards.

use super::Object;
use crate::error::RuntimeError;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Snapshot of the live object table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DbStats {
    /// Slots ever allocated (live and tombstoned)
    pub slots: usize,
    /// Slots holding a live object
    pub live: usize,
}

/// A disposal that failed during a teardown sweep
#[derive(Debug)]
pub struct DisposeFailure {
    pub hash_code: u64,
    pub class_name: String,
    pub error: RuntimeError,
}

/// Outcome of [`Runtime::dispose_all`](crate::Runtime::dispose_all)
#[derive(Debug, Default)]
pub struct TeardownReport {
    /// Objects visited by the sweep (all of them end up disposed)
    pub disposed: usize,
    /// Disposals whose destructors failed
    pub failures: Vec<DisposeFailure>,
}

impl TeardownReport {
    /// Whether every disposal succeeded
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Default)]
pub(crate) struct ObjectDb {
    slots: Mutex<Vec<Option<Object>>>,
    next_hash: AtomicU64,
    global_dispose: AtomicBool,
}

impl ObjectDb {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Issue the next hash code
    pub(crate) fn next_hash_code(&self) -> u64 {
        self.next_hash.fetch_add(1, Ordering::Relaxed)
    }

    /// Append an object, returning its key
    pub(crate) fn register(&self, object: &Object) -> usize {
        let mut slots = self.slots.lock();
        let key = slots.len();
        slots.push(Some(object.clone()));
        key
    }

    /// Tombstone a slot
    pub(crate) fn release(&self, key: usize) {
        if let Some(slot) = self.slots.lock().get_mut(key) {
            *slot = None;
        }
    }

    pub(crate) fn get(&self, key: usize) -> Option<Object> {
        self.slots.lock().get(key).cloned().flatten()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub(crate) fn live_objects(&self) -> Vec<Object> {
        self.slots.lock().iter().flatten().cloned().collect()
    }

    pub(crate) fn stats(&self) -> DbStats {
        let slots = self.slots.lock();
        DbStats {
            slots: slots.len(),
            live: slots.iter().filter(|slot| slot.is_some()).count(),
        }
    }

    pub(crate) fn begin_global_dispose(&self) {
        self.global_dispose.store(true, Ordering::SeqCst);
    }

    pub(crate) fn in_global_dispose(&self) -> bool {
        self.global_dispose.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_codes_are_monotonic() {
        let db = ObjectDb::new();
        let a = db.next_hash_code();
        let b = db.next_hash_code();
        assert!(b > a);
    }

    #[test]
    fn test_empty_stats() {
        let db = ObjectDb::new();
        assert_eq!(db.stats(), DbStats::default());
        assert!(db.get(0).is_none());
        assert!(!db.in_global_dispose());
        db.begin_global_dispose();
        assert!(db.in_global_dispose());
    }

    #[test]
    fn test_report_clean() {
        let mut report = TeardownReport::default();
        assert!(report.is_clean());
        report.failures.push(DisposeFailure {
            hash_code: 7,
            class_name: "app.Leaky".to_string(),
            error: RuntimeError::callback("boom"),
        });
        assert!(!report.is_clean());
    }
}
