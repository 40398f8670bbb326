//! Thread-local worker identity
//!
//! A worker thread records which group it belongs to so group operations can
//! tell calls made from their own tasks apart from external ones.

use std::cell::Cell;

/// Marker for "not a worker thread"
const NO_GROUP: u64 = 0;

thread_local! {
    /// Id of the group this OS thread works for
    static GROUP_ID: Cell<u64> = const { Cell::new(NO_GROUP) };

    /// Index of this worker within its group
    static WORKER_INDEX: Cell<usize> = const { Cell::new(usize::MAX) };
}

/// Mark the current thread as worker `index` of group `group_id`
#[inline]
pub(crate) fn enter_worker(group_id: u64, index: usize) {
    debug_assert_ne!(group_id, NO_GROUP);
    GROUP_ID.with(|cell| cell.set(group_id));
    WORKER_INDEX.with(|cell| cell.set(index));
}

/// Clear the worker identity (worker exiting)
#[inline]
pub(crate) fn leave_worker() {
    GROUP_ID.with(|cell| cell.set(NO_GROUP));
    WORKER_INDEX.with(|cell| cell.set(usize::MAX));
}

/// Group id of the current thread, `None` if not a worker
#[inline]
pub fn current_group_id() -> Option<u64> {
    let id = GROUP_ID.with(|cell| cell.get());
    if id == NO_GROUP {
        None
    } else {
        Some(id)
    }
}

/// Worker index of the current thread, `None` if not a worker
#[inline]
pub fn current_worker_index() -> Option<usize> {
    let idx = WORKER_INDEX.with(|cell| cell.get());
    if idx == usize::MAX {
        None
    } else {
        Some(idx)
    }
}

/// Check if the current thread is a worker of group `group_id`
#[inline]
pub fn is_worker_of(group_id: u64) -> bool {
    current_group_id() == Some(group_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_roundtrip() {
        let h = std::thread::spawn(|| {
            assert_eq!(current_group_id(), None);
            assert_eq!(current_worker_index(), None);

            enter_worker(7, 2);
            assert!(is_worker_of(7));
            assert!(!is_worker_of(8));
            assert_eq!(current_worker_index(), Some(2));

            leave_worker();
            assert!(!is_worker_of(7));
            assert_eq!(current_group_id(), None);
        });
        h.join().unwrap();
    }
}
