//! Shared live-thread counter
//!
//! Handed to one or more thread groups through their configuration. Each
//! worker counts itself in before its group finishes construction and out
//! before its group observes it as exited, so a reading taken after `new()`
//! or `join()` returns is exact.

use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct ThreadCounter {
    live: AtomicUsize,
    peak: AtomicUsize,
}

impl ThreadCounter {
    pub const fn new() -> Self {
        Self {
            live: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub(crate) fn increment(&self) {
        let now = self.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    #[inline]
    pub(crate) fn decrement(&self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }

    /// Worker threads currently alive
    #[inline]
    pub fn get(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Highest value ever observed
    #[inline]
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}
