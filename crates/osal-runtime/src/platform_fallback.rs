//! Portable platform fallback
//!
//! Used where per-thread priorities are not supported; the hint is ignored.

use osal_core::ThreadPriority;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};

/// Fallback platform handler
pub struct FallbackPlatform;

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_ID: u64 = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
}

impl FallbackPlatform {
    pub fn apply_priority(_priority: ThreadPriority) -> io::Result<()> {
        Ok(())
    }

    /// Process-unique id of the calling thread
    #[inline]
    pub fn thread_id() -> u64 {
        THREAD_ID.with(|id| *id)
    }
}
