//! # osal - semaphores, barriers and thread groups
//!
//! A small concurrency runtime built from three layered primitives:
//!
//! - **`CountingSemaphore`**: signed-count semaphore with a maximum. A
//!   negative initial count makes a thread wait for that many posts.
//! - **`Barrier`**: reusable rendezvous, manual or auto-reset.
//! - **`ThreadGroup`**: fixed pool of OS worker threads running queued tasks
//!   in FIFO order, with a Running / Stopped / Draining / Joining lifecycle.
//!   Tasks may call back into their own group (drain, stop, join, destroy)
//!   without deadlocking their worker.
//!
//! Every operation reports failure through [`OsalResult`]; nothing panics on
//! misuse.
//!
//! ## Quick Start
//!
//! ```ignore
//! use osal::{ThreadGroup, ThreadPriority, INFINITE};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! let group = ThreadGroup::new(4, 0, ThreadPriority::Normal, INFINITE)?;
//! let hits = Arc::new(AtomicUsize::new(0));
//! for _ in 0..100 {
//!     let hits = Arc::clone(&hits);
//!     group.add(move || {
//!         hits.fetch_add(1, Ordering::SeqCst);
//!     })?;
//! }
//! group.drain()?;
//! assert_eq!(hits.load(Ordering::SeqCst), 100);
//! group.destroy(INFINITE)?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │            Application code  /  tasks in the group          │
//! │      add(), stop(), start(), drain(), join(), destroy()     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       ThreadGroup                           │
//! │     one mutex: state, WorkQueue, drain cycle, driver        │
//! └─────────────────────────────────────────────────────────────┘
//!          │                   │                   │
//!          ▼                   ▼                   ▼
//!    ┌───────────┐      ┌───────────┐      ┌───────────┐
//!    │  Worker   │      │  Worker   │      │  Worker   │
//!    │  Thread   │      │  Thread   │      │  Thread   │
//!    └───────────┘      └───────────┘      └───────────┘
//!                              │
//!                              ▼
//!    ┌─────────────────────────────────────────────────────────┐
//!    │      CountingSemaphore / Barrier  (Mutex + Condvar)     │
//!    └─────────────────────────────────────────────────────────┘
//! ```

// Re-export core types
pub use osal_core::{
    Barrier,
    CountingSemaphore,
    Deadline,
    ErrorKind,
    OsalError,
    OsalResult,
    ThreadPriority,
    INFINITE,
};

// Re-export kprint macros for debug logging
pub use osal_core::{kprint, kprintln, kerror, kwarn, kinfo, kdebug, ktrace};
pub use osal_core::kprint::{LogLevel, init as init_logging, set_log_level, set_flush_enabled};

// Re-export env utilities
pub use osal_core::env::{env_get, env_get_bool, env_get_opt, env_get_str, env_get_timeout_ms, env_is_set};

// Re-export runtime types
pub use osal_runtime::{
    ConfigError,
    Dispatchable,
    GroupState,
    Task,
    ThreadCounter,
    ThreadGroup,
    ThreadGroupConfig,
    WorkQueue,
};
pub use osal_runtime::config;
pub use osal_runtime::tls::{current_group_id, current_worker_index};
