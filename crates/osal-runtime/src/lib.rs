//! # osal-runtime
//!
//! Worker thread runtime for the OSAL thread group.
//!
//! This crate provides:
//! - `ThreadGroup`: a fixed set of OS worker threads fed from a FIFO queue,
//!   with a Running / Stopped / Draining / Joining lifecycle that tolerates
//!   calls made from its own tasks
//! - Task and work queue types
//! - Configuration with environment overrides
//! - Platform hooks for worker thread priority

pub mod config;
pub mod counter;
pub mod group;
pub mod task;
pub mod tls;
pub mod work_queue;
mod worker;

// Re-exports
pub use config::{ConfigError, ThreadGroupConfig};
pub use counter::ThreadCounter;
pub use group::{GroupState, ThreadGroup};
pub use task::{Dispatchable, Task};
pub use work_queue::WorkQueue;

// Platform detection
cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        mod platform_linux;
        pub use platform_linux::LinuxPlatform as CurrentPlatform;
    } else {
        mod platform_fallback;
        pub use platform_fallback::FallbackPlatform as CurrentPlatform;
    }
}
