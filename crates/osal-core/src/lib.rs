//! # osal-core
//!
//! Blocking primitives and shared plumbing for the osal thread group runtime.
//!
//! This crate is platform-agnostic and contains no OS-specific code.
//! Worker threads and platform hooks live in `osal-runtime`.
//!
//! ## Modules
//!
//! - `semaphore` - Counting semaphore with count-down and count-up modes
//! - `barrier` - Reusable manual/auto-reset rendezvous barrier
//! - `priority` - Thread priority hint
//! - `wait` - Deadlines and the condvar waiting discipline
//! - `error` - Error types
//! - `kprint` - Kernel-style debug printing macros
//! - `env` - Environment variable utilities

pub mod barrier;
pub mod env;
pub mod error;
pub mod kprint;
pub mod priority;
pub mod semaphore;
pub mod wait;

// Re-exports for convenience
pub use barrier::Barrier;
pub use env::{env_get, env_get_bool, env_get_opt, env_get_str, env_get_timeout_ms, env_is_set};
pub use error::{ErrorKind, OsalError, OsalResult};
pub use priority::ThreadPriority;
pub use semaphore::CountingSemaphore;
pub use wait::{Deadline, INFINITE};
