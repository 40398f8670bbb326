//! Library defaults for thread group configuration
//!
//! Environment variables override these at runtime (see `ThreadGroupConfig::from_env`).

/// Workers started at construction
pub const MIN_THREADS: usize = 1;

/// Upper bound on workers; 0 means "same as min"
pub const MAX_THREADS: usize = 0;

/// Hard cap on workers per group
pub const MAX_ALLOWED_THREADS: usize = 1024;

/// Thread priority hint (`ThreadPriority` as u8, 2 = Normal)
pub const THREAD_PRIORITY: u8 = 2;

/// Timeout for the implicit join on drop, in milliseconds; negative is infinite
pub const JOIN_TIMEOUT_MS: i64 = -1;

/// Worker name prefix; workers are named `{prefix}{group}-w{index}`
pub const THREAD_NAME_PREFIX: &str = "osal-tg";

/// Worker stack size in bytes; 0 keeps the platform default
pub const STACK_SIZE: usize = 0;

/// Smallest explicit stack size accepted
pub const MIN_STACK_SIZE: usize = 16 * 1024;

/// Prefix of the environment variables read by `ThreadGroupConfig::from_env`
pub const ENV_PREFIX: &str = "OSAL_";
