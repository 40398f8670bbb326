//! Thread group configuration
//!
//! Provides compile-time defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Builder calls
//! 2. Environment variables (runtime, `from_env()` only)
//! 3. Library defaults
//!
//! # Example
//!
//! ```rust,ignore
//! use osal_runtime::config::ThreadGroupConfig;
//!
//! // Use defaults with env overrides
//! let config = ThreadGroupConfig::from_env();
//!
//! // Or customize programmatically
//! let config = ThreadGroupConfig::new()
//!     .min_threads(4)
//!     .join_timeout(Some(Duration::from_secs(5)));
//! ```

pub mod defaults;

use crate::counter::ThreadCounter;
use osal_core::env::{env_get, env_get_str, env_get_timeout_ms};
use osal_core::{OsalError, ThreadPriority};
use std::sync::Arc;
use std::time::Duration;

/// Thread group configuration with builder pattern.
#[derive(Debug, Clone)]
pub struct ThreadGroupConfig {
    /// Workers started at construction
    pub min_threads: usize,
    /// Upper bound on workers (recorded; the pool is fixed-size)
    pub max_threads: usize,
    /// Priority hint applied by each worker to itself
    pub priority: ThreadPriority,
    /// Timeout for the implicit destroy on drop (`None` = infinite)
    pub join_timeout: Option<Duration>,
    /// Worker thread name prefix
    pub name_prefix: String,
    /// Worker stack size in bytes (0 = platform default)
    pub stack_size: usize,
    /// Optional shared live-thread counter
    pub counter: Option<Arc<ThreadCounter>>,
}

impl Default for ThreadGroupConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn default_join_timeout() -> Option<Duration> {
    u64::try_from(defaults::JOIN_TIMEOUT_MS)
        .ok()
        .map(Duration::from_millis)
}

impl ThreadGroupConfig {
    /// Create config from compile-time defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `OSAL_MIN_THREADS` - Workers started at construction
    /// - `OSAL_MAX_THREADS` - Upper bound on workers
    /// - `OSAL_THREAD_PRIORITY` - lowest/below_normal/normal/above_normal/highest or 0-4
    /// - `OSAL_JOIN_TIMEOUT_MS` - Implicit join timeout; negative or "infinite" waits forever
    /// - `OSAL_THREAD_NAME` - Worker name prefix
    /// - `OSAL_STACK_SIZE` - Worker stack size in bytes
    pub fn from_env() -> Self {
        Self::from_env_prefixed(defaults::ENV_PREFIX)
    }

    /// Like [`from_env`](Self::from_env), reading `<prefix>MIN_THREADS` and
    /// so on, for hosts running groups with separate settings.
    pub fn from_env_prefixed(prefix: &str) -> Self {
        let key = |name: &str| format!("{}{}", prefix, name);
        Self {
            min_threads: env_get(&key("MIN_THREADS"), defaults::MIN_THREADS),
            max_threads: env_get(&key("MAX_THREADS"), defaults::MAX_THREADS),
            priority: env_get(
                &key("THREAD_PRIORITY"),
                ThreadPriority::from(defaults::THREAD_PRIORITY),
            ),
            join_timeout: env_get_timeout_ms(&key("JOIN_TIMEOUT_MS"), default_join_timeout()),
            name_prefix: env_get_str(&key("THREAD_NAME"), defaults::THREAD_NAME_PREFIX),
            stack_size: env_get(&key("STACK_SIZE"), defaults::STACK_SIZE),
            counter: None,
        }
    }

    /// Create config with explicit defaults (no env override).
    /// Useful for testing or when you want full control.
    pub fn new() -> Self {
        Self {
            min_threads: defaults::MIN_THREADS,
            max_threads: defaults::MAX_THREADS,
            priority: ThreadPriority::from(defaults::THREAD_PRIORITY),
            join_timeout: default_join_timeout(),
            name_prefix: defaults::THREAD_NAME_PREFIX.to_string(),
            stack_size: defaults::STACK_SIZE,
            counter: None,
        }
    }

    // Builder methods

    pub fn min_threads(mut self, n: usize) -> Self {
        self.min_threads = n;
        self
    }

    pub fn max_threads(mut self, n: usize) -> Self {
        self.max_threads = n;
        self
    }

    pub fn priority(mut self, p: ThreadPriority) -> Self {
        self.priority = p;
        self
    }

    pub fn join_timeout(mut self, d: Option<Duration>) -> Self {
        self.join_timeout = d;
        self
    }

    pub fn name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = size;
        self
    }

    pub fn counter(mut self, counter: Arc<ThreadCounter>) -> Self {
        self.counter = Some(counter);
        self
    }

    /// Apply thread count rules: `min == 0` becomes 1 and `max < min`
    /// becomes `min`, so `0, 0` yields one worker.
    pub fn normalized(mut self) -> Self {
        self.min_threads = self.min_threads.max(1);
        self.max_threads = self.max_threads.max(self.min_threads);
        self
    }

    /// Validate configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_threads > defaults::MAX_ALLOWED_THREADS {
            return Err(ConfigError::InvalidValue("min_threads must be <= 1024"));
        }
        if self.max_threads > defaults::MAX_ALLOWED_THREADS {
            return Err(ConfigError::InvalidValue("max_threads must be <= 1024"));
        }
        if self.stack_size != 0 && self.stack_size < defaults::MIN_STACK_SIZE {
            return Err(ConfigError::InvalidValue("stack_size must be 0 or >= 16KB"));
        }
        if self.name_prefix.is_empty() {
            return Err(ConfigError::InvalidValue("name_prefix must not be empty"));
        }
        if self.name_prefix.contains('\0') {
            return Err(ConfigError::InvalidValue("name_prefix must not contain NUL"));
        }
        Ok(())
    }

    /// Print configuration (for debugging)
    pub fn print(&self) {
        eprintln!("Thread Group Configuration:");
        eprintln!("  min_threads:   {}", self.min_threads);
        eprintln!("  max_threads:   {}", self.max_threads);
        eprintln!("  priority:      {}", self.priority);
        match self.join_timeout {
            Some(d) => eprintln!("  join_timeout:  {:?}", d),
            None => eprintln!("  join_timeout:  infinite"),
        }
        eprintln!("  name_prefix:   {}", self.name_prefix);
        eprintln!("  stack_size:    {}", self.stack_size);
        eprintln!("  counter:       {}", self.counter.is_some());
    }
}

/// Configuration error
#[derive(Debug, Clone)]
pub enum ConfigError {
    InvalidValue(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for OsalError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::InvalidValue(msg) => OsalError::InvalidConfig(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_defaults() {
        let config = ThreadGroupConfig::new();
        assert_eq!(config.min_threads, 1);
        assert_eq!(config.priority, ThreadPriority::Normal);
        assert_eq!(config.join_timeout, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_env() {
        // Keys private to this test; nothing else reads them.
        std::env::set_var("OSAL_CFGTEST_MIN_THREADS", "3");
        std::env::set_var("OSAL_CFGTEST_THREAD_PRIORITY", "lowest");
        std::env::set_var("OSAL_CFGTEST_JOIN_TIMEOUT_MS", "1500");
        std::env::set_var("OSAL_CFGTEST_THREAD_NAME", "io");
        let config = ThreadGroupConfig::from_env_prefixed("OSAL_CFGTEST_");
        std::env::remove_var("OSAL_CFGTEST_MIN_THREADS");
        std::env::remove_var("OSAL_CFGTEST_THREAD_PRIORITY");
        std::env::remove_var("OSAL_CFGTEST_JOIN_TIMEOUT_MS");
        std::env::remove_var("OSAL_CFGTEST_THREAD_NAME");

        assert_eq!(config.min_threads, 3);
        assert_eq!(config.max_threads, defaults::MAX_THREADS);
        assert_eq!(config.priority, ThreadPriority::Lowest);
        assert_eq!(config.join_timeout, Some(Duration::from_millis(1500)));
        assert_eq!(config.name_prefix, "io");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let counter = Arc::new(ThreadCounter::new());
        let config = ThreadGroupConfig::new()
            .min_threads(4)
            .max_threads(8)
            .priority(ThreadPriority::BelowNormal)
            .join_timeout(Some(Duration::from_millis(5)))
            .name_prefix("io")
            .stack_size(256 * 1024)
            .counter(Arc::clone(&counter));

        assert_eq!(config.min_threads, 4);
        assert_eq!(config.max_threads, 8);
        assert_eq!(config.join_timeout, Some(Duration::from_millis(5)));
        assert_eq!(config.name_prefix, "io");
        assert!(config.counter.is_some());
    }

    #[test]
    fn test_normalized() {
        let c = ThreadGroupConfig::new().min_threads(0).max_threads(0).normalized();
        assert_eq!((c.min_threads, c.max_threads), (1, 1));

        let c = ThreadGroupConfig::new().min_threads(4).max_threads(2).normalized();
        assert_eq!((c.min_threads, c.max_threads), (4, 4));

        let c = ThreadGroupConfig::new().min_threads(2).max_threads(6).normalized();
        assert_eq!((c.min_threads, c.max_threads), (2, 6));
    }

    #[test]
    fn test_validation() {
        let config = ThreadGroupConfig::new().min_threads(5000);
        assert!(config.validate().is_err());

        let config = ThreadGroupConfig::new().stack_size(100);
        assert!(config.validate().is_err());

        let config = ThreadGroupConfig::new().name_prefix("");
        let err: OsalError = config.validate().unwrap_err().into();
        assert_eq!(err, OsalError::InvalidConfig("name_prefix must not be empty"));
    }
}
