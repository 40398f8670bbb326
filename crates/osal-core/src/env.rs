//! Environment variable utilities
//!
//! Typed lookups with defaults, used by the configuration layer.
//!
//! ```ignore
//! use osal_core::env::{env_get, env_get_timeout_ms};
//!
//! let threads: usize = env_get("OSAL_MIN_THREADS", 1);
//! let join = env_get_timeout_ms("OSAL_JOIN_TIMEOUT_MS", None);
//! ```

use std::str::FromStr;
use std::time::Duration;

/// Get environment variable parsed as `T`, or return `default`
///
/// Unset and unparsable values both fall back to the default.
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    env_get_opt(key).unwrap_or(default)
}

/// Get environment variable as boolean
///
/// "1", "true", "yes", "on" (any case) are true; any other set value is false.
/// Unset returns the default.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

/// Get environment variable as `Some(T)` if set and parsable
#[inline]
pub fn env_get_opt<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Get environment variable as string, or return default
#[inline]
pub fn env_get_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Check if environment variable is set (regardless of value)
#[inline]
pub fn env_is_set(key: &str) -> bool {
    std::env::var(key).is_ok()
}

/// Get a timeout in milliseconds
///
/// A negative value (or "inf"/"infinite") means wait forever and yields
/// `None`. Unset or unparsable returns `default`.
pub fn env_get_timeout_ms(key: &str, default: Option<Duration>) -> Option<Duration> {
    let Ok(raw) = std::env::var(key) else {
        return default;
    };
    let raw = raw.trim().to_lowercase();
    if raw == "inf" || raw == "infinite" {
        return None;
    }
    match raw.parse::<i64>() {
        Ok(ms) if ms < 0 => None,
        Ok(ms) => Some(Duration::from_millis(ms as u64)),
        Err(_) => default,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_get_default() {
        let val: usize = env_get("__OSAL_TEST_UNSET_VAR__", 42);
        assert_eq!(val, 42);
    }

    #[test]
    fn test_env_get_opt_none() {
        let val: Option<usize> = env_get_opt("__OSAL_TEST_UNSET_VAR__");
        assert!(val.is_none());
        assert!(!env_is_set("__OSAL_TEST_UNSET_VAR__"));
        assert_eq!(env_get_str("__OSAL_TEST_UNSET_VAR__", "x"), "x");
    }

    #[test]
    fn test_env_get_with_set_var() {
        std::env::set_var("__OSAL_TEST_NUM__", " 123 ");
        let val: usize = env_get("__OSAL_TEST_NUM__", 0);
        assert_eq!(val, 123);
        std::env::remove_var("__OSAL_TEST_NUM__");
    }

    #[test]
    fn test_env_get_bool_variants() {
        std::env::set_var("__OSAL_TEST_BOOL__", "YES");
        assert!(env_get_bool("__OSAL_TEST_BOOL__", false));

        std::env::set_var("__OSAL_TEST_BOOL__", "off");
        assert!(!env_get_bool("__OSAL_TEST_BOOL__", true));

        std::env::remove_var("__OSAL_TEST_BOOL__");
        assert!(env_get_bool("__OSAL_TEST_BOOL__", true));
    }

    #[test]
    fn test_env_get_invalid_parse() {
        std::env::set_var("__OSAL_TEST_INVALID__", "not_a_number");
        let val: usize = env_get("__OSAL_TEST_INVALID__", 99);
        assert_eq!(val, 99);
        std::env::remove_var("__OSAL_TEST_INVALID__");
    }

    #[test]
    fn test_env_get_timeout_ms() {
        let dflt = Some(Duration::from_millis(5));
        assert_eq!(env_get_timeout_ms("__OSAL_TEST_TMO_UNSET__", dflt), dflt);

        std::env::set_var("__OSAL_TEST_TMO__", "250");
        assert_eq!(
            env_get_timeout_ms("__OSAL_TEST_TMO__", None),
            Some(Duration::from_millis(250))
        );

        std::env::set_var("__OSAL_TEST_TMO__", "-1");
        assert_eq!(env_get_timeout_ms("__OSAL_TEST_TMO__", dflt), None);

        std::env::set_var("__OSAL_TEST_TMO__", "Infinite");
        assert_eq!(env_get_timeout_ms("__OSAL_TEST_TMO__", dflt), None);

        std::env::set_var("__OSAL_TEST_TMO__", "soon");
        assert_eq!(env_get_timeout_ms("__OSAL_TEST_TMO__", dflt), dflt);
        std::env::remove_var("__OSAL_TEST_TMO__");
    }
}
