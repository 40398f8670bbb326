//! Deadlines and condvar waiting
//!
//! All blocking in this workspace follows one discipline: take the state
//! lock, re-check the predicate in a loop, and sleep on a condvar with the
//! time left until an absolute deadline. Spurious wakeups only cost another
//! trip around the loop.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Timeout value meaning "wait forever"
pub const INFINITE: Option<Duration> = None;

/// Absolute point in time a bounded wait gives up at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    /// Deadline `timeout` from now; `None` never expires
    ///
    /// Timeouts too large to represent are treated as infinite.
    pub fn after(timeout: Option<Duration>) -> Self {
        Self {
            at: timeout.and_then(|t| Instant::now().checked_add(t)),
        }
    }

    /// Deadline that never expires
    pub const fn never() -> Self {
        Self { at: None }
    }

    #[inline]
    pub fn is_infinite(&self) -> bool {
        self.at.is_none()
    }

    /// True once the deadline has passed
    #[inline]
    pub fn has_expired(&self) -> bool {
        match self.at {
            Some(at) => Instant::now() >= at,
            None => false,
        }
    }

    /// Time left, `None` when infinite
    pub fn remaining(&self) -> Option<Duration> {
        self.at.map(|at| at.saturating_duration_since(Instant::now()))
    }
}

/// Lock a mutex, recovering the guard if a panicking thread poisoned it
///
/// State protected by these locks is kept consistent before any code that
/// can panic runs, so a poisoned lock still holds valid data.
#[inline]
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sleep on `cond` until notified or `deadline` passes
///
/// Returns with the lock re-acquired. The caller re-checks its predicate and
/// the deadline.
pub fn wait_until<'a, T>(
    cond: &Condvar,
    guard: MutexGuard<'a, T>,
    deadline: &Deadline,
) -> MutexGuard<'a, T> {
    match deadline.remaining() {
        None => cond.wait(guard).unwrap_or_else(PoisonError::into_inner),
        Some(left) if left.is_zero() => guard,
        Some(left) => {
            let (guard, _) = cond
                .wait_timeout(guard, left)
                .unwrap_or_else(PoisonError::into_inner);
            guard
        }
    }
}
