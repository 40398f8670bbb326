//! Counting semaphore with count-down and count-up modes
//!
//! The semaphore is created explicitly and can be destroyed and re-created.
//! A negative initial count selects count-up mode: the count is stored as
//! `initial + 1`, so exactly `|initial|` posts bring it to 1 and let one
//! `wait()` through. This is how a thread waits for N producers.
//!
//! ```ignore
//! let started = CountingSemaphore::with_counts(-(n as i32), 1)?;
//! // ... each of n workers calls started.post(1) ...
//! started.wait()?; // returns after the nth post
//! ```

use crate::error::{OsalError, OsalResult};
use crate::wait::{lock, wait_until, Deadline};
use std::fmt;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct SemState {
    created: bool,
    current: i64,
    max: u32,
    waiters: u32,
    /// Bumped by unblock_all/destroy; waiters that saw an older value fail.
    epoch: u64,
}

/// Signed-count blocking semaphore with a configurable maximum
pub struct CountingSemaphore {
    state: Mutex<SemState>,
    cond: Condvar,
}

impl CountingSemaphore {
    /// New semaphore in the not-created state
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SemState::default()),
            cond: Condvar::new(),
        }
    }

    /// New semaphore, created with the given counts
    pub fn with_counts(initial: i32, max: u32) -> OsalResult<Self> {
        let sem = Self::new();
        sem.create(initial, max)?;
        Ok(sem)
    }

    /// Create the semaphore
    ///
    /// With `max == 0` the maximum becomes `initial` when positive, else 1.
    /// A negative `initial` selects count-up mode. An `initial` above a
    /// non-zero `max` is clamped to `max`.
    pub fn create(&self, initial: i32, max: u32) -> OsalResult<()> {
        let mut st = lock(&self.state);
        if st.created {
            return Err(OsalError::AlreadyCreated);
        }

        let max = match max {
            0 if initial > 0 => initial as u32,
            0 => 1,
            m => m,
        };

        st.current = normalize(initial).min(i64::from(max));
        st.max = max;
        st.created = true;
        Ok(())
    }

    /// Block until a count is available, then take it
    pub fn wait(&self) -> OsalResult<()> {
        self.wait_deadline(Deadline::never())
    }

    /// Like [`wait`](Self::wait), giving up with `Timeout` after `timeout`
    pub fn wait_timeout(&self, timeout: Duration) -> OsalResult<()> {
        self.wait_deadline(Deadline::after(Some(timeout)))
    }

    /// Wait with an optional timeout (`None` waits forever)
    pub fn wait_for(&self, timeout: Option<Duration>) -> OsalResult<()> {
        self.wait_deadline(Deadline::after(timeout))
    }

    fn wait_deadline(&self, deadline: Deadline) -> OsalResult<()> {
        let mut st = lock(&self.state);
        if !st.created {
            return Err(OsalError::NotCreated);
        }

        let epoch = st.epoch;
        st.waiters += 1;

        let res = loop {
            if st.epoch != epoch {
                break Err(OsalError::Unblocked);
            }
            if st.current > 0 {
                st.current -= 1;
                break Ok(());
            }
            if deadline.has_expired() {
                break Err(OsalError::Timeout);
            }
            st = wait_until(&self.cond, st, &deadline);
        };

        st.waiters -= 1;
        res
    }

    /// Add `n` to the count, waking up to `n` waiters
    ///
    /// Fails without changing anything if the result would exceed the maximum.
    pub fn post(&self, n: u32) -> OsalResult<()> {
        let mut st = lock(&self.state);
        if !st.created {
            return Err(OsalError::NotCreated);
        }
        if st.current + i64::from(n) > i64::from(st.max) {
            return Err(OsalError::CapacityExceeded);
        }

        st.current += i64::from(n);
        let release = st.current > 0 && st.waiters > 0;
        drop(st);

        if release {
            if n == 1 {
                self.cond.notify_one();
            } else {
                self.cond.notify_all();
            }
        }
        Ok(())
    }

    /// Set the count to `n` (negative selects count-up mode)
    ///
    /// Refused while any thread is blocked in `wait()`.
    pub fn reset(&self, n: i32) -> OsalResult<()> {
        let mut st = lock(&self.state);
        if !st.created {
            return Err(OsalError::NotCreated);
        }
        if st.waiters > 0 {
            return Err(OsalError::WaitersPresent);
        }
        if i64::from(n) > i64::from(st.max) {
            return Err(OsalError::CapacityExceeded);
        }
        st.current = normalize(n);
        Ok(())
    }

    /// Snapshot of `(current, max)`
    pub fn curr_counts(&self) -> OsalResult<(i64, u32)> {
        let st = lock(&self.state);
        if !st.created {
            return Err(OsalError::NotCreated);
        }
        Ok((st.current, st.max))
    }

    /// Release every blocked waiter; each returns `Unblocked`
    ///
    /// The count is left as it was and later waits behave normally.
    pub fn unblock_all(&self) -> OsalResult<()> {
        let mut st = lock(&self.state);
        if !st.created {
            return Err(OsalError::NotCreated);
        }
        st.epoch = st.epoch.wrapping_add(1);
        drop(st);
        self.cond.notify_all();
        Ok(())
    }

    /// Number of threads currently blocked in `wait()`
    pub fn num_waiters(&self) -> u32 {
        lock(&self.state).waiters
    }

    /// Whether `create` has succeeded and `destroy` has not been called since
    pub fn is_created(&self) -> bool {
        lock(&self.state).created
    }

    /// Release all waiters (as failures) and return to the not-created state
    pub fn destroy(&self) -> OsalResult<()> {
        let mut st = lock(&self.state);
        if !st.created {
            return Err(OsalError::NotCreated);
        }
        st.created = false;
        st.current = 0;
        st.max = 0;
        st.epoch = st.epoch.wrapping_add(1);
        drop(st);
        self.cond.notify_all();
        Ok(())
    }
}

/// Count-up normalization: `-n` is stored as `-n + 1`.
#[inline]
fn normalize(count: i32) -> i64 {
    let count = i64::from(count);
    if count < 0 {
        count + 1
    } else {
        count
    }
}

impl Default for CountingSemaphore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CountingSemaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = lock(&self.state);
        f.debug_struct("CountingSemaphore")
            .field("created", &st.created)
            .field("current", &st.current)
            .field("max", &st.max)
            .field("waiters", &st.waiters)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    fn wait_for_waiters(sem: &CountingSemaphore, n: u32) {
        let start = Instant::now();
        while sem.num_waiters() != n {
            assert!(start.elapsed() < Duration::from_secs(10), "waiters never reached {}", n);
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_create_normalization() {
        let sem = CountingSemaphore::new();
        assert!(sem.create(3, 0).is_ok());
        assert_eq!(sem.curr_counts().unwrap(), (3, 3));
        assert_eq!(sem.create(1, 1), Err(OsalError::AlreadyCreated));
        sem.destroy().unwrap();

        // 0/0 is a binary lock that starts unavailable
        sem.create(0, 0).unwrap();
        assert_eq!(sem.curr_counts().unwrap(), (0, 1));
        assert_eq!(sem.wait_timeout(Duration::from_millis(10)), Err(OsalError::Timeout));
        sem.destroy().unwrap();

        // initial above max is clamped
        sem.create(5, 2).unwrap();
        assert_eq!(sem.curr_counts().unwrap(), (2, 2));
    }

    #[test]
    fn test_not_created() {
        let sem = CountingSemaphore::new();
        assert_eq!(sem.wait(), Err(OsalError::NotCreated));
        assert_eq!(sem.post(1), Err(OsalError::NotCreated));
        assert_eq!(sem.reset(0), Err(OsalError::NotCreated));
        assert_eq!(sem.curr_counts(), Err(OsalError::NotCreated));
        assert_eq!(sem.unblock_all(), Err(OsalError::NotCreated));
        assert_eq!(sem.destroy(), Err(OsalError::NotCreated));
        assert_eq!(sem.num_waiters(), 0);
        assert!(!sem.is_created());
    }

    #[test]
    fn test_n_waits_then_block_until_post() {
        for n in 1..=4u32 {
            let sem = Arc::new(CountingSemaphore::with_counts(n as i32, 0).unwrap());
            for _ in 0..n {
                assert!(sem.wait_timeout(Duration::from_millis(1)).is_ok());
            }

            let done = Arc::new(AtomicBool::new(false));
            let (s, d) = (Arc::clone(&sem), Arc::clone(&done));
            let h = thread::spawn(move || {
                s.wait().unwrap();
                d.store(true, Ordering::SeqCst);
            });

            wait_for_waiters(&sem, 1);
            assert!(!done.load(Ordering::SeqCst));
            sem.post(1).unwrap();
            h.join().unwrap();
            assert!(done.load(Ordering::SeqCst));
        }
    }

    #[test]
    fn test_count_up_mode() {
        let sem = Arc::new(CountingSemaphore::with_counts(-3, 1).unwrap());
        assert_eq!(sem.curr_counts().unwrap(), (-2, 1));

        let done = Arc::new(AtomicBool::new(false));
        let (s, d) = (Arc::clone(&sem), Arc::clone(&done));
        let h = thread::spawn(move || {
            s.wait().unwrap();
            d.store(true, Ordering::SeqCst);
        });

        wait_for_waiters(&sem, 1);
        sem.post(1).unwrap();
        sem.post(1).unwrap();
        thread::sleep(Duration::from_millis(20));
        assert!(!done.load(Ordering::SeqCst));

        sem.post(1).unwrap();
        h.join().unwrap();
        assert!(done.load(Ordering::SeqCst));
        assert_eq!(sem.curr_counts().unwrap(), (0, 1));
    }

    #[test]
    fn test_post_capacity() {
        let sem = CountingSemaphore::with_counts(1, 2).unwrap();
        assert_eq!(sem.post(2), Err(OsalError::CapacityExceeded));
        assert_eq!(sem.curr_counts().unwrap(), (1, 2));
        assert!(sem.post(1).is_ok());
        assert_eq!(sem.post(1), Err(OsalError::CapacityExceeded));
    }

    #[test]
    fn test_post_many_wakes_many() {
        let sem = Arc::new(CountingSemaphore::with_counts(0, 8).unwrap());
        let woke = Arc::new(AtomicUsize::new(0));
        let mut handles = vec![];
        for _ in 0..4 {
            let (s, w) = (Arc::clone(&sem), Arc::clone(&woke));
            handles.push(thread::spawn(move || {
                s.wait().unwrap();
                w.fetch_add(1, Ordering::SeqCst);
            }));
        }
        wait_for_waiters(&sem, 4);
        sem.post(4).unwrap();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(woke.load(Ordering::SeqCst), 4);
        assert_eq!(sem.curr_counts().unwrap(), (0, 8));
    }

    #[test]
    fn test_reset() {
        let sem = Arc::new(CountingSemaphore::with_counts(0, 4).unwrap());
        assert_eq!(sem.reset(5), Err(OsalError::CapacityExceeded));
        assert!(sem.reset(3).is_ok());
        assert_eq!(sem.curr_counts().unwrap(), (3, 4));
        assert!(sem.reset(-2).is_ok());
        assert_eq!(sem.curr_counts().unwrap(), (-1, 4));
        sem.reset(0).unwrap();

        let s = Arc::clone(&sem);
        let h = thread::spawn(move || s.wait());
        wait_for_waiters(&sem, 1);
        assert_eq!(sem.reset(1), Err(OsalError::WaitersPresent));
        sem.post(1).unwrap();
        assert!(h.join().unwrap().is_ok());
    }

    #[test]
    fn test_timed_wait_retracts_waiter() {
        let sem = CountingSemaphore::with_counts(0, 1).unwrap();
        let start = Instant::now();
        assert_eq!(sem.wait_timeout(Duration::from_millis(30)), Err(OsalError::Timeout));
        assert!(start.elapsed() >= Duration::from_millis(25));
        assert_eq!(sem.num_waiters(), 0);
        assert!(sem.reset(1).is_ok());
        assert!(sem.wait_for(Some(Duration::from_millis(1))).is_ok());
    }

    #[test]
    fn test_unblock_all() {
        let sem = Arc::new(CountingSemaphore::with_counts(0, 1).unwrap());
        let mut handles = vec![];
        for _ in 0..3 {
            let s = Arc::clone(&sem);
            handles.push(thread::spawn(move || s.wait()));
        }
        wait_for_waiters(&sem, 3);
        assert!(sem.unblock_all().is_ok());
        for h in handles {
            assert_eq!(h.join().unwrap(), Err(OsalError::Unblocked));
        }
        assert_eq!(sem.num_waiters(), 0);

        // Later waits are unaffected.
        sem.post(1).unwrap();
        assert!(sem.wait().is_ok());
    }

    #[test]
    fn test_destroy_releases_waiters() {
        let sem = Arc::new(CountingSemaphore::with_counts(0, 1).unwrap());
        let s = Arc::clone(&sem);
        let h = thread::spawn(move || s.wait());
        wait_for_waiters(&sem, 1);

        assert!(sem.destroy().is_ok());
        assert_eq!(h.join().unwrap(), Err(OsalError::Unblocked));
        assert_eq!(sem.destroy(), Err(OsalError::NotCreated));

        // Recreate in count-up mode.
        assert!(sem.create(-1, 0).is_ok());
        assert_eq!(sem.curr_counts().unwrap(), (0, 1));
    }
}
