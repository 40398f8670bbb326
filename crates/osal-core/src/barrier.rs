//! Reusable rendezvous barrier
//!
//! A barrier is locked until `unlock_count` posts have accumulated. A
//! manual-reset barrier then stays open for every current and future waiter
//! until `reset()`. An auto-reset barrier releases the waiters blocked at the
//! moment it opens and closes itself again: immediately when nobody was
//! waiting, otherwise when the last released waiter returns. Callers arriving
//! while that reset is pending wait for it to finish before blocking normally.

use crate::error::{OsalError, OsalResult};
use crate::wait::{lock, wait_until, Deadline};
use std::fmt;
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Default)]
struct BarrierState {
    created: bool,
    current: u32,
    unlock: u32,
    auto_reset: bool,

    /// Callers blocked waiting for the barrier to open
    waiters: u32,
    /// Callers waiting for a pending auto reset before they can block
    pre_waiters: u32,

    /// Auto reset pending until the last released waiter leaves
    resetting: bool,
    /// Auto barrier released by unblock_all; new waits fail until it settles
    unblocking: bool,
    /// destroy() is waiting for everyone to leave
    destroying: bool,

    /// Bumped by unblock_all/destroy; waiters that saw an older value fail.
    epoch: u64,
}

impl BarrierState {
    #[inline]
    fn usable(&self) -> bool {
        self.created && !self.destroying
    }

    #[inline]
    fn occupants(&self) -> u32 {
        self.waiters + self.pre_waiters
    }
}

/// Multi-waiter rendezvous with manual or automatic reset
pub struct Barrier {
    state: Mutex<BarrierState>,
    cond: Condvar,
    drained: Condvar,
}

impl Barrier {
    /// New barrier in the not-created state
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BarrierState::default()),
            cond: Condvar::new(),
            drained: Condvar::new(),
        }
    }

    /// New barrier, created with the given unlock count and mode
    pub fn with_unlock_count(unlock_count: u32, auto_reset: bool) -> OsalResult<Self> {
        let b = Self::new();
        b.create(unlock_count, auto_reset)?;
        Ok(b)
    }

    /// Create the barrier; an `unlock_count` of 0 is treated as 1
    pub fn create(&self, unlock_count: u32, auto_reset: bool) -> OsalResult<()> {
        let mut st = lock(&self.state);
        if st.created {
            return Err(OsalError::AlreadyCreated);
        }
        st.created = true;
        st.current = 0;
        st.unlock = unlock_count.max(1);
        st.auto_reset = auto_reset;
        st.resetting = false;
        st.unblocking = false;
        Ok(())
    }

    /// Add `n` to the count, clamped to the unlock count
    pub fn post(&self, n: u32) -> OsalResult<()> {
        let mut st = lock(&self.state);
        if !st.usable() {
            return Err(OsalError::NotCreated);
        }

        let was_locked = st.current < st.unlock;
        st.current = st.current.saturating_add(n).min(st.unlock);

        if was_locked && st.current == st.unlock {
            if st.auto_reset {
                if st.waiters == 0 {
                    st.current = 0;
                } else {
                    st.resetting = true;
                }
            }
            drop(st);
            self.cond.notify_all();
        }
        Ok(())
    }

    /// Block until the barrier opens
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
        if !st.usable() {
            return Err(OsalError::NotCreated);
        }
        if st.auto_reset && st.unblocking {
            return Err(OsalError::Unblocked);
        }

        let epoch = st.epoch;

        if st.resetting {
            st.pre_waiters += 1;
            let res = loop {
                if st.epoch != epoch {
                    break Err(OsalError::Unblocked);
                }
                if !st.resetting {
                    break Ok(());
                }
                if deadline.has_expired() {
                    break Err(OsalError::Timeout);
                }
                st = wait_until(&self.cond, st, &deadline);
            };
            st.pre_waiters -= 1;
            if let Err(e) = res {
                self.leave(st);
                return Err(e);
            }
        }

        st.waiters += 1;
        let res = loop {
            if st.epoch != epoch {
                break Err(OsalError::Unblocked);
            }
            if st.current >= st.unlock {
                break Ok(());
            }
            if deadline.has_expired() {
                break Err(OsalError::Timeout);
            }
            st = wait_until(&self.cond, st, &deadline);
        };
        st.waiters -= 1;

        // Last one out closes an auto barrier.
        if st.waiters == 0 && (st.resetting || st.unblocking) {
            st.current = 0;
            st.resetting = false;
            st.unblocking = false;
            self.cond.notify_all();
        }

        self.leave(st);
        res
    }

    /// Bookkeeping shared by every exit path out of a wait
    fn leave(&self, st: MutexGuard<'_, BarrierState>) {
        let wake_destroyer = st.destroying && st.occupants() == 0;
        drop(st);
        if wake_destroyer {
            self.drained.notify_all();
        }
    }

    /// Release every blocked waiter; each returns `Unblocked`
    ///
    /// A manual barrier is left open. An auto barrier refuses new waits until
    /// the last released waiter has returned, then closes again.
    pub fn unblock_all(&self) -> OsalResult<()> {
        let mut st = lock(&self.state);
        if !st.usable() {
            return Err(OsalError::NotCreated);
        }

        st.epoch = st.epoch.wrapping_add(1);
        if !st.auto_reset {
            st.current = st.unlock;
        } else if st.waiters > 0 {
            st.unblocking = true;
            st.current = st.unlock;
        } else {
            st.current = 0;
            st.resetting = false;
        }
        drop(st);
        self.cond.notify_all();
        Ok(())
    }

    /// Close a manual barrier, optionally changing its unlock count
    ///
    /// A `new_unlock_count` of 0 keeps the current one.
    pub fn reset(&self, new_unlock_count: u32) -> OsalResult<()> {
        let mut st = lock(&self.state);
        if !st.usable() {
            return Err(OsalError::NotCreated);
        }
        if st.auto_reset {
            return Err(OsalError::AutoResetBarrier);
        }
        if st.waiters > 0 {
            return Err(OsalError::WaitersPresent);
        }
        st.current = 0;
        if new_unlock_count > 0 {
            st.unlock = new_unlock_count;
        }
        Ok(())
    }

    /// Snapshot of `(current, unlock_count)`
    pub fn curr_counts(&self) -> OsalResult<(u32, u32)> {
        let st = lock(&self.state);
        if !st.created {
            return Err(OsalError::NotCreated);
        }
        Ok((st.current, st.unlock))
    }

    /// Number of threads currently blocked in `wait()`
    pub fn num_waiters(&self) -> u32 {
        lock(&self.state).occupants()
    }

    pub fn is_created(&self) -> bool {
        lock(&self.state).created
    }

    pub fn is_auto_reset(&self) -> bool {
        lock(&self.state).auto_reset
    }

    /// Release all waiters (as failures), wait for them to leave, and return
    /// to the not-created state
    pub fn destroy(&self) -> OsalResult<()> {
        let mut st = lock(&self.state);
        if !st.usable() {
            return Err(OsalError::NotCreated);
        }

        st.destroying = true;
        st.epoch = st.epoch.wrapping_add(1);
        self.cond.notify_all();

        while st.occupants() > 0 {
            st = wait_until(&self.drained, st, &Deadline::never());
        }

        st.created = false;
        st.destroying = false;
        st.current = 0;
        st.unlock = 0;
        st.auto_reset = false;
        st.resetting = false;
        st.unblocking = false;
        Ok(())
    }
}

impl Default for Barrier {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Barrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = lock(&self.state);
        f.debug_struct("Barrier")
            .field("created", &st.created)
            .field("current", &st.current)
            .field("unlock", &st.unlock)
            .field("auto_reset", &st.auto_reset)
            .field("waiters", &st.waiters)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    fn wait_for_waiters(b: &Barrier, n: u32) {
        let start = Instant::now();
        while b.num_waiters() != n {
            assert!(start.elapsed() < Duration::from_secs(10), "waiters never reached {}", n);
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn wait_for_state(b: &Barrier, what: &str, pred: impl Fn(&BarrierState) -> bool) {
        let start = Instant::now();
        while !pred(&*lock(&b.state)) {
            assert!(start.elapsed() < Duration::from_secs(10), "timed out waiting for {}", what);
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn spawn_waiters(b: &Arc<Barrier>, n: usize) -> Vec<thread::JoinHandle<OsalResult<()>>> {
        (0..n)
            .map(|_| {
                let b = Arc::clone(b);
                thread::spawn(move || b.wait())
            })
            .collect()
    }

    #[test]
    fn test_create() {
        let b = Barrier::new();
        assert_eq!(b.curr_counts(), Err(OsalError::NotCreated));
        assert_eq!(b.wait(), Err(OsalError::NotCreated));
        assert_eq!(b.post(1), Err(OsalError::NotCreated));

        b.create(0, false).unwrap();
        assert_eq!(b.curr_counts().unwrap(), (0, 1));
        assert_eq!(b.create(2, true), Err(OsalError::AlreadyCreated));
        assert!(!b.is_auto_reset());
    }

    #[test]
    fn test_manual_stays_open_until_reset() {
        let b = Barrier::with_unlock_count(3, false).unwrap();
        for _ in 0..3 {
            assert_eq!(b.wait_timeout(Duration::from_millis(5)), Err(OsalError::Timeout));
            b.post(1).unwrap();
        }
        assert_eq!(b.curr_counts().unwrap(), (3, 3));

        for _ in 0..10 {
            assert!(b.wait_timeout(Duration::from_millis(1)).is_ok());
        }

        b.reset(0).unwrap();
        assert_eq!(b.curr_counts().unwrap(), (0, 3));
        assert_eq!(b.wait_timeout(Duration::from_millis(5)), Err(OsalError::Timeout));
        assert_eq!(b.num_waiters(), 0);
    }

    #[test]
    fn test_post_clamps() {
        let b = Barrier::with_unlock_count(3, false).unwrap();
        b.post(10).unwrap();
        assert_eq!(b.curr_counts().unwrap(), (3, 3));
        b.post(u32::MAX).unwrap();
        assert_eq!(b.curr_counts().unwrap(), (3, 3));
    }

    #[test]
    fn test_manual_releases_blocked_waiters() {
        let b = Arc::new(Barrier::with_unlock_count(2, false).unwrap());
        let handles = spawn_waiters(&b, 3);
        wait_for_waiters(&b, 3);

        b.post(1).unwrap();
        b.post(1).unwrap();
        for h in handles {
            assert!(h.join().unwrap().is_ok());
        }
        assert_eq!(b.curr_counts().unwrap(), (2, 2));
    }

    #[test]
    fn test_auto_reset_after_last_waiter() {
        let b = Arc::new(Barrier::with_unlock_count(2, true).unwrap());
        let handles = spawn_waiters(&b, 3);
        wait_for_waiters(&b, 3);

        b.post(2).unwrap();
        for h in handles {
            assert!(h.join().unwrap().is_ok());
        }
        assert_eq!(b.curr_counts().unwrap(), (0, 2));
        assert_eq!(b.num_waiters(), 0);

        // closed again: a new wait blocks
        assert_eq!(b.wait_timeout(Duration::from_millis(5)), Err(OsalError::Timeout));
    }

    #[test]
    fn test_auto_reset_immediate_without_waiters() {
        let b = Barrier::with_unlock_count(2, true).unwrap();
        b.post(1).unwrap();
        assert_eq!(b.curr_counts().unwrap(), (1, 2));
        b.post(1).unwrap();
        assert_eq!(b.curr_counts().unwrap(), (0, 2));
        assert_eq!(b.wait_timeout(Duration::from_millis(5)), Err(OsalError::Timeout));
    }

    #[test]
    fn test_auto_reuse_across_rounds() {
        let b = Arc::new(Barrier::with_unlock_count(1, true).unwrap());
        for _ in 0..5 {
            let handles = spawn_waiters(&b, 2);
            wait_for_waiters(&b, 2);
            b.post(1).unwrap();
            for h in handles {
                assert!(h.join().unwrap().is_ok());
            }
            assert_eq!(b.curr_counts().unwrap(), (0, 1));
        }
    }

    #[test]
    fn test_auto_reset_late_arrival_waits_for_next_round() {
        let b = Arc::new(Barrier::with_unlock_count(2, true).unwrap());
        let first_round = spawn_waiters(&b, 3);
        wait_for_waiters(&b, 3);

        // Arrives while the reset is (possibly) still pending.
        b.post(2).unwrap();
        let late = {
            let b = Arc::clone(&b);
            thread::spawn(move || b.wait_timeout(Duration::from_secs(10)))
        };

        for h in first_round {
            assert!(h.join().unwrap().is_ok());
        }
        wait_for_state(&b, "late waiter blocked", |st| st.waiters == 1 && st.pre_waiters == 0);
        thread::sleep(Duration::from_millis(20));
        assert!(!late.is_finished());
        assert_eq!(b.curr_counts().unwrap(), (0, 2));

        b.post(2).unwrap();
        assert!(late.join().unwrap().is_ok());
        assert_eq!(b.curr_counts().unwrap(), (0, 2));
    }

    #[test]
    fn test_pre_waiter_counted_and_released_by_reset() {
        let b = Arc::new(Barrier::with_unlock_count(1, true).unwrap());
        {
            // Reset pending with one released waiter still inside.
            let mut st = lock(&b.state);
            st.current = 1;
            st.resetting = true;
            st.waiters = 1;
        }

        let late = {
            let b = Arc::clone(&b);
            thread::spawn(move || b.wait_timeout(Duration::from_secs(10)))
        };
        wait_for_state(&b, "pre-waiter", |st| st.pre_waiters == 1);
        assert_eq!(b.num_waiters(), 2);

        // The released waiter leaves: the barrier closes and the late caller
        // starts blocking on the next round instead of passing through.
        {
            let mut st = lock(&b.state);
            st.waiters = 0;
            st.current = 0;
            st.resetting = false;
        }
        b.cond.notify_all();
        wait_for_state(&b, "late waiter blocked", |st| st.waiters == 1 && st.pre_waiters == 0);
        assert!(!late.is_finished());

        b.post(1).unwrap();
        assert!(late.join().unwrap().is_ok());
        assert_eq!(b.num_waiters(), 0);
    }

    #[test]
    fn test_unblock_all_manual() {
        let b = Arc::new(Barrier::with_unlock_count(4, false).unwrap());
        let handles = spawn_waiters(&b, 2);
        wait_for_waiters(&b, 2);

        b.unblock_all().unwrap();
        for h in handles {
            assert_eq!(h.join().unwrap(), Err(OsalError::Unblocked));
        }

        // left open
        assert_eq!(b.curr_counts().unwrap(), (4, 4));
        assert!(b.wait_timeout(Duration::from_millis(1)).is_ok());
    }

    #[test]
    fn test_unblock_all_auto() {
        let b = Arc::new(Barrier::with_unlock_count(3, true).unwrap());
        let handles = spawn_waiters(&b, 3);
        wait_for_waiters(&b, 3);
        b.post(1).unwrap();

        b.unblock_all().unwrap();
        for h in handles {
            assert_eq!(h.join().unwrap(), Err(OsalError::Unblocked));
        }

        // settled: closed with a fresh count, blocking normally again
        assert_eq!(b.curr_counts().unwrap(), (0, 3));
        assert_eq!(b.wait_timeout(Duration::from_millis(5)), Err(OsalError::Timeout));
        assert!(b.unblock_all().is_ok());
    }

    #[test]
    fn test_reset_rules() {
        let auto = Barrier::with_unlock_count(2, true).unwrap();
        assert_eq!(auto.reset(0), Err(OsalError::AutoResetBarrier));

        let b = Arc::new(Barrier::with_unlock_count(2, false).unwrap());
        let handles = spawn_waiters(&b, 1);
        wait_for_waiters(&b, 1);
        assert_eq!(b.reset(5), Err(OsalError::WaitersPresent));
        b.post(2).unwrap();
        for h in handles {
            assert!(h.join().unwrap().is_ok());
        }

        b.reset(5).unwrap();
        assert_eq!(b.curr_counts().unwrap(), (0, 5));
    }

    #[test]
    fn test_destroy_releases_and_recreates() {
        let b = Arc::new(Barrier::with_unlock_count(2, false).unwrap());
        let handles = spawn_waiters(&b, 2);
        wait_for_waiters(&b, 2);

        b.destroy().unwrap();
        assert_eq!(b.num_waiters(), 0);
        for h in handles {
            assert_eq!(h.join().unwrap(), Err(OsalError::Unblocked));
        }
        assert_eq!(b.destroy(), Err(OsalError::NotCreated));
        assert_eq!(b.curr_counts(), Err(OsalError::NotCreated));

        b.create(1, true).unwrap();
        assert!(b.is_auto_reset());
        assert_eq!(b.curr_counts().unwrap(), (0, 1));
    }

    #[test]
    fn test_timeout_retracts_waiter() {
        let b = Barrier::with_unlock_count(1, false).unwrap();
        let start = Instant::now();
        assert_eq!(b.wait_for(Some(Duration::from_millis(30))), Err(OsalError::Timeout));
        assert!(start.elapsed() >= Duration::from_millis(25));
        assert_eq!(b.num_waiters(), 0);
        assert!(b.reset(0).is_ok());
    }
}
