//! Thread group: a fixed set of worker threads fed from one FIFO queue
//!
//! # Lifecycle
//!
//! ```text
//!            stop()                 drain()
//!   Running ───────▶ Stopped   Running|Stopped ──▶ Draining ──▶ back
//!      ▲               │
//!      └───── start() ─┘       Running|Stopped|Draining ──join()/destroy()──▶ Joining
//! ```
//!
//! `Joining` is terminal. Workers finish whatever is still queued and exit.
//!
//! # Self-referential calls
//!
//! Tasks run without the group lock, so a task may call back into its own
//! group. Such a call is detected through the worker's thread-local identity
//! and follows the same contract as an external one, with these adjustments:
//!
//! - A drain does not wait for the caller's own task, and while waiting it
//!   executes queued tasks inline so a single-worker group makes progress.
//! - A join or destroy does not wait for the caller's own worker to exit.
//!
//! Blocked self-referential callers are counted as "parked"; a group is idle
//! when its queue is empty and every in-flight task is parked.
//!
//! # Shutdown races
//!
//! One join or destroy at a time owns the teardown (the driver). A join that
//! finds a driver, or a join/drain that starts after destroy began, fails
//! immediately. A destroy that finds a join driving waits for it instead,
//! unless that join is on the caller's own stack (the destroy came from a
//! task the join ran inline); the join then finishes the teardown itself.
//! A destroy that times out releases the driver role to the next one.

pub(crate) mod state;

pub use state::GroupState;

use crate::config::ThreadGroupConfig;
use crate::task::{run_task, Dispatchable, Task};
use crate::tls;
use crate::worker::{spawn_worker, WorkerSpec};
use osal_core::wait::{lock, wait_until, Deadline};
use osal_core::{kdebug, kinfo, kwarn, CountingSemaphore, OsalError, OsalResult, ThreadPriority};
use state::{Driver, GroupInner, GroupShared};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

static NEXT_GROUP_ID: AtomicU64 = AtomicU64::new(1);

type Guard<'a> = MutexGuard<'a, GroupInner>;

/// Pool of worker threads with a lifecycle state machine
pub struct ThreadGroup {
    shared: Arc<GroupShared>,
    config: ThreadGroupConfig,
}

impl ThreadGroup {
    /// Create a running group with `min_threads` workers
    ///
    /// `0, 0` yields one worker; `max_threads` below `min_threads` is raised
    /// to it. `join_timeout` bounds the implicit destroy when the group is
    /// dropped (`None` waits forever).
    pub fn new(
        min_threads: usize,
        max_threads: usize,
        priority: ThreadPriority,
        join_timeout: Option<Duration>,
    ) -> OsalResult<Self> {
        Self::with_config(
            ThreadGroupConfig::new()
                .min_threads(min_threads)
                .max_threads(max_threads)
                .priority(priority)
                .join_timeout(join_timeout),
        )
    }

    /// Create a running group from a full configuration
    ///
    /// Returns once every worker thread is up.
    pub fn with_config(config: ThreadGroupConfig) -> OsalResult<Self> {
        let config = config.normalized();
        config.validate()?;

        let id = NEXT_GROUP_ID.fetch_add(1, Ordering::Relaxed);
        let n = config.min_threads;

        // Count-up: released by the nth worker's post.
        let started = Arc::new(CountingSemaphore::with_counts(-(n as i32), 1)?);
        let group = Self {
            shared: Arc::new(GroupShared::new(id, config.counter.clone())),
            config,
        };

        for index in 0..n {
            let spec = WorkerSpec {
                index,
                name: format!("{}{}-w{}", group.config.name_prefix, id, index),
                stack_size: group.config.stack_size,
                priority: group.config.priority,
            };
            // On failure `group` drops here and tears down what was spawned.
            spawn_worker(&group.shared, spec, &started)?;
        }
        started.wait()?;

        kinfo!(
            "group {}: started {} workers (max {}, priority {})",
            id,
            n,
            group.config.max_threads,
            group.config.priority
        );
        Ok(group)
    }

    /// Queue a task
    ///
    /// Refused while Stopped or Joining; a refused task is discarded.
    pub fn add<T>(&self, task: T) -> OsalResult<()>
    where
        T: Dispatchable + 'static,
    {
        self.add_boxed(Some(Box::new(task)))
    }

    /// Queue an already boxed task; `None` is rejected as a null task
    pub fn add_boxed(&self, task: Option<Task>) -> OsalResult<()> {
        let Some(task) = task else {
            return Err(OsalError::NullTask);
        };

        let mut g = lock(&self.shared.inner);
        let refused = if g.base == GroupState::Joining || g.torn_down {
            Some(OsalError::Joining)
        } else if g.base == GroupState::Stopped {
            Some(OsalError::Stopped)
        } else {
            None
        };
        if let Some(err) = refused {
            drop(g);
            task.discard();
            return Err(err);
        }

        g.queue.push(task);
        let helpers = g.parked > 0;
        drop(g);

        self.shared.work_ready.notify_one();
        if helpers {
            self.shared.idle.notify_all();
        }
        Ok(())
    }

    /// Resume taking tasks after `stop()`
    pub fn start(&self) -> OsalResult<()> {
        let mut g = lock(&self.shared.inner);
        match g.base {
            GroupState::Joining => Err(OsalError::Joining),
            GroupState::Stopped => {
                g.base = GroupState::Running;
                drop(g);
                self.shared.work_ready.notify_all();
                kdebug!("group {}: started", self.shared.id);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Stop taking tasks and discard everything still queued
    ///
    /// Tasks already executing are not interrupted.
    pub fn stop(&self) -> OsalResult<()> {
        let mut g = lock(&self.shared.inner);
        match g.base {
            GroupState::Joining => return Err(OsalError::Joining),
            GroupState::Stopped => return Ok(()),
            _ => {}
        }

        g.base = GroupState::Stopped;
        let purged = g.queue.take_all();
        let wake = g.settle();
        drop(g);

        if wake {
            self.shared.idle.notify_all();
        }
        kdebug!("group {}: stopped, {} queued tasks discarded", self.shared.id, purged.len());
        for task in purged {
            task.discard();
        }
        Ok(())
    }

    /// Wait until the queue is empty and no task is executing
    ///
    /// Concurrent drains share one cycle and return together. Fails at once
    /// if a join or destroy has begun.
    pub fn drain(&self) -> OsalResult<()> {
        let me = self.is_current_worker();
        let mut g = lock(&self.shared.inner);
        if g.shutdown_begun() {
            return Err(Self::shutdown_error(&g));
        }

        let generation = if g.drain.is_active() {
            g.drain.generation
        } else {
            g.drain.generation += 1;
            g.drain.generation
        };
        g.drain.callers += 1;
        if me {
            g.park(false);
        }
        if g.settle() {
            self.shared.idle.notify_all();
        }
        kdebug!("group {}: drain cycle {} (self: {})", self.shared.id, generation, me);

        let forever = Deadline::never();
        while g.drain.completed < generation {
            g = self.help_or_wait(g, &forever, me);
        }

        g.drain.callers -= 1;
        if me {
            g.unpark(false);
        }
        Ok(())
    }

    /// Shut the group down and wait for the workers to exit
    ///
    /// Only one join or destroy drives the shutdown; a join that finds one
    /// already driving fails at once, as does a join after a completed one.
    /// On timeout the driver role is released and the join can be retried.
    pub fn join(&self, timeout: Option<Duration>) -> OsalResult<()> {
        let deadline = Deadline::after(timeout);
        let me = self.is_current_worker();

        let mut g = lock(&self.shared.inner);
        if g.torn_down || g.join_completed {
            return Err(OsalError::Joining);
        }
        if g.shutdown.is_some() || g.destroying {
            return Err(OsalError::ShutdownInProgress);
        }

        g.shutdown = Some(Driver::join_on(thread::current().id()));
        if me {
            g.park(true);
            if g.settle() {
                self.shared.idle.notify_all();
            }
        }
        kdebug!("group {}: join (self: {})", self.shared.id, me);

        let (g, res) = self.run_join(g, &deadline, me);
        // A task this join ran inline may have destroyed the group.
        let deferred = g.destroy_deferred();
        let (mut g, res) = match res {
            Ok(handles) if deferred => self.run_teardown(g, &deadline, me, handles),
            Ok(handles) => (g, Ok((handles, Vec::new()))),
            Err(e) => (g, Err(e)),
        };
        if me {
            g.unpark(true);
        }
        g.shutdown = None;
        if deferred && res.is_err() {
            g.destroying = false;
        }
        drop(g);
        self.shared.idle.notify_all();

        let (handles, leftover) = res.map_err(|e| {
            kdebug!("group {}: join failed: {}", self.shared.id, e);
            e
        })?;
        self.reap(handles);
        self.discard_leftover(leftover);
        Ok(())
    }

    /// Join (unless already joined), then release the group's threads
    ///
    /// Waits for a join in progress rather than failing. A repeated destroy
    /// succeeds; from outside the group it first waits for the earlier one to
    /// finish, and takes over if that one gave up. Queued tasks no worker ran
    /// are discarded.
    pub fn destroy(&self, timeout: Option<Duration>) -> OsalResult<()> {
        let deadline = Deadline::after(timeout);
        let me = self.is_current_worker();
        let my_thread = thread::current().id();

        let mut g = lock(&self.shared.inner);
        loop {
            if g.torn_down {
                if me {
                    return Ok(());
                }
                if g.live_workers == 0 {
                    let handles = g.take_exited_handles(my_thread);
                    drop(g);
                    self.reap(handles);
                    return Ok(());
                }
            } else if g.destroying {
                if me {
                    return Ok(());
                }
            } else if g.defer_destroy_to_join(my_thread) {
                // Our own stack is driving a join; it finishes the teardown.
                kdebug!("group {}: destroy deferred to join in progress", self.shared.id);
                return Ok(());
            } else {
                break;
            }

            if deadline.has_expired() {
                return Err(OsalError::Timeout);
            }
            g = wait_until(&self.shared.idle, g, &deadline);
        }

        g.destroying = true;
        if me {
            g.park(true);
            if g.settle() {
                self.shared.idle.notify_all();
            }
        }
        kdebug!("group {}: destroy (self: {})", self.shared.id, me);

        let (mut g, res) = self.run_destroy(g, &deadline, me);
        if me {
            g.unpark(true);
        }
        if res.is_err() {
            g.destroying = false;
        }
        drop(g);
        self.shared.idle.notify_all();

        let (handles, leftover) = res.map_err(|e| {
            kdebug!("group {}: destroy failed: {}", self.shared.id, e);
            e
        })?;
        self.reap(handles);
        self.discard_leftover(leftover);
        Ok(())
    }

    /// Observable lifecycle state
    pub fn state(&self) -> GroupState {
        lock(&self.shared.inner).observable_state()
    }

    /// Tasks queued and not yet started
    pub fn num_work_items(&self) -> usize {
        lock(&self.shared.inner).queue.len()
    }

    /// Worker threads currently alive
    pub fn num_threads(&self) -> usize {
        lock(&self.shared.inner).live_workers
    }

    pub fn min_threads(&self) -> usize {
        self.config.min_threads
    }

    pub fn max_threads(&self) -> usize {
        self.config.max_threads
    }

    /// Process-unique group id
    pub fn id(&self) -> u64 {
        self.shared.id
    }

    pub fn config(&self) -> &ThreadGroupConfig {
        &self.config
    }

    /// True when called from one of this group's worker threads
    #[inline]
    pub fn is_current_worker(&self) -> bool {
        tls::is_worker_of(self.shared.id)
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn shutdown_error(g: &GroupInner) -> OsalError {
        if g.base == GroupState::Joining {
            OsalError::Joining
        } else {
            OsalError::ShutdownInProgress
        }
    }

    /// Block on the idle condvar; a self-referential caller first runs a
    /// queued task inline if there is one.
    fn help_or_wait<'a>(&'a self, mut g: Guard<'a>, deadline: &Deadline, me: bool) -> Guard<'a> {
        let next = if me && g.base != GroupState::Stopped {
            g.queue.pop()
        } else {
            None
        };
        let Some(task) = next else {
            return wait_until(&self.shared.idle, g, deadline);
        };

        g.in_flight += 1;
        drop(g);

        run_task(task);

        let mut g = lock(&self.shared.inner);
        g.in_flight -= 1;
        if g.settle() {
            self.shared.idle.notify_all();
        }
        g
    }

    /// Driver side of a join: finish the active drain, enter Joining, and
    /// wait for every worker not parked in a shutdown call to exit
    fn run_join<'a>(
        &'a self,
        mut g: Guard<'a>,
        deadline: &Deadline,
        me: bool,
    ) -> (Guard<'a>, OsalResult<Vec<JoinHandle<()>>>) {
        while g.drain.is_active() {
            if deadline.has_expired() {
                return (g, Err(OsalError::Timeout));
            }
            g = self.help_or_wait(g, deadline, me);
        }

        if g.base != GroupState::Joining {
            g.base = GroupState::Joining;
            self.shared.work_ready.notify_all();
            kdebug!("group {}: joining, {} tasks left", self.shared.id, g.queue.len());
        }

        while g.live_workers > g.parked_shutdown {
            if deadline.has_expired() {
                return (g, Err(OsalError::Timeout));
            }
            g = wait_until(&self.shared.idle, g, deadline);
        }

        g.join_completed = true;
        let handles = g.take_exited_handles(thread::current().id());
        (g, Ok(handles))
    }

    fn run_destroy<'a>(
        &'a self,
        mut g: Guard<'a>,
        deadline: &Deadline,
        me: bool,
    ) -> (Guard<'a>, OsalResult<(Vec<JoinHandle<()>>, Vec<Task>)>) {
        // A join driven by someone else finishes first.
        while g.shutdown.is_some() {
            if deadline.has_expired() {
                return (g, Err(OsalError::Timeout));
            }
            g = self.help_or_wait(g, deadline, me);
        }

        let mut handles = Vec::new();
        if !g.join_completed {
            g.shutdown = Some(Driver::Destroy);
            let (g2, res) = self.run_join(g, deadline, me);
            g = g2;
            g.shutdown = None;
            match res {
                Ok(h) => handles = h,
                Err(e) => return (g, Err(e)),
            }
        }

        self.run_teardown(g, deadline, me, handles)
    }

    /// Last stage of a destroy, after the join: wait for everyone but the
    /// caller's own worker to be gone and take what is left in the queue
    fn run_teardown<'a>(
        &'a self,
        mut g: Guard<'a>,
        deadline: &Deadline,
        me: bool,
        mut handles: Vec<JoinHandle<()>>,
    ) -> (Guard<'a>, OsalResult<(Vec<JoinHandle<()>>, Vec<Task>)>) {
        let own = usize::from(me);
        while g.live_workers > own {
            if deadline.has_expired() {
                return (g, Err(OsalError::Timeout));
            }
            g = wait_until(&self.shared.idle, g, deadline);
        }

        handles.extend(g.take_exited_handles(thread::current().id()));
        let leftover = g.queue.take_all();
        g.torn_down = true;
        kdebug!("group {}: destroyed", self.shared.id);
        (g, Ok((handles, leftover)))
    }

    fn reap(&self, handles: Vec<JoinHandle<()>>) {
        for h in handles {
            if h.join().is_err() {
                kwarn!("group {}: worker thread panicked", self.shared.id);
            }
        }
    }

    fn discard_leftover(&self, leftover: Vec<Task>) {
        if !leftover.is_empty() {
            kdebug!("group {}: discarding {} unrun tasks", self.shared.id, leftover.len());
        }
        for task in leftover {
            task.discard();
        }
    }
}

impl Drop for ThreadGroup {
    fn drop(&mut self) {
        if let Err(e) = self.destroy(self.config.join_timeout) {
            kwarn!("group {}: teardown on drop failed: {}", self.shared.id, e);
        }
    }
}

impl fmt::Debug for ThreadGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let g = lock(&self.shared.inner);
        f.debug_struct("ThreadGroup")
            .field("id", &self.shared.id)
            .field("state", &g.observable_state())
            .field("threads", &g.live_workers)
            .field("work_items", &g.queue.len())
            .finish()
    }
}
