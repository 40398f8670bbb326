//! Thread group state shared between the handle and its workers

use crate::counter::ThreadCounter;
use crate::work_queue::WorkQueue;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{JoinHandle, ThreadId};

/// Observable lifecycle state of a thread group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
    /// Workers take tasks from the queue
    Running,
    /// Workers idle; new tasks are refused
    Stopped,
    /// A drain is waiting for the queue and in-flight tasks to finish
    Draining,
    /// Shutting down; terminal
    Joining,
}

impl fmt::Display for GroupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupState::Running => write!(f, "RUNNING"),
            GroupState::Stopped => write!(f, "STOPPED"),
            GroupState::Draining => write!(f, "DRAINING"),
            GroupState::Joining => write!(f, "JOINING"),
        }
    }
}

/// Operation that owns the teardown sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Driver {
    /// `then_destroy` is set when a destroy issued on the driving thread
    /// (from a task the join ran inline) handed its teardown to the join.
    Join { thread: ThreadId, then_destroy: bool },
    Destroy,
}

impl Driver {
    pub fn join_on(thread: ThreadId) -> Self {
        Driver::Join { thread, then_destroy: false }
    }
}

/// Drain cooperation counters
///
/// A cycle is active while it has callers and `completed < generation`.
/// Callers arriving during an active cycle share it; any other caller opens
/// the next generation.
#[derive(Debug, Default)]
pub(crate) struct DrainCycle {
    pub generation: u64,
    pub completed: u64,
    pub callers: usize,
}

impl DrainCycle {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.callers > 0 && self.completed < self.generation
    }
}

pub(crate) struct WorkerSlot {
    pub thread: ThreadId,
    pub handle: Option<JoinHandle<()>>,
    pub exited: bool,
}

/// Everything protected by the group lock
pub(crate) struct GroupInner {
    /// Running, Stopped or Joining; Draining is derived from `drain`
    pub base: GroupState,
    pub queue: WorkQueue,

    /// Tasks currently executing, including ones run inline by helpers
    pub in_flight: usize,
    /// In-flight tasks blocked inside drain/join/destroy of this group
    pub parked: usize,
    /// Workers whose task is blocked inside join/destroy; they cannot exit
    pub parked_shutdown: usize,

    pub workers: Vec<WorkerSlot>,
    pub live_workers: usize,

    pub drain: DrainCycle,
    pub shutdown: Option<Driver>,
    pub join_completed: bool,
    pub destroying: bool,
    pub torn_down: bool,
}

impl GroupInner {
    pub fn new() -> Self {
        Self {
            base: GroupState::Running,
            queue: WorkQueue::new(),
            in_flight: 0,
            parked: 0,
            parked_shutdown: 0,
            workers: Vec::new(),
            live_workers: 0,
            drain: DrainCycle::default(),
            shutdown: None,
            join_completed: false,
            destroying: false,
            torn_down: false,
        }
    }

    pub fn observable_state(&self) -> GroupState {
        if self.base == GroupState::Joining || self.torn_down {
            GroupState::Joining
        } else if self.drain.is_active() {
            GroupState::Draining
        } else {
            self.base
        }
    }

    /// No queued work and every in-flight task is parked in a group call
    #[inline]
    pub fn is_quiescent(&self) -> bool {
        self.queue.is_empty() && self.in_flight == self.parked
    }

    /// Complete the active drain cycle if the group has gone quiet
    ///
    /// Returns true when drain waiters need waking.
    pub fn settle(&mut self) -> bool {
        if self.drain.is_active() && self.is_quiescent() {
            self.drain.completed = self.drain.generation;
            true
        } else {
            false
        }
    }

    /// A self-referential call is about to block inside the group
    pub fn park(&mut self, shutdown: bool) {
        self.parked += 1;
        if shutdown {
            self.parked_shutdown += 1;
        }
    }

    pub fn unpark(&mut self, shutdown: bool) {
        self.parked -= 1;
        if shutdown {
            self.parked_shutdown -= 1;
        }
    }

    /// Shutdown has begun in some form; new drains and joins are refused
    #[inline]
    pub fn shutdown_begun(&self) -> bool {
        self.shutdown.is_some() || self.destroying || self.base == GroupState::Joining
    }

    /// Hand a destroy to the join driven by `me`, if there is one
    ///
    /// Returns false when no join is being driven from this thread.
    pub fn defer_destroy_to_join(&mut self, me: ThreadId) -> bool {
        match &mut self.shutdown {
            Some(Driver::Join { thread, then_destroy }) if *thread == me => {
                *then_destroy = true;
                self.destroying = true;
                true
            }
            _ => false,
        }
    }

    #[inline]
    pub fn destroy_deferred(&self) -> bool {
        matches!(self.shutdown, Some(Driver::Join { then_destroy: true, .. }))
    }

    /// Take the join handles of exited workers, never the caller's own
    pub fn take_exited_handles(&mut self, me: ThreadId) -> Vec<JoinHandle<()>> {
        self.workers
            .iter_mut()
            .filter(|w| w.exited && w.thread != me)
            .filter_map(|w| w.handle.take())
            .collect()
    }
}

/// State shared by a `ThreadGroup` handle and its worker threads
pub(crate) struct GroupShared {
    pub id: u64,
    pub inner: Mutex<GroupInner>,
    /// Workers wait here for tasks or a state change
    pub work_ready: Condvar,
    /// Drain, join and destroy callers wait here
    pub idle: Condvar,
    pub counter: Option<Arc<ThreadCounter>>,
}

impl GroupShared {
    pub fn new(id: u64, counter: Option<Arc<ThreadCounter>>) -> Self {
        Self {
            id,
            inner: Mutex::new(GroupInner::new()),
            work_ready: Condvar::new(),
            idle: Condvar::new(),
            counter,
        }
    }
}
