//! FIFO queue of pending tasks
//!
//! The queue does no locking of its own. A thread group keeps it inside the
//! group mutex together with the lifecycle state, so a length read under that
//! lock is always consistent with the state it is compared against.

use crate::task::Task;
use std::collections::VecDeque;
use std::fmt;

/// Ordered sequence of pending tasks
pub struct WorkQueue {
    items: VecDeque<Task>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    /// Append a task at the tail
    #[inline]
    pub fn push(&mut self, task: Task) {
        self.items.push_back(task);
    }

    /// Take the task at the head
    #[inline]
    pub fn pop(&mut self) -> Option<Task> {
        self.items.pop_front()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Remove every pending task, in queue order
    pub fn take_all(&mut self) -> Vec<Task> {
        self.items.drain(..).collect()
    }
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for WorkQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkQueue").field("len", &self.items.len()).finish()
    }
}
