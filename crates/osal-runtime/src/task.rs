//! Units of work submitted to a thread group
//!
//! A task is consumed exactly once: either `dispatch()`ed by a worker or
//! `discard()`ed when the group refuses or purges it. Closures get both for
//! free; implement [`Dispatchable`] directly when a dropped task needs to
//! report back.

use osal_core::kerror;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Single-invocation unit of work
pub trait Dispatchable: Send {
    /// Run the task
    fn dispatch(self: Box<Self>);

    /// Release the task without running it
    fn discard(self: Box<Self>) {}
}

impl<F> Dispatchable for F
where
    F: FnOnce() + Send,
{
    fn dispatch(self: Box<Self>) {
        (*self)()
    }
}

/// Owned task as stored in the work queue
pub type Task = Box<dyn Dispatchable + 'static>;

/// Run a task on the current thread, containing any panic
///
/// Returns false if the task panicked.
pub(crate) fn run_task(task: Task) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(move || task.dispatch())) {
        Ok(()) => true,
        Err(payload) => {
            kerror!("task panicked: {}", panic_message(payload.as_ref()));
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "<non-string panic payload>"
    }
}
