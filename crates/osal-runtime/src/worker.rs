//! Worker thread management
//!
//! Workers are OS threads that pull tasks from their group's queue. Each one
//! reports in on a count-up startup semaphore so the group constructor can
//! return only once every worker is alive.

use crate::group::state::{GroupShared, WorkerSlot};
use crate::group::GroupState;
use crate::task::run_task;
use crate::tls;
use crate::CurrentPlatform;
use osal_core::wait::lock;
use osal_core::{kdebug, ktrace, kwarn, CountingSemaphore, OsalError, OsalResult, ThreadPriority};
use std::io;
use std::sync::{Arc, PoisonError};
use std::thread;

/// Per-worker launch parameters
pub(crate) struct WorkerSpec {
    pub index: usize,
    pub name: String,
    pub stack_size: usize,
    pub priority: ThreadPriority,
}

/// Spawn one worker and register it with the group
///
/// The worker is counted live before it starts so a join can never miss it.
pub(crate) fn spawn_worker(
    shared: &Arc<GroupShared>,
    spec: WorkerSpec,
    started: &Arc<CountingSemaphore>,
) -> OsalResult<()> {
    let mut builder = thread::Builder::new().name(spec.name);
    if spec.stack_size != 0 {
        builder = builder.stack_size(spec.stack_size);
    }

    let mut g = lock(&shared.inner);
    g.live_workers += 1;

    let worker_shared = Arc::clone(shared);
    let worker_started = Arc::clone(started);
    let (index, priority) = (spec.index, spec.priority);
    let spawned: io::Result<_> = builder.spawn(move || {
        worker_main(worker_shared, index, priority, worker_started);
    });

    match spawned {
        Ok(handle) => {
            g.workers.push(WorkerSlot {
                thread: handle.thread().id(),
                handle: Some(handle),
                exited: false,
            });
            Ok(())
        }
        Err(e) => {
            g.live_workers -= 1;
            kwarn!("group {}: failed to spawn worker {}: {}", shared.id, index, e);
            Err(OsalError::SpawnFailed)
        }
    }
}

/// Worker thread main loop.
fn worker_main(
    shared: Arc<GroupShared>,
    index: usize,
    priority: ThreadPriority,
    started: Arc<CountingSemaphore>,
) {
    tls::enter_worker(shared.id, index);

    if let Err(e) = CurrentPlatform::apply_priority(priority) {
        kdebug!("priority {} not applied: {}", priority, e);
    }
    kdebug!(
        "group {}: worker {} up (tid {})",
        shared.id,
        index,
        CurrentPlatform::thread_id()
    );

    if let Some(c) = &shared.counter {
        c.increment();
    }
    if let Err(e) = started.post(1) {
        kwarn!("group {}: worker {} startup post failed: {}", shared.id, index, e);
    }
    drop(started);

    let mut g = lock(&shared.inner);
    loop {
        let next = match g.base {
            GroupState::Running | GroupState::Joining => g.queue.pop(),
            GroupState::Stopped | GroupState::Draining => None,
        };

        match next {
            Some(task) => {
                g.in_flight += 1;
                drop(g);

                ktrace!("group {}: worker {} dispatching", shared.id, index);
                run_task(task);

                g = lock(&shared.inner);
                g.in_flight -= 1;
                if g.settle() {
                    shared.idle.notify_all();
                }
            }
            None if g.base == GroupState::Joining => break,
            None => {
                g = shared
                    .work_ready
                    .wait(g)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        }
    }

    // Count out before the group can observe this worker as gone.
    if let Some(c) = &shared.counter {
        c.decrement();
    }
    let me = thread::current().id();
    if let Some(slot) = g.workers.iter_mut().find(|w| w.thread == me) {
        slot.exited = true;
    }
    g.live_workers -= 1;
    drop(g);
    shared.idle.notify_all();

    kdebug!("group {}: worker {} exiting", shared.id, index);
    tls::leave_worker();
}
