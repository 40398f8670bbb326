//! Basic thread group example
//!
//! Runs a batch of tasks on a thread group configured from the environment,
//! lets one task drain its own group, and shuts down with an explicit join.
//!
//! # Environment Variables
//!
//! - `OSAL_FLUSH_EPRINT=1` - Flush debug output immediately
//! - `OSAL_LOG_LEVEL=debug` - Set log level (off, error, warn, info, debug, trace)
//! - `OSAL_MIN_THREADS=4` - Worker count (see `ThreadGroupConfig::from_env`)

use osal::{kerror, kinfo, Barrier, CountingSemaphore, OsalResult, ThreadGroup, ThreadGroupConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

// OSAL_LOG_LEVEL=debug OSAL_MIN_THREADS=4 cargo run -p osal-basic
fn main() {
    println!("=== OSAL Thread Group Example ===\n");

    if let Err(e) = run() {
        kerror!("example failed: {}", e);
        std::process::exit(1);
    }

    println!("\n=== Example Complete ===");
}

fn run() -> OsalResult<()> {
    let config = ThreadGroupConfig::from_env().join_timeout(Some(Duration::from_secs(10)));
    config.print();

    let group = Arc::new(ThreadGroup::with_config(config)?);
    let workers = group.min_threads();
    println!("\nGroup {} up with {} workers", group.id(), group.num_threads());

    // Fan-in: the count-up semaphore opens after the last task reports.
    const TASKS: usize = 16;
    let completed = Arc::new(AtomicUsize::new(0));
    let all_done = Arc::new(CountingSemaphore::with_counts(-(TASKS as i32), 1)?);
    let start = Instant::now();
    for i in 0..TASKS {
        let (c, done) = (Arc::clone(&completed), Arc::clone(&all_done));
        group.add(move || {
            std::thread::sleep(Duration::from_millis(5));
            c.fetch_add(1, Ordering::SeqCst);
            if let Err(e) = done.post(1) {
                kerror!("task {} could not report: {}", i, e);
            }
        })?;
    }
    all_done.wait_timeout(Duration::from_secs(10))?;
    println!(
        "{} tasks finished in {:?}",
        completed.load(Ordering::SeqCst),
        start.elapsed()
    );

    // Every worker meets at a manual-reset barrier, which stays open for the
    // late arrivals; the group is then drained from inside one of its own
    // tasks.
    let barrier = Arc::new(Barrier::with_unlock_count(workers as u32, false)?);
    for i in 0..workers {
        let b = Arc::clone(&barrier);
        group.add(move || {
            if let Err(e) = b.post(1) {
                kerror!("task {} could not post the barrier: {}", i, e);
            }
            if let Err(e) = b.wait_timeout(Duration::from_secs(5)) {
                kerror!("task {} left the barrier early: {}", i, e);
            }
        })?;
    }
    let g = Arc::clone(&group);
    let drained = Arc::new(CountingSemaphore::with_counts(0, 1)?);
    let d = Arc::clone(&drained);
    group.add(move || {
        match g.drain() {
            Ok(()) => kinfo!("self-referential drain complete"),
            Err(e) => kerror!("self-referential drain failed: {}", e),
        }
        if let Err(e) = d.post(1) {
            kerror!("drain task could not report: {}", e);
        }
    })?;
    drained.wait_timeout(Duration::from_secs(10))?;
    println!("Barrier round complete, state {}", group.state());
    barrier.reset(0)?;

    group.join(Some(Duration::from_secs(10)))?;
    println!("Joined: state {}, {} threads left", group.state(), group.num_threads());
    Ok(())
}
