//! Linux platform implementation
//!
//! Linux keeps a nice value per thread, so a worker can adjust its own
//! priority by passing its tid to setpriority(2).

use nix::errno::Errno;
use nix::unistd::gettid;
use osal_core::ThreadPriority;
use std::io;

/// Linux platform handler
pub struct LinuxPlatform;

impl LinuxPlatform {
    /// Apply `priority` to the calling thread
    ///
    /// `Normal` leaves the inherited value untouched.
    pub fn apply_priority(priority: ThreadPriority) -> io::Result<()> {
        if priority == ThreadPriority::Normal {
            return Ok(());
        }
        let tid = gettid();
        // Safety: plain syscall wrapper, no pointers involved.
        let ret = unsafe {
            libc::setpriority(libc::PRIO_PROCESS, tid.as_raw() as libc::id_t, priority.nice())
        };
        Errno::result(ret).map(drop).map_err(io::Error::from)
    }

    /// Kernel thread id of the calling thread
    #[inline]
    pub fn thread_id() -> u64 {
        gettid().as_raw() as u64
    }
}
