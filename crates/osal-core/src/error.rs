//! Error types for the OSAL primitives and thread group

use core::fmt;

/// Result type for OSAL operations
pub type OsalResult<T> = Result<T, OsalError>;

/// Broad classification of an [`OsalError`]
///
/// Every error is local and recoverable; the kind tells the caller whether a
/// retry can make sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid argument, or the object is in the wrong state for the call
    Usage,

    /// Another shutdown-class operation is already driving
    Contention,

    /// A bounded wait ran past its deadline
    Timeout,

    /// A count or queue limit would have been exceeded
    Capacity,

    /// The OS refused a request (thread spawn, priority change)
    Platform,
}

/// Errors reported by semaphores, barriers and thread groups
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OsalError {
    /// Primitive has not been created (or was destroyed)
    NotCreated,

    /// Primitive is already created
    AlreadyCreated,

    /// A blocked wait was released by `unblock_all()` or `destroy()`
    Unblocked,

    /// Bounded wait expired
    Timeout,

    /// Post would exceed the configured maximum
    CapacityExceeded,

    /// Reset attempted while callers are blocked in `wait()`
    WaitersPresent,

    /// Operation not supported on an auto-reset barrier
    AutoResetBarrier,

    /// Null task submitted to a thread group
    NullTask,

    /// Thread group is stopped
    Stopped,

    /// Thread group is joining or torn down
    Joining,

    /// A join or destroy already owns the teardown
    ShutdownInProgress,

    /// Worker thread could not be spawned
    SpawnFailed,

    /// Thread group configuration rejected
    InvalidConfig(&'static str),
}

impl OsalError {
    /// Classify this error
    pub const fn kind(&self) -> ErrorKind {
        match self {
            OsalError::NotCreated
            | OsalError::AlreadyCreated
            | OsalError::Unblocked
            | OsalError::WaitersPresent
            | OsalError::AutoResetBarrier
            | OsalError::NullTask
            | OsalError::Stopped
            | OsalError::Joining
            | OsalError::InvalidConfig(_) => ErrorKind::Usage,
            OsalError::ShutdownInProgress => ErrorKind::Contention,
            OsalError::Timeout => ErrorKind::Timeout,
            OsalError::CapacityExceeded => ErrorKind::Capacity,
            OsalError::SpawnFailed => ErrorKind::Platform,
        }
    }

    /// True if a bounded wait expired
    #[inline]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, OsalError::Timeout)
    }
}

impl fmt::Display for OsalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OsalError::NotCreated => write!(f, "object not created"),
            OsalError::AlreadyCreated => write!(f, "object already created"),
            OsalError::Unblocked => write!(f, "wait released by unblock"),
            OsalError::Timeout => write!(f, "operation timed out"),
            OsalError::CapacityExceeded => write!(f, "count would exceed maximum"),
            OsalError::WaitersPresent => write!(f, "callers are blocked in wait"),
            OsalError::AutoResetBarrier => write!(f, "not supported on an auto-reset barrier"),
            OsalError::NullTask => write!(f, "null task"),
            OsalError::Stopped => write!(f, "thread group stopped"),
            OsalError::Joining => write!(f, "thread group joining"),
            OsalError::ShutdownInProgress => write!(f, "thread group shutdown already in progress"),
            OsalError::SpawnFailed => write!(f, "failed to spawn worker thread"),
            OsalError::InvalidConfig(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for OsalError {}
