//! Thread priority hint for worker threads

use core::fmt;
use core::str::FromStr;

/// Scheduling hint applied to every worker of a thread group
///
/// On Linux this maps to a per-thread nice value; elsewhere it is recorded
/// and otherwise ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum ThreadPriority {
    Lowest = 0,
    BelowNormal = 1,
    #[default]
    Normal = 2,
    AboveNormal = 3,
    Highest = 4,
}

impl ThreadPriority {
    /// Number of priority levels
    pub const COUNT: usize = 5;

    /// Nice value used on platforms with per-thread niceness
    ///
    /// Raising priority above Normal needs CAP_SYS_NICE; without it the
    /// request fails and the worker keeps the inherited value.
    #[inline]
    pub const fn nice(&self) -> i32 {
        match self {
            ThreadPriority::Lowest => 19,
            ThreadPriority::BelowNormal => 10,
            ThreadPriority::Normal => 0,
            ThreadPriority::AboveNormal => -10,
            ThreadPriority::Highest => -20,
        }
    }

    /// Iterator over all priorities (lowest to highest)
    pub fn iter() -> impl Iterator<Item = ThreadPriority> {
        [
            ThreadPriority::Lowest,
            ThreadPriority::BelowNormal,
            ThreadPriority::Normal,
            ThreadPriority::AboveNormal,
            ThreadPriority::Highest,
        ]
        .into_iter()
    }
}

impl From<u8> for ThreadPriority {
    fn from(v: u8) -> Self {
        match v {
            0 => ThreadPriority::Lowest,
            1 => ThreadPriority::BelowNormal,
            2 => ThreadPriority::Normal,
            3 => ThreadPriority::AboveNormal,
            4 => ThreadPriority::Highest,
            _ => ThreadPriority::Normal, // Default for invalid
        }
    }
}

impl From<ThreadPriority> for u8 {
    fn from(p: ThreadPriority) -> u8 {
        p as u8
    }
}

impl FromStr for ThreadPriority {
    type Err = ();

    /// Accepts a level name (`lowest`, `below_normal`, `normal`,
    /// `above_normal`, `highest`) or its digit.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase().replace('-', "_");
        match s.as_str() {
            "lowest" | "0" => Ok(ThreadPriority::Lowest),
            "below_normal" | "1" => Ok(ThreadPriority::BelowNormal),
            "normal" | "2" => Ok(ThreadPriority::Normal),
            "above_normal" | "3" => Ok(ThreadPriority::AboveNormal),
            "highest" | "4" => Ok(ThreadPriority::Highest),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ThreadPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadPriority::Lowest => write!(f, "LOWEST"),
            ThreadPriority::BelowNormal => write!(f, "BELOW_NORMAL"),
            ThreadPriority::Normal => write!(f, "NORMAL"),
            ThreadPriority::AboveNormal => write!(f, "ABOVE_NORMAL"),
            ThreadPriority::Highest => write!(f, "HIGHEST"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_ordering() {
        assert!(ThreadPriority::Lowest < ThreadPriority::Normal);
        assert!(ThreadPriority::Normal < ThreadPriority::Highest);
        assert_eq!(ThreadPriority::default(), ThreadPriority::Normal);
        assert_eq!(ThreadPriority::iter().count(), ThreadPriority::COUNT);
    }

    #[test]
    fn test_priority_nice_monotonic() {
        let nices: Vec<i32> = ThreadPriority::iter().map(|p| p.nice()).collect();
        assert!(nices.windows(2).all(|w| w[0] > w[1]));
        assert_eq!(ThreadPriority::Normal.nice(), 0);
    }

    #[test]
    fn test_priority_parse() {
        assert_eq!("highest".parse(), Ok(ThreadPriority::Highest));
        assert_eq!(" Below-Normal ".parse(), Ok(ThreadPriority::BelowNormal));
        assert_eq!("0".parse(), Ok(ThreadPriority::Lowest));
        assert_eq!("urgent".parse::<ThreadPriority>(), Err(()));
        assert_eq!(ThreadPriority::from(42u8), ThreadPriority::Normal);
        assert_eq!(u8::from(ThreadPriority::AboveNormal), 3);
    }
}
