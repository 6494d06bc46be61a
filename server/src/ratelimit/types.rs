//! Rate limiting types.

use std::fmt;
use std::time::Duration;

/// The sliding windows tracked per identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitWindow {
    Minute,
    Hour,
}

impl RateLimitWindow {
    /// Returns the string identifier for this window (used in logs).
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
        }
    }
}

impl fmt::Display for RateLimitWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    /// The request was recorded in both windows.
    Allowed,
    /// A window is at capacity; nothing was recorded.
    Denied {
        /// The window that rejected the request (minute wins ties)
        window: RateLimitWindow,
        /// Time until the oldest entry of that window ages out
        retry_after: Duration,
    },
}

impl RateDecision {
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}
