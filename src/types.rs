//! Type definitions and aliases

use serde::{Deserialize, Serialize};
use std::time::Duration;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Position of a run inside its group, 1-based
pub type SequenceNumber = u32;

/// Outcome of a single run as seen from one side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Not yet executed
    Pending,
    /// Completed with a 200 response
    Success,
    /// Transport error, unexpected status or upstream failure
    Failed,
    /// Deadline expired before the call returned
    Timeout,
    /// Aborted by shutdown
    Cancelled,
}

/// Convert a nanosecond count from the wire into a `Duration`
pub fn duration_from_ns(ns: u64) -> Duration {
    Duration::from_nanos(ns)
}

/// Convert a `Duration` into wire nanoseconds, saturating at `u64::MAX`
pub fn duration_to_ns(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

/// Nanoseconds between two timestamps, clamped at zero when the clock went backwards
pub fn elapsed_ns(start: chrono::DateTime<chrono::Utc>, end: chrono::DateTime<chrono::Utc>) -> u64 {
    (end - start)
        .num_nanoseconds()
        .map(|ns| ns.max(0) as u64)
        .unwrap_or(0)
}
