//! Event timestamps.

use std::time::{SystemTime, UNIX_EPOCH};

/// Nanoseconds since the Unix epoch.
///
/// Wall-clock time is used so that traces from different threads can be aligned.
pub type Timestamp = u64;

/// Current wall-clock timestamp.
pub fn now() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as Timestamp)
        .unwrap_or(0)
}
