//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current UNIX time in whole seconds
pub fn unix_seconds() -> i64 {
    Utc::now().timestamp()
}
