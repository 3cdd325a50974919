//! Unix-time helpers shared by headers and the transaction log.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current unix time in seconds, truncated to u32 for page and record headers.
pub fn unix_now_u32() -> u32 {
    unix_now_i64() as u32
}

/// Current unix time in seconds as i64 for the file header.
pub fn unix_now_i64() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
