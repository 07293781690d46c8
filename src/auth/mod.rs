pub mod cookie;
pub mod jwt;

use chrono::Utc;

/// Current unix time in seconds, the clock handed to credential checks.
pub fn now() -> u64 {
    Utc::now().timestamp() as u64
}
