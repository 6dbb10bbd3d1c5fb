//! Wall-clock helpers.
//!
//! Timestamps travel through the value store and the heartbeat frames as
//! epoch milliseconds, the unit the controller itself uses.

use chrono::Utc;

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
