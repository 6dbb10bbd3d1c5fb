//! `/health` endpoint.

use std::time::Instant;

use serde::Serialize;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` while the server answers.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Keys held by the value store, the liveness key included.
    pub metrics_stored: usize,
    /// Milliseconds since the latest controller frame; `null` before the first one.
    pub last_frame_age_ms: Option<i64>,
}

/// Build a health response from the store counters.
pub fn health_check(
    start_time: Instant,
    metrics_stored: usize,
    last_frame_ms: Option<i64>,
    now_ms: i64,
) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        metrics_stored,
        last_frame_age_ms: last_frame_ms.map(|ts| now_ms.saturating_sub(ts).max(0)),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
