//! Value transforms applied before a sample is written.
//!
//! A transform returns `None` when it cannot interpret the value; the sample
//! line is then suppressed.

use serde_json::Value;

/// Staleness window of the liveness gauge, in milliseconds.
pub const LIVENESS_WINDOW_MS: i64 = 60_000;

const ZERO_CELSIUS_IN_KELVIN: f64 = 273.15;

/// Plain string form of a scalar. Containers have no sample form.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Numeric reading of a number or a numeric string.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|n: &f64| n.is_finite())
}

/// Kelvin to degrees Celsius, rounded to two decimals.
pub fn kelvin_to_celsius(value: &Value) -> Option<String> {
    let kelvin = as_number(value)?;
    Some(format_number(round2(kelvin - ZERO_CELSIUS_IN_KELVIN)))
}

/// Per-minute rate to per-hour rate.
pub fn per_minute_to_per_hour(value: &Value) -> Option<String> {
    Some(format_number(as_number(value)? * 60.0))
}

/// Boolean flag as `1`/`0`. Numbers count as set when non-zero.
pub fn bool_flag(value: &Value) -> Option<String> {
    let set = match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => match s.as_str() {
            "true" | "1" => true,
            "false" | "0" => false,
            _ => return None,
        },
        _ => return None,
    };
    Some(if set { "1" } else { "0" }.to_string())
}

/// `1` when the epoch-millisecond timestamp is within
/// [`LIVENESS_WINDOW_MS`] of `now_ms` in either direction, else `0`.
pub fn liveness(now_ms: i64) -> impl Fn(&Value) -> Option<String> {
    move |value: &Value| {
        let ts = value.as_i64()?;
        let fresh = now_ms.abs_diff(ts) <= LIVENESS_WINDOW_MS.unsigned_abs();
        Some(if fresh { "1" } else { "0" }.to_string())
    }
}

fn round2(n: f64) -> f64 {
    (n * 100.0).round() / 100.0
}

fn format_number(n: f64) -> String {
    // Avoid "-0" after rounding.
    if n == 0.0 { "0".to_string() } else { n.to_string() }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
