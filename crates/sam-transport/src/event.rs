//! Application events carried by return code 42.
//!
//! A controller event looks like
//! `42["frommedi",{"data":{"header":{"from":"<metric>"},"body":"<json>"}}]`;
//! the body is itself JSON encoded as a string.

use serde_json::Value;

use crate::errors::EventError;
use crate::frame::Frame;

/// Tag of events pushed by the controller.
pub const FROM_MEDI: &str = "frommedi";

/// Metrics that are large, static or irrelevant and never stored.
pub const FILTERED_METRICS: [&str; 3] = [
    "tm/getTexts",
    "rm/getReportHistory",
    "importer/getsdcardstate",
];

/// Metric shared by several series; told apart by [`DISCRIMINATOR_FIELD`].
pub const DISCRIMINATED_METRIC: &str = "dr_ng/values";

/// Body field appended to [`DISCRIMINATED_METRIC`] as `metric:<value>`.
pub const DISCRIMINATOR_FIELD: &str = "iid";

/// A decoded controller event.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedEvent {
    /// Source metric name from the envelope header.
    pub metric: String,
    /// Decoded body.
    pub data: Value,
}

impl ParsedEvent {
    /// Extract the event from a frame.
    ///
    /// Returns `Ok(None)` when the frame is not a `frommedi` event.
    pub fn from_frame(frame: &Frame) -> Result<Option<Self>, EventError> {
        let Some(items) = frame.array() else {
            return Ok(None);
        };
        if items.first().and_then(Value::as_str) != Some(FROM_MEDI) {
            return Ok(None);
        }

        let data = items.get(1).and_then(|v| v.get("data"));
        let metric = data
            .and_then(|d| d.get("header"))
            .and_then(|h| h.get("from"))
            .and_then(Value::as_str)
            .ok_or(EventError::MissingSource)?
            .to_string();
        let body = data
            .and_then(|d| d.get("body"))
            .and_then(Value::as_str)
            .ok_or_else(|| EventError::MissingBody {
                metric: metric.clone(),
            })?;
        let data = serde_json::from_str(body).map_err(|source| EventError::InvalidBody {
            metric: metric.clone(),
            source,
        })?;

        Ok(Some(Self { metric, data }))
    }

    /// Whether the event belongs to a metric that is never stored.
    pub fn is_filtered(&self) -> bool {
        FILTERED_METRICS.contains(&self.metric.as_str())
    }

    /// Value store key for this event.
    pub fn store_key(&self) -> String {
        if self.metric != DISCRIMINATED_METRIC {
            return self.metric.clone();
        }
        match self.data.get(DISCRIMINATOR_FIELD) {
            Some(Value::String(s)) => format!("{}:{s}", self.metric),
            Some(Value::Number(n)) => format!("{}:{n}", self.metric),
            _ => self.metric.clone(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
