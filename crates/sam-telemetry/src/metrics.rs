//! Prometheus recorder for the exporter's own counters.
//!
//! The rendered output is appended to the controller page on `/metrics`.

use metrics::{Unit, describe_counter};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the handle used to render the self-metrics section of `/metrics`.
/// Must be called once at startup before any counter is recorded.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe();
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

fn describe() {
    describe_counter!(FRAMES_RECEIVED_TOTAL, Unit::Count, "Frames received from the controller");
    describe_counter!(
        FRAME_DECODE_ERRORS_TOTAL,
        Unit::Count,
        "Frames dropped because they did not start with a return code"
    );
    describe_counter!(EVENTS_STORED_TOTAL, Unit::Count, "Metric updates written to the value store");
    describe_counter!(EVENTS_FILTERED_TOTAL, Unit::Count, "Metric updates dropped as noise");
    describe_counter!(PIPELINE_RESTARTS_TOTAL, Unit::Count, "Pipeline restarts after abnormal disconnects");
    describe_counter!(PIPELINE_FAILURES_TOTAL, Unit::Count, "Pipeline attempts that ended in an error");
    describe_counter!(
        ENTITY_LOOKUP_FAILURES_TOTAL,
        Unit::Count,
        "Per-compressor lookups skipped while rendering"
    );
}

// Metric name constants to avoid typos across crates.

/// Frames received (counter, labels: code).
pub const FRAMES_RECEIVED_TOTAL: &str = "sam_exporter_frames_received_total";
/// Frames that failed to decode (counter).
pub const FRAME_DECODE_ERRORS_TOTAL: &str = "sam_exporter_frame_decode_errors_total";
/// Metric updates stored (counter).
pub const EVENTS_STORED_TOTAL: &str = "sam_exporter_events_stored_total";
/// Metric updates filtered out (counter, labels: metric).
pub const EVENTS_FILTERED_TOTAL: &str = "sam_exporter_events_filtered_total";
/// Pipeline restarts (counter).
pub const PIPELINE_RESTARTS_TOTAL: &str = "sam_exporter_pipeline_restarts_total";
/// Pipeline failures (counter, labels: kind).
pub const PIPELINE_FAILURES_TOTAL: &str = "sam_exporter_pipeline_failures_total";
/// Per-entity lookup failures during rendering (counter).
pub const ENTITY_LOOKUP_FAILURES_TOTAL: &str = "sam_exporter_entity_lookup_failures_total";
