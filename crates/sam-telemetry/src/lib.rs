//! # sam-telemetry
//!
//! Process-wide observability for the exporter:
//!
//! - [`init_telemetry`] installs the `tracing` subscriber
//! - [`metrics`] installs the Prometheus recorder for the exporter's own
//!   counters and holds their names

#![deny(unsafe_code)]

pub mod metrics;

use sam_settings::LoggingSettings;
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins over `settings.level`. Output goes to stderr, as JSON
/// lines when `settings.json` is set. Subsequent calls are no-ops.
pub fn init_telemetry(settings: &LoggingSettings) {
    let filter = build_filter(&settings.level);

    if settings.json {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .json()
            .with_span_list(true);
        let _ = subscriber.try_init();
    } else {
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .compact();
        let _ = subscriber.try_init();
    }
}

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
