//! The curated metric page.
//!
//! Controller-wide gauges read `hull/getCurrentState`, `sysmon/hasIotNetConflict`
//! and the liveness timestamp. Per-compressor gauges fan out over the
//! compressors listed in `si/getConfiguration` and read each compressor's
//! `dr_ng/values:<iid>` series.

use sam_store::{LIVENESS_KEY, PathToken, ValueStore, path};
use sam_telemetry::metrics::ENTITY_LOOKUP_FAILURES_TOTAL;
use serde_json::Value;
use tracing::warn;

use crate::errors::LookupError;
use crate::fanout::FanOut;
use crate::gauge::Gauge;
use crate::transform::{
    as_number, bool_flag, kelvin_to_celsius, liveness, per_minute_to_per_hour,
};

const CURRENT_STATE: &str = "hull/getCurrentState";
const CONFIGURATION: &str = "si/getConfiguration";
const IOT_NET_CONFLICT: &str = "sysmon/hasIotNetConflict";
const COMPRESSOR_VALUES: &str = "dr_ng/values";

/// A compressor from the controller configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Compressor {
    /// Id keying its value series.
    pub iid: String,
    /// Display name.
    pub name: String,
}

impl Compressor {
    fn value_path(&self, id: &str) -> Vec<PathToken> {
        let mut path = path![format!("{COMPRESSOR_VALUES}:{}", self.iid), "values"];
        path.push(PathToken::find("id", id));
        path.push("value".into());
        path
    }
}

/// Read one configuration entry.
pub fn compressor_at(position: usize, entry: &Value) -> Result<Compressor, LookupError> {
    let iid = match entry.get("iid") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(LookupError::MissingId { position }),
    };
    let name = entry
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| LookupError::MissingName { iid: iid.clone() })?
        .to_string();
    Ok(Compressor { iid, name })
}

/// Configured compressors. Entries that cannot be read are logged, counted
/// and skipped.
pub fn compressors(store: &ValueStore) -> Vec<Compressor> {
    let Some(Value::Array(entries)) = store.get(&path![CONFIGURATION, "compressors"]) else {
        return Vec::new();
    };
    entries
        .iter()
        .enumerate()
        .filter_map(|(position, entry)| match compressor_at(position, entry) {
            Ok(compressor) => Some(compressor),
            Err(error) => {
                warn!(%error, "skipping compressor");
                metrics::counter!(ENTITY_LOOKUP_FAILURES_TOTAL).increment(1);
                None
            }
        })
        .collect()
}

fn non_negative(value: &Value) -> bool {
    as_number(value).is_some_and(|n| n >= 0.0)
}

fn controller_gauges(now_ms: i64) -> Vec<Gauge<'static>> {
    vec![
        Gauge::new("sam_is_alive", path![LIVENESS_KEY])
            .help("1 if a frame arrived from the controller within the last minute")
            .transform(liveness(now_ms)),
        Gauge::new("sam_network_pressure_bar", path![CURRENT_STATE, "pressure"])
            .help("Compressed air network pressure in bar")
            .validity(|v| as_number(v).is_some()),
        Gauge::new(
            "sam_network_pressure_setpoint_bar",
            path![CURRENT_STATE, "pressureSetpoint"],
        )
        .help("Network pressure setpoint in bar")
        .validity(|v| as_number(v).is_some()),
        Gauge::new(
            "sam_network_flow_cubic_meters_per_hour",
            path![CURRENT_STATE, "flow"],
        )
        .help("Delivered free air in cubic meters per hour")
        .transform(per_minute_to_per_hour)
        .validity(non_negative),
        Gauge::new(
            "sam_ambient_temperature_celsius",
            path![CURRENT_STATE, "ambientTemperature"],
        )
        .help("Ambient temperature in degrees Celsius")
        .transform(kelvin_to_celsius),
        Gauge::new("sam_alarm_active", path![CURRENT_STATE, "alarm"])
            .help("1 while an alarm is active")
            .transform(bool_flag),
        Gauge::new("sam_warning_active", path![CURRENT_STATE, "warning"])
            .help("1 while a warning is active")
            .transform(bool_flag),
        Gauge::new("sam_iot_net_conflict", path![IOT_NET_CONFLICT])
            .help("1 if the IoT network conflicts with the plant network")
            .transform(bool_flag),
    ]
}

fn compressor_gauges(compressor: &Compressor) -> Vec<Gauge<'static>> {
    let labelled = |gauge: Gauge<'static>| {
        gauge
            .label("compressor", compressor.name.as_str())
            .label("iid", compressor.iid.as_str())
    };
    vec![
        labelled(
            Gauge::new("sam_compressor_rpm", compressor.value_path("motorSpeed"))
                .help("Compressor motor speed in revolutions per minute")
                .validity(non_negative),
        ),
        labelled(
            Gauge::new("sam_compressor_power_watts", compressor.value_path("power"))
                .help("Compressor electrical power in watts")
                .validity(non_negative),
        ),
        labelled(
            Gauge::new("sam_compressor_running", compressor.value_path("running"))
                .help("1 while the compressor motor runs")
                .transform(bool_flag),
        ),
        labelled(
            Gauge::new(
                "sam_compressor_outlet_temperature_celsius",
                compressor.value_path("outletTemperature"),
            )
            .help("Compressor airend outlet temperature in degrees Celsius")
            .transform(kelvin_to_celsius),
        ),
        labelled(
            Gauge::new(
                "sam_compressor_operating_hours",
                compressor.value_path("operatingHours"),
            )
            .help("Compressor operating hours")
            .validity(non_negative),
        ),
    ]
}

/// Render the full page as of `now_ms`.
pub fn render_page(store: &ValueStore, now_ms: i64) -> String {
    let mut lines: Vec<String> = controller_gauges(now_ms)
        .iter()
        .flat_map(|gauge| gauge.render(store))
        .collect();

    let mut fan = FanOut::new();
    for compressor in compressors(store) {
        for gauge in compressor_gauges(&compressor) {
            fan.add(store, gauge);
        }
    }
    lines.extend(fan.into_lines());

    let mut page = lines.join("\n");
    if !page.is_empty() {
        page.push('\n');
    }
    page
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
