//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`SamSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply `SAM_*` environment variable overrides (highest priority)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::SamSettings;

/// Resolve the default settings file (`~/.sam-exporter/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".sam-exporter").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<SamSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; a file with invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<SamSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

fn load_file_layer(path: &Path) -> Result<SamSettings> {
    let defaults = serde_json::to_value(SamSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `SAM_*` environment variable overrides to loaded settings.
pub fn apply_env_overrides(settings: &mut SamSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides read through `lookup`.
///
/// Empty strings count as unset. Unparseable numbers and booleans are
/// logged and ignored, keeping the file/default value.
pub fn apply_overrides(settings: &mut SamSettings, lookup: impl Fn(&str) -> Option<String>) {
    let read = |name: &str| lookup(name).filter(|v| !v.is_empty());

    // ── Controller ──────────────────────────────────────────────────
    if let Some(v) = read("SAM_CONTROLLER_HOST") {
        settings.controller.host = v;
    }
    if let Some(v) = read("SAM_CONTROLLER_PORT").and_then(|v| port_or_warn("SAM_CONTROLLER_PORT", &v))
    {
        settings.controller.port = v;
    }
    if let Some(v) = read("SAM_USER") {
        settings.controller.user = v;
    }
    if let Some(v) = read("SAM_PASSWORD") {
        settings.controller.password = v;
    }

    // ── Listener ────────────────────────────────────────────────────
    if let Some(v) = read("SAM_LISTEN_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read("SAM_LISTEN_PORT").and_then(|v| port_or_warn("SAM_LISTEN_PORT", &v))
    {
        settings.server.port = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = read("SAM_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read("SAM_LOG_JSON") {
        match parse_bool(&v) {
            Some(json) => settings.logging.json = json,
            None => warn!(key = "SAM_LOG_JSON", value = %v, "invalid boolean env var, ignoring"),
        }
    }
}

fn port_or_warn(name: &str, val: &str) -> Option<u16> {
    let result = parse_u16_range(val, 1, 65535);
    if result.is_none() {
        warn!(key = name, value = %val, "invalid port env var, ignoring");
    }
    result
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
