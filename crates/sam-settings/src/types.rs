//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so a settings
//! file only needs to name the fields it changes.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

static IPV4_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(([0-9]|[1-9][0-9]|1[0-9]{2}|2[0-4][0-9]|25[0-5])\.){3}([0-9]|[1-9][0-9]|1[0-9]{2}|2[0-4][0-9]|25[0-5])$",
    )
    .unwrap()
});

static HOSTNAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(([a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9\-]*[a-zA-Z0-9])\.)*([A-Za-z0-9]|[A-Za-z0-9][A-Za-z0-9\-]*[A-Za-z0-9])$",
    )
    .unwrap()
});

/// Root settings type for the exporter.
///
/// ```json
/// {
///   "controller": { "host": "192.168.1.20", "user": "prometheus", "password": "..." },
///   "server": { "port": 9689 }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SamSettings {
    /// The controller to ingest from.
    pub controller: ControllerSettings,
    /// Local HTTP listener.
    pub server: ServerSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl SamSettings {
    /// Check that the settings describe a reachable controller.
    pub fn validate(&self) -> Result<()> {
        if !is_valid_host(&self.controller.host) {
            return Err(SettingsError::InvalidValue(format!(
                "controller.host {:?} is not an IPv4 address or host name",
                self.controller.host
            )));
        }
        if self.controller.port == 0 {
            return Err(SettingsError::InvalidValue(
                "controller.port must not be 0".to_string(),
            ));
        }
        if self.server.host.is_empty() {
            return Err(SettingsError::InvalidValue(
                "server.host must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Whether `host` is a dotted IPv4 address or an RFC 1123 host name.
pub fn is_valid_host(host: &str) -> bool {
    !host.is_empty() && (IPV4_PATTERN.is_match(host) || HOSTNAME_PATTERN.is_match(host))
}

/// Controller address and credentials.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControllerSettings {
    /// Host name or IPv4 address.
    pub host: String,
    /// HTTP port.
    pub port: u16,
    /// Login user.
    pub user: String,
    /// Login password, hashed before it leaves the process.
    pub password: String,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 80,
            user: String::new(),
            password: String::new(),
        }
    }
}

impl fmt::Debug for ControllerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// HTTP listener for `/metrics`, `/currentValues` and `/health`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9689,
        }
    }
}

/// Log output configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
