//! # sam-settings
//!
//! Layered configuration for the exporter.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`SamSettings::default()`]
//! 2. **Settings file**: `~/.sam-exporter/settings.json` or `--config`
//! 3. **Environment variables**: `SAM_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::{ControllerSettings, LoggingSettings, SamSettings, ServerSettings};
