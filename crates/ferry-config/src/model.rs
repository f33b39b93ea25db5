// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Ferry engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Ferry configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FerryConfig {
    /// Process-wide settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Authoritative store settings.
    #[serde(default)]
    pub primary: PrimaryConfig,

    /// Mirrored store settings.
    #[serde(default)]
    pub secondary: SecondaryConfig,

    /// Migration and mirroring behavior.
    #[serde(default)]
    pub mirror: MirrorConfig,

    /// Telemetry settings.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    /// Logging level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Authoritative store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrimaryConfig {
    /// Path to the JSON snapshot holding the authoritative records.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,
}

impl Default for PrimaryConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
        }
    }
}

fn default_snapshot_path() -> String {
    data_file("logins.json")
}

/// Secondary (SQLite) store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SecondaryConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for SecondaryConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    data_file("logins.db")
}

fn default_wal_mode() -> bool {
    true
}

fn data_file(name: &str) -> String {
    dirs::data_dir()
        .map(|p| p.join("ferry").join(name))
        .unwrap_or_else(|| std::path::PathBuf::from(name))
        .display()
        .to_string()
}

/// How records known to be incompatible with the secondary store are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IncompatiblePolicy {
    /// Send them anyway and record the failure.
    #[default]
    Attempt,
    /// Count them in telemetry and leave them out.
    Skip,
}

/// Migration and mirroring behavior.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MirrorConfig {
    /// Default value of the "mirroring enabled" policy flag.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Handling of records the compatibility filter flags.
    #[serde(default)]
    pub incompatible_records: IncompatiblePolicy,

    /// Also record the diff metric when a migration run is a no-op.
    #[serde(default)]
    pub diff_on_noop: bool,

    /// Queue depth above which the mirror logs a lag warning.
    #[serde(default = "default_event_buffer_warn")]
    pub event_buffer_warn: usize,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            incompatible_records: IncompatiblePolicy::default(),
            diff_on_noop: false,
            event_buffer_warn: default_event_buffer_warn(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_event_buffer_warn() -> usize {
    1000
}

/// Telemetry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Prefix for every exported metric name.
    #[serde(default = "default_metrics_prefix")]
    pub prefix: String,

    /// Print the Prometheus exposition when a CLI command finishes.
    #[serde(default)]
    pub render_on_exit: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            prefix: default_metrics_prefix(),
            render_on_exit: false,
        }
    }
}

fn default_metrics_prefix() -> String {
    "ferry".to_string()
}
