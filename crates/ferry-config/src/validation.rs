// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-empty paths, known log levels, and positive thresholds.

use crate::diagnostic::ConfigError;
use crate::model::FerryConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &FerryConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let level = config.general.log_level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "general.log_level `{}` is not one of {}",
                config.general.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if config.primary.snapshot_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "primary.snapshot_path must not be empty".to_string(),
        });
    }

    if config.secondary.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "secondary.database_path must not be empty".to_string(),
        });
    }

    if !config.secondary.database_path.trim().is_empty()
        && config.secondary.database_path.trim() == config.primary.snapshot_path.trim()
    {
        errors.push(ConfigError::Validation {
            message: "secondary.database_path must differ from primary.snapshot_path".to_string(),
        });
    }

    if config.mirror.event_buffer_warn == 0 {
        errors.push(ConfigError::Validation {
            message: "mirror.event_buffer_warn must be at least 1".to_string(),
        });
    }

    let prefix = config.metrics.prefix.trim();
    if prefix.is_empty() {
        errors.push(ConfigError::Validation {
            message: "metrics.prefix must not be empty".to_string(),
        });
    } else if !prefix
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        errors.push(ConfigError::Validation {
            message: format!("metrics.prefix `{prefix}` may only contain [A-Za-z0-9_]"),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_message(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        let config = FerryConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = FerryConfig::default();
        config.secondary.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "database_path"));
    }

    #[test]
    fn unknown_log_level_fails_validation() {
        let mut config = FerryConfig::default();
        config.general.log_level = "chatty".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "log_level"));
    }

    #[test]
    fn shared_path_fails_validation() {
        let mut config = FerryConfig::default();
        config.primary.snapshot_path = "/tmp/same".to_string();
        config.secondary.database_path = "/tmp/same".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_message(&errors, "must differ"));
    }

    #[test]
    fn collects_all_errors() {
        let mut config = FerryConfig::default();
        config.mirror.event_buffer_warn = 0;
        config.metrics.prefix = "bad-prefix".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
