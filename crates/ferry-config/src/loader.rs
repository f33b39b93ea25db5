// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./ferry.toml` > `~/.config/ferry/ferry.toml` > `/etc/ferry/ferry.toml`
//! with environment variable overrides via `FERRY_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::FerryConfig;

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/ferry/ferry.toml";

/// Local config file, relative to the working directory.
pub const LOCAL_CONFIG_FILE: &str = "ferry.toml";

/// Sections whose keys may be overridden from the environment.
const ENV_SECTIONS: &[&str] = &["general", "primary", "secondary", "mirror", "metrics"];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/ferry/ferry.toml` (system-wide)
/// 3. `~/.config/ferry/ferry.toml` (user XDG config)
/// 4. `./ferry.toml` (local directory)
/// 5. `FERRY_*` environment variables
pub fn load_config() -> Result<FerryConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<FerryConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FerryConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<FerryConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FerryConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The Figment used by [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(FerryConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("ferry").join(LOCAL_CONFIG_FILE))
                .unwrap_or_default(),
        ))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Environment provider mapping `FERRY_<SECTION>_<KEY>` to `section.key`.
///
/// Uses `Env::map()` rather than `Env::split("_")` because keys contain
/// underscores: `FERRY_MIRROR_DIFF_ON_NOOP` must become `mirror.diff_on_noop`.
fn env_provider() -> Env {
    Env::prefixed("FERRY_").map(|key| {
        let key_str = key.as_str();
        ENV_SECTIONS
            .iter()
            .find_map(|section| {
                key_str
                    .strip_prefix(section)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|rest| format!("{section}.{rest}"))
            })
            .unwrap_or_else(|| key_str.to_string())
            .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IncompatiblePolicy;

    #[test]
    fn env_overrides_map_to_sections() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("FERRY_MIRROR_DIFF_ON_NOOP", "true");
            jail.set_env("FERRY_SECONDARY_DATABASE_PATH", "/tmp/env.db");
            jail.set_env("FERRY_MIRROR_INCOMPATIBLE_RECORDS", "skip");
            let config = load_config()?;
            assert!(config.mirror.diff_on_noop);
            assert_eq!(config.secondary.database_path, "/tmp/env.db");
            assert_eq!(config.mirror.incompatible_records, IncompatiblePolicy::Skip);
            Ok(())
        });
    }

    #[test]
    fn local_file_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                LOCAL_CONFIG_FILE,
                "[metrics]\nprefix = \"local\"\n[mirror]\nenabled = false\n",
            )?;
            let config = load_config()?;
            assert_eq!(config.metrics.prefix, "local");
            assert!(!config.mirror.enabled);
            Ok(())
        });
    }

    #[test]
    fn explicit_path_is_used() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("custom.toml", "[general]\nlog_level = \"debug\"\n")?;
            let config = load_config_from_path(Path::new("custom.toml"))?;
            assert_eq!(config.general.log_level, "debug");
            Ok(())
        });
    }
}
