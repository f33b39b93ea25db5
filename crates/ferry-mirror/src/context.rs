// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Explicit engine context handed to every component.

use std::sync::Arc;

use ferry_config::model::{IncompatiblePolicy, MirrorConfig};
use ferry_core::{CountFilter, FerryError, MetricsSink, PrimaryStore, SecondaryStore};

/// Tunables for migration and mirroring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorSettings {
    /// Whether records the compatibility filter flags are sent or left out.
    pub incompatible: IncompatiblePolicy,
    /// Record the diff metric on migration runs that change nothing.
    pub diff_on_noop: bool,
    /// Queue depth above which the mirror task warns about lag.
    pub event_buffer_warn: usize,
}

impl Default for MirrorSettings {
    fn default() -> Self {
        Self::from(&MirrorConfig::default())
    }
}

impl From<&MirrorConfig> for MirrorSettings {
    fn from(config: &MirrorConfig) -> Self {
        Self {
            incompatible: config.incompatible_records,
            diff_on_noop: config.diff_on_noop,
            event_buffer_warn: config.event_buffer_warn,
        }
    }
}

/// The stores, the metrics sink, and the settings shared by the migrator,
/// the mirror, and the activation controller.
///
/// Built once by the caller and cloned into each component.
#[derive(Clone)]
pub struct EngineContext {
    pub primary: Arc<dyn PrimaryStore>,
    pub secondary: Arc<dyn SecondaryStore>,
    pub metrics: Arc<dyn MetricsSink>,
    pub settings: MirrorSettings,
}

impl EngineContext {
    pub fn new(
        primary: Arc<dyn PrimaryStore>,
        secondary: Arc<dyn SecondaryStore>,
        metrics: Arc<dyn MetricsSink>,
        settings: MirrorSettings,
    ) -> Self {
        Self {
            primary,
            secondary,
            metrics,
            settings,
        }
    }

    /// Primary record count minus secondary record count.
    pub async fn diff_count(&self) -> Result<i64, FerryError> {
        let primary = self.primary.count_all(&CountFilter::all()).await?;
        let secondary = self.secondary.count().await?;
        Ok(primary as i64 - secondary as i64)
    }

    /// Compute the diff and hand it to the metrics sink.
    pub async fn record_diff(&self) -> Result<i64, FerryError> {
        let diff = self.diff_count().await?;
        self.metrics.record_diff_count(diff);
        Ok(diff)
    }

    /// Whether flagged records are left out of migration and mirroring.
    pub fn skips_incompatible(&self) -> bool {
        self.settings.incompatible == IncompatiblePolicy::Skip
    }
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("primary", &self.primary.name())
            .field("secondary", &self.secondary.name())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
