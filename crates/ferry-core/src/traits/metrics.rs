// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Passive telemetry sink.

use crate::types::{IncompatibilityClass, MigrationFailure, RecordField};

/// Receives consistency telemetry from the engine.
///
/// Calls are synchronous and must not fail; implementations buffer or
/// forward as they see fit.
pub trait MetricsSink: Send + Sync + 'static {
    /// Primary record count minus secondary record count.
    fn record_diff_count(&self, diff: i64);

    /// One record field fell into a known-incompatible class.
    fn record_incompatibility(&self, field: RecordField, class: IncompatibilityClass);

    /// A migration or mirror operation failed.
    fn record_migration_failure(&self, failure: &MigrationFailure);
}
