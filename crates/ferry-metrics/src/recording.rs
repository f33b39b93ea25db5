// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric names, descriptions, and the facade-backed sink.
//!
//! Uses the metrics-rs facade, so whichever recorder is installed (the
//! Prometheus one in the CLI, a local one in tests) collects the values.

use metrics::{describe_counter, describe_gauge};
use tracing::warn;

use ferry_core::{IncompatibilityClass, MetricsSink, MigrationFailure, RecordField};

/// Fully prefixed metric names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricNames {
    pub diff: String,
    pub incompatible: String,
    pub failure: String,
}

impl MetricNames {
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            diff: format!("{prefix}_diff_saved_records"),
            incompatible: format!("{prefix}_incompatible_record_format"),
            failure: format!("{prefix}_migration_failure"),
        }
    }
}

/// Register metric descriptions with the installed recorder.
pub fn register_metrics(names: &MetricNames) {
    describe_gauge!(
        names.diff.clone(),
        "Primary record count minus secondary record count"
    );
    describe_counter!(
        names.incompatible.clone(),
        "Records with a field the secondary store is known to mishandle"
    );
    describe_counter!(
        names.failure.clone(),
        "Failed migration and mirror operations"
    );
}

/// [`MetricsSink`] that forwards to the `metrics` facade.
///
/// Failure details that do not fit a label (error message, record id) are
/// emitted as a structured `warn!` event alongside the counter.
#[derive(Debug, Clone)]
pub struct FacadeMetrics {
    names: MetricNames,
}

impl FacadeMetrics {
    pub fn new(prefix: &str) -> Self {
        Self {
            names: MetricNames::with_prefix(prefix),
        }
    }

    pub fn names(&self) -> &MetricNames {
        &self.names
    }
}

impl MetricsSink for FacadeMetrics {
    fn record_diff_count(&self, diff: i64) {
        metrics::gauge!(self.names.diff.clone()).set(diff as f64);
    }

    fn record_incompatibility(&self, field: RecordField, class: IncompatibilityClass) {
        metrics::counter!(
            self.names.incompatible.clone(),
            "field" => field.to_string(),
            "class" => class.to_string()
        )
        .increment(1);
    }

    fn record_migration_failure(&self, failure: &MigrationFailure) {
        metrics::counter!(
            self.names.failure.clone(),
            "operation" => failure.operation.clone()
        )
        .increment(1);
        warn!(
            operation = %failure.operation,
            record_id = failure.record_id.as_deref().unwrap_or(""),
            error_message = %failure.error_message,
            "migration failure"
        );
    }
}
