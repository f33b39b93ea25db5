// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory metrics sink that records every call for assertions.

use std::sync::{Mutex, MutexGuard, PoisonError};

use ferry_core::{IncompatibilityClass, MetricsSink, MigrationFailure, RecordField};

#[derive(Default)]
struct Recorded {
    diffs: Vec<i64>,
    incompatibilities: Vec<(RecordField, IncompatibilityClass)>,
    failures: Vec<MigrationFailure>,
}

/// A [`MetricsSink`] that keeps everything it is told.
#[derive(Default)]
pub struct RecordingMetrics {
    recorded: Mutex<Recorded>,
}

impl RecordingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every diff value, oldest first.
    pub fn diffs(&self) -> Vec<i64> {
        self.lock().diffs.clone()
    }

    pub fn last_diff(&self) -> Option<i64> {
        self.lock().diffs.last().copied()
    }

    pub fn incompatibilities(&self) -> Vec<(RecordField, IncompatibilityClass)> {
        self.lock().incompatibilities.clone()
    }

    /// How often `(field, class)` was counted.
    pub fn incompatibility_count(&self, field: RecordField, class: IncompatibilityClass) -> usize {
        self.lock()
            .incompatibilities
            .iter()
            .filter(|(f, c)| *f == field && *c == class)
            .count()
    }

    pub fn failures(&self) -> Vec<MigrationFailure> {
        self.lock().failures.clone()
    }

    /// Failures reported for `operation`.
    pub fn failures_for(&self, operation: &str) -> Vec<MigrationFailure> {
        self.lock()
            .failures
            .iter()
            .filter(|f| f.operation == operation)
            .cloned()
            .collect()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        *self.lock() = Recorded::default();
    }
}

impl MetricsSink for RecordingMetrics {
    fn record_diff_count(&self, diff: i64) {
        self.lock().diffs.push(diff);
    }

    fn record_incompatibility(&self, field: RecordField, class: IncompatibilityClass) {
        self.lock().incompatibilities.push((field, class));
    }

    fn record_migration_failure(&self, failure: &MigrationFailure) {
        self.lock().failures.push(failure.clone());
    }
}
