// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end engine tests.
//!
//! `TestHarness` wires an in-memory primary, a temp-dir SQLite secondary
//! (behind [`FlakySecondary`]), a [`RecordingMetrics`] sink, and an
//! [`ActivationController`].

use std::sync::Arc;
use std::time::Duration;

use ferry_config::model::SecondaryConfig;
use ferry_core::{FerryError, Record, SecondaryStore};
use ferry_mirror::{ActivationController, EngineContext, MirrorSettings};
use ferry_storage::{MemoryPrimaryStore, SqliteSecondaryStore};

use crate::flaky::FlakySecondary;
use crate::recording::RecordingMetrics;

/// Secondary store type used by the harness.
pub type HarnessSecondary = FlakySecondary<SqliteSecondaryStore>;

/// Builder for [`TestHarness`].
pub struct TestHarnessBuilder {
    settings: MirrorSettings,
    records: Vec<Record>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            settings: MirrorSettings::default(),
            records: Vec::new(),
        }
    }

    pub fn with_settings(mut self, settings: MirrorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Seed the primary (no events are published for these).
    pub fn with_records(mut self, records: Vec<Record>) -> Self {
        self.records = records;
        self
    }

    pub async fn build(self) -> Result<TestHarness, FerryError> {
        let temp_dir = tempfile::TempDir::new().map_err(FerryError::storage)?;
        let db_path = temp_dir.path().join("secondary.db");

        let primary = Arc::new(MemoryPrimaryStore::with_records(self.records));
        let secondary = Arc::new(FlakySecondary::new(SqliteSecondaryStore::new(
            SecondaryConfig {
                database_path: db_path.display().to_string(),
                wal_mode: true,
            },
        )));
        let metrics = Arc::new(RecordingMetrics::new());
        let ctx = EngineContext::new(
            primary.clone(),
            secondary.clone(),
            metrics.clone(),
            self.settings,
        );
        let controller = ActivationController::new(ctx.clone());

        Ok(TestHarness {
            primary,
            secondary,
            metrics,
            ctx,
            controller,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete engine over temp storage.
pub struct TestHarness {
    pub primary: Arc<MemoryPrimaryStore>,
    pub secondary: Arc<HarnessSecondary>,
    pub metrics: Arc<RecordingMetrics>,
    pub ctx: EngineContext,
    pub controller: ActivationController,
    /// Kept alive so the database outlives the test.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Initialize the secondary without activating the engine.
    pub async fn initialize(&self) -> Result<(), FerryError> {
        self.controller.ensure_initialized().await
    }

    /// Secondary records in list order.
    pub async fn secondary_records(&self) -> Result<Vec<Record>, FerryError> {
        self.secondary.list().await
    }

    /// `(origin, username)` pairs held by the secondary, sorted.
    pub async fn secondary_identities(&self) -> Result<Vec<(String, String)>, FerryError> {
        let mut ids: Vec<_> = self
            .secondary_records()
            .await?
            .into_iter()
            .map(|r| (r.origin, r.username))
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Wait until the live mirror has processed at least `count` events.
    pub async fn wait_for_mirror(&self, count: u64) -> Result<(), FerryError> {
        let mut progress = self
            .controller
            .watch_progress()
            .await
            .ok_or_else(|| FerryError::Internal("mirror is not armed".to_string()))?;
        tokio::time::timeout(
            Duration::from_secs(5),
            progress.wait_for(|p| p.processed() >= count),
        )
        .await
        .map_err(|_| FerryError::Internal(format!("mirror did not reach {count} events")))?
        .map_err(|e| FerryError::Internal(e.to_string()))?;
        Ok(())
    }
}
