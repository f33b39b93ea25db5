// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store wiring shared by every CLI command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use ferry_config::FerryConfig;
use ferry_core::{FerryError, SecondaryStore};
use ferry_metrics::FacadeMetrics;
use ferry_mirror::{EngineContext, MirrorSettings};
use ferry_storage::{MemoryPrimaryStore, SqliteSecondaryStore};

/// The primary snapshot, the SQLite secondary, and the context built on them.
pub struct Engine {
    pub primary: Arc<MemoryPrimaryStore>,
    pub secondary: Arc<SqliteSecondaryStore>,
    pub ctx: EngineContext,
    pub mirroring_enabled: bool,
    snapshot_path: PathBuf,
}

impl Engine {
    /// Load the primary snapshot and prepare (but do not open) the secondary.
    pub async fn open(config: &FerryConfig) -> Result<Self, FerryError> {
        let snapshot_path = PathBuf::from(&config.primary.snapshot_path);
        let primary = Arc::new(MemoryPrimaryStore::load(&snapshot_path).await?);
        let secondary = Arc::new(SqliteSecondaryStore::new(config.secondary.clone()));
        let metrics = Arc::new(FacadeMetrics::new(&config.metrics.prefix));

        let ctx = EngineContext::new(
            primary.clone(),
            secondary.clone(),
            metrics,
            MirrorSettings::from(&config.mirror),
        );
        debug!(
            snapshot = %snapshot_path.display(),
            records = primary.len(),
            "engine assembled"
        );

        Ok(Self {
            primary,
            secondary,
            ctx,
            mirroring_enabled: config.mirror.enabled,
            snapshot_path,
        })
    }

    /// Open the secondary database.
    pub async fn initialize(&self) -> Result<(), FerryError> {
        self.secondary.initialize().await
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Write the primary back to its snapshot.
    pub async fn save_primary(&self) -> Result<(), FerryError> {
        self.primary.save(&self.snapshot_path).await
    }

    /// Checkpoint and close the secondary database.
    pub async fn close(&self) {
        if let Err(e) = self.secondary.close().await {
            warn!(error = %e, "failed to close secondary store cleanly");
        }
    }
}
