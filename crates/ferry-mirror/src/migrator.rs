// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Checksum-gated full resync of the secondary store.
//!
//! A run is skipped when the primary is empty or its fingerprint equals the
//! secondary's checkpoint. Otherwise the secondary is cleared and reloaded in
//! one bulk insert, and the checkpoint is written only if that insert
//! succeeded. If the checkpoint write itself fails the secondary is emptied
//! again. A failed run therefore leaves the secondary empty with the old
//! checkpoint, and the next run retries the same resync.

use tracing::{debug, error, info};

use ferry_core::{FerryError, Fingerprint, MigrationFailure, Record};

use crate::checksum::ChecksumGate;
use crate::compat::CompatibilityFilter;
use crate::context::EngineContext;

/// Operation name reported for migration failures.
pub const MIGRATION_OPERATION: &str = "rolling-migration";

/// What a migration run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The primary holds no records.
    EmptyPrimary,
    /// The checkpoint already matches the primary.
    UpToDate { checkpoint: Fingerprint },
    /// The secondary was cleared and reloaded.
    Migrated {
        fingerprint: Fingerprint,
        inserted: usize,
        skipped: usize,
        diff: i64,
    },
}

impl MigrationOutcome {
    pub fn executed(&self) -> bool {
        matches!(self, MigrationOutcome::Migrated { .. })
    }
}

/// Runs rolling migrations against the stores in an [`EngineContext`].
pub struct RollingMigrator {
    ctx: EngineContext,
}

impl RollingMigrator {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Resync the secondary if the primary changed since the last checkpoint.
    pub async fn run_if_needed(&self) -> Result<MigrationOutcome, FerryError> {
        let result = self.run_inner().await;
        if let Err(e) = &result
            && !matches!(e, FerryError::Migration { .. })
        {
            self.ctx.metrics.record_migration_failure(&MigrationFailure {
                operation: MIGRATION_OPERATION.to_string(),
                error_message: e.to_string(),
                record_id: None,
            });
            error!(error = %e, "rolling migration failed");
        }
        result
    }

    async fn run_inner(&self) -> Result<MigrationOutcome, FerryError> {
        let Some(fingerprint) = ChecksumGate::compute_fingerprint(self.ctx.primary.as_ref()).await?
        else {
            debug!("primary is empty, nothing to migrate");
            self.noop_diff().await;
            return Ok(MigrationOutcome::EmptyPrimary);
        };

        let checkpoint = self.ctx.secondary.checkpoint().await?;
        if checkpoint.as_ref() == Some(&fingerprint) {
            debug!(checkpoint = %fingerprint, "secondary already matches primary");
            self.noop_diff().await;
            return Ok(MigrationOutcome::UpToDate {
                checkpoint: fingerprint,
            });
        }

        info!(
            fingerprint = %fingerprint,
            checkpoint = checkpoint.as_ref().map(Fingerprint::as_str).unwrap_or("none"),
            "fingerprint changed, resyncing secondary store"
        );
        self.ctx.secondary.clear_all().await?;

        let records = self.ctx.primary.list_all().await?;
        let (records, skipped) = self.select(records);

        if let Err(e) = self.ctx.secondary.bulk_insert(&records).await {
            if let FerryError::Migration { failures, .. } = &e {
                for failure in failures {
                    self.ctx.metrics.record_migration_failure(&MigrationFailure {
                        operation: MIGRATION_OPERATION.to_string(),
                        error_message: failure.message.clone(),
                        record_id: Some(failure.record_id.clone()),
                    });
                }
                error!(
                    rejected = failures.len(),
                    attempted = records.len(),
                    "bulk insert rejected records, secondary left empty"
                );
            }
            return Err(e);
        }

        if let Err(e) = self.ctx.secondary.set_checkpoint(&fingerprint).await {
            // A populated store without its checkpoint is not a valid end state.
            if let Err(clear) = self.ctx.secondary.clear_all().await {
                error!(error = %clear, "could not empty secondary after checkpoint failure");
            }
            return Err(e);
        }
        let diff = self.ctx.record_diff().await?;
        info!(
            inserted = records.len(),
            skipped,
            diff,
            checkpoint = %fingerprint,
            "rolling migration complete"
        );
        Ok(MigrationOutcome::Migrated {
            fingerprint,
            inserted: records.len(),
            skipped,
            diff,
        })
    }

    /// Apply the incompatible-record policy. Returns the records to insert
    /// and how many were left out.
    fn select(&self, records: Vec<Record>) -> (Vec<Record>, usize) {
        if !self.ctx.skips_incompatible() {
            return (records, 0);
        }
        let total = records.len();
        let kept: Vec<Record> = records
            .into_iter()
            .filter(|record| {
                CompatibilityFilter::report(record, self.ctx.metrics.as_ref()).is_empty()
            })
            .collect();
        let skipped = total - kept.len();
        if skipped > 0 {
            debug!(skipped, "left incompatible records out of migration");
        }
        (kept, skipped)
    }

    async fn noop_diff(&self) {
        if !self.ctx.settings.diff_on_noop {
            return;
        }
        if let Err(e) = self.ctx.record_diff().await {
            debug!(error = %e, "could not compute diff for no-op run");
        }
    }
}
