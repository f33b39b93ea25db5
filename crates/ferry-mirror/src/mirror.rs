// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live replay of primary mutation events onto the secondary store.
//!
//! Events are applied one at a time in feed order. Each apply is isolated: a
//! failure is reported to the metrics sink and logged, and the next event is
//! processed as usual. Nothing is ever reported back to the primary.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use ferry_bus::{Subscription, SubscriptionId};
use ferry_core::{FerryError, LoginQuery, MigrationFailure, MutationEvent, PrimaryStore, Record};

use crate::compat::CompatibilityFilter;
use crate::context::EngineContext;

/// Counters published by a running [`MirrorTask`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorProgress {
    pub applied: u64,
    pub failed: u64,
}

impl MirrorProgress {
    pub fn processed(&self) -> u64 {
        self.applied + self.failed
    }
}

/// Applies mutation events to the secondary store.
pub struct ChangeMirror {
    ctx: EngineContext,
}

/// Result of a successful apply.
enum Applied {
    /// The secondary changed; refresh the diff metric.
    Changed,
    /// Nothing to do (skipped incompatible record, or `RemovedAll`).
    Quiet,
}

impl ChangeMirror {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Apply one event. Failures are recorded in the metrics sink and returned
    /// as [`FerryError::MirrorApply`].
    pub async fn apply(&self, event: &MutationEvent) -> Result<(), FerryError> {
        match self.apply_inner(event).await {
            Ok(Applied::Changed) => {
                debug!(operation = event.operation(), id = event.record_id().unwrap_or(""), "mirrored event");
                if let Err(e) = self.ctx.record_diff().await {
                    warn!(error = %e, "could not refresh diff after mirrored event");
                }
                Ok(())
            }
            Ok(Applied::Quiet) => Ok(()),
            Err(e) => {
                let failure = MigrationFailure {
                    operation: event.operation().to_string(),
                    error_message: e.to_string(),
                    record_id: event.record_id().map(String::from),
                };
                self.ctx.metrics.record_migration_failure(&failure);
                warn!(
                    operation = %failure.operation,
                    id = failure.record_id.as_deref().unwrap_or(""),
                    error = %e,
                    "failed to mirror event"
                );
                Err(FerryError::MirrorApply {
                    operation: failure.operation,
                    record_id: failure.record_id,
                    message: failure.error_message,
                })
            }
        }
    }

    async fn apply_inner(&self, event: &MutationEvent) -> Result<Applied, FerryError> {
        let secondary = &self.ctx.secondary;
        match event {
            MutationEvent::Added(record) => {
                if self.flag(record) {
                    debug!(id = %record.id, "skipping incompatible record");
                    return Ok(Applied::Quiet);
                }
                secondary.insert(record).await?;
                Ok(Applied::Changed)
            }
            MutationEvent::Modified { old, new } => {
                let counterpart = secondary.find_match(&LoginQuery::identity_of(old)).await?;
                if self.flag(new) {
                    // The new version is left out, so the old one must go.
                    if let Some(stale) = counterpart {
                        secondary.delete(&stale.id).await?;
                        return Ok(Applied::Changed);
                    }
                    return Ok(Applied::Quiet);
                }
                let target = counterpart.ok_or_else(|| FerryError::NotFound(old.id.clone()))?;
                secondary.update(&target.id, new).await?;
                Ok(Applied::Changed)
            }
            MutationEvent::Removed(record) => {
                match secondary.find_match(&LoginQuery::identity_of(record)).await? {
                    Some(target) => {
                        secondary.delete(&target.id).await?;
                        Ok(Applied::Changed)
                    }
                    None if self.ctx.skips_incompatible()
                        && !CompatibilityFilter::is_compatible(record) =>
                    {
                        Ok(Applied::Quiet)
                    }
                    None => Err(FerryError::NotFound(record.id.clone())),
                }
            }
            MutationEvent::RemovedAll => {
                let removed = secondary.delete_all().await?;
                debug!(removed, "mirrored remove-all");
                Ok(Applied::Quiet)
            }
            MutationEvent::Unknown(tag) => Err(FerryError::MirrorApply {
                operation: event.operation().to_string(),
                record_id: None,
                message: format!("unrecognized event `{tag}`"),
            }),
        }
    }

    /// Count the record's findings; true if it must be left out.
    fn flag(&self, record: &Record) -> bool {
        let findings = CompatibilityFilter::report(record, self.ctx.metrics.as_ref());
        self.ctx.skips_incompatible() && !findings.is_empty()
    }

    /// Drain `subscription` on a background task, one event at a time.
    pub fn spawn(self, subscription: Subscription<MutationEvent>) -> MirrorTask {
        let (subscription_id, mut receiver) = subscription.into_parts();
        let (progress_tx, progress_rx) = watch::channel(MirrorProgress::default());
        let warn_at = self.ctx.settings.event_buffer_warn.max(1);

        let handle = tokio::spawn(async move {
            let mut lagging = false;
            while let Some(event) = receiver.recv().await {
                let backlog = receiver.len();
                if backlog >= warn_at && !lagging {
                    warn!(backlog, subscription = %subscription_id, "mirror is falling behind");
                }
                lagging = backlog >= warn_at;

                let ok = self.apply(&event).await.is_ok();
                progress_tx.send_modify(|p| {
                    if ok {
                        p.applied += 1;
                    } else {
                        p.failed += 1;
                    }
                });
            }
            debug!(subscription = %subscription_id, "mirror feed closed");
        });

        MirrorTask {
            subscription_id,
            progress: progress_rx,
            handle,
        }
    }
}

/// Handle to a running mirror.
pub struct MirrorTask {
    subscription_id: SubscriptionId,
    progress: watch::Receiver<MirrorProgress>,
    handle: JoinHandle<()>,
}

impl MirrorTask {
    pub fn subscription_id(&self) -> SubscriptionId {
        self.subscription_id
    }

    /// Receiver for progress updates.
    pub fn progress(&self) -> watch::Receiver<MirrorProgress> {
        self.progress.clone()
    }

    /// Current counters.
    pub fn snapshot(&self) -> MirrorProgress {
        *self.progress.borrow()
    }

    /// Unsubscribe from `primary` and wait until every already-queued event
    /// has been applied.
    pub async fn stop(self, primary: &dyn PrimaryStore) -> MirrorProgress {
        primary.unsubscribe(self.subscription_id);
        if let Err(e) = self.handle.await {
            error!(error = %e, "mirror task ended abnormally");
        }
        *self.progress.borrow()
    }
}

impl std::fmt::Debug for MirrorTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorTask")
            .field("subscription_id", &self.subscription_id)
            .field("progress", &*self.progress.borrow())
            .finish_non_exhaustive()
    }
}
