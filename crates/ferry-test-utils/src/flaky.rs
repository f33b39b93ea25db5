// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fault-injecting wrapper around a secondary store.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use ferry_core::{
    FerryError, Fingerprint, HealthStatus, LoginQuery, Record, RecordFailure, SecondaryStore,
    StoreAdapter,
};

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlakyOp {
    Initialize,
    Checkpoint,
    SetCheckpoint,
    ClearAll,
    Insert,
    Update,
    Delete,
    DeleteMany,
    FindMatch,
}

#[derive(Default)]
struct Faults {
    ops: HashSet<FlakyOp>,
    bulk_reject: HashSet<String>,
}

/// Wraps a [`SecondaryStore`] and fails chosen operations on demand.
///
/// With no faults configured every call passes straight through.
pub struct FlakySecondary<S> {
    inner: S,
    faults: Mutex<Faults>,
    bulk_calls: AtomicUsize,
}

impl<S: SecondaryStore> FlakySecondary<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            faults: Mutex::new(Faults::default()),
            bulk_calls: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn faults(&self) -> MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make `op` fail until [`heal`](Self::heal) is called.
    pub fn fail_on(&self, op: FlakyOp) {
        self.faults().ops.insert(op);
    }

    pub fn heal(&self, op: FlakyOp) {
        self.faults().ops.remove(&op);
    }

    /// Make `bulk_insert` reject the record with this id after the records
    /// before it were written, exercising the all-or-nothing cleanup.
    pub fn reject_in_bulk(&self, record_id: &str) {
        self.faults().bulk_reject.insert(record_id.to_string());
    }

    /// Stop rejecting anything in bulk inserts.
    pub fn heal_bulk(&self) {
        self.faults().bulk_reject.clear();
    }

    /// Number of `bulk_insert` calls so far.
    pub fn bulk_insert_calls(&self) -> usize {
        self.bulk_calls.load(Ordering::SeqCst)
    }

    fn check(&self, op: FlakyOp) -> Result<(), FerryError> {
        if self.faults().ops.contains(&op) {
            return Err(match op {
                FlakyOp::Initialize => FerryError::Initialization("injected failure".to_string()),
                other => FerryError::Internal(format!("injected {other:?} failure")),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl<S: SecondaryStore> StoreAdapter for FlakySecondary<S> {
    fn name(&self) -> &str {
        "flaky"
    }

    async fn health_check(&self) -> Result<HealthStatus, FerryError> {
        self.inner.health_check().await
    }
}

#[async_trait]
impl<S: SecondaryStore> SecondaryStore for FlakySecondary<S> {
    async fn initialize(&self) -> Result<(), FerryError> {
        self.check(FlakyOp::Initialize)?;
        self.inner.initialize().await
    }

    async fn checkpoint(&self) -> Result<Option<Fingerprint>, FerryError> {
        self.check(FlakyOp::Checkpoint)?;
        self.inner.checkpoint().await
    }

    async fn set_checkpoint(&self, checkpoint: &Fingerprint) -> Result<(), FerryError> {
        self.check(FlakyOp::SetCheckpoint)?;
        self.inner.set_checkpoint(checkpoint).await
    }

    async fn clear_all(&self) -> Result<(), FerryError> {
        self.check(FlakyOp::ClearAll)?;
        self.inner.clear_all().await
    }

    async fn bulk_insert(&self, records: &[Record]) -> Result<Vec<String>, FerryError> {
        self.bulk_calls.fetch_add(1, Ordering::SeqCst);
        let rejected = {
            let faults = self.faults();
            records
                .iter()
                .position(|r| faults.bulk_reject.contains(&r.id))
        };
        let Some(index) = rejected else {
            return self.inner.bulk_insert(records).await;
        };

        // Write the prefix, then fail and clean up like a real store must.
        self.inner.bulk_insert(&records[..index]).await?;
        self.inner.clear_all().await?;
        Err(FerryError::Migration {
            attempted: records.len(),
            failures: vec![RecordFailure {
                record_id: records[index].id.clone(),
                message: "injected bulk rejection".to_string(),
            }],
        })
    }

    async fn insert(&self, record: &Record) -> Result<Record, FerryError> {
        self.check(FlakyOp::Insert)?;
        self.inner.insert(record).await
    }

    async fn update(&self, id: &str, record: &Record) -> Result<Record, FerryError> {
        self.check(FlakyOp::Update)?;
        self.inner.update(id, record).await
    }

    async fn delete(&self, id: &str) -> Result<(), FerryError> {
        self.check(FlakyOp::Delete)?;
        self.inner.delete(id).await
    }

    async fn delete_many(&self, ids: &[String]) -> Result<(), FerryError> {
        self.check(FlakyOp::DeleteMany)?;
        self.inner.delete_many(ids).await
    }

    async fn list(&self) -> Result<Vec<Record>, FerryError> {
        self.inner.list().await
    }

    async fn get(&self, id: &str) -> Result<Option<Record>, FerryError> {
        self.inner.get(id).await
    }

    async fn find_match(&self, query: &LoginQuery) -> Result<Option<Record>, FerryError> {
        self.check(FlakyOp::FindMatch)?;
        self.inner.find_match(query).await
    }

    async fn count(&self) -> Result<usize, FerryError> {
        self.inner.count().await
    }
}
