// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The derived store kept consistent with the primary.

use async_trait::async_trait;

use crate::error::FerryError;
use crate::query::LoginQuery;
use crate::traits::adapter::StoreAdapter;
use crate::types::{Fingerprint, Record};

/// Secondary record store receiving migrated and mirrored records.
///
/// `insert`, `update`, and `delete` raise [`FerryError::DuplicateRecord`] and
/// [`FerryError::NotFound`] directly; the engine converts them into mirror
/// failures only on the mirror path.
#[async_trait]
pub trait SecondaryStore: StoreAdapter {
    /// Opens the backing storage. Must be called before any other method.
    async fn initialize(&self) -> Result<(), FerryError>;

    /// Fingerprint of the primary as of the last completed migration.
    async fn checkpoint(&self) -> Result<Option<Fingerprint>, FerryError>;

    async fn set_checkpoint(&self, checkpoint: &Fingerprint) -> Result<(), FerryError>;

    /// Removes every record. The checkpoint is untouched.
    async fn clear_all(&self) -> Result<(), FerryError>;

    /// Inserts all records or none of them.
    ///
    /// On success returns the stored ids in input order. On failure returns
    /// [`FerryError::Migration`] listing each rejected record, and the store
    /// is left empty.
    async fn bulk_insert(&self, records: &[Record]) -> Result<Vec<String>, FerryError>;

    async fn insert(&self, record: &Record) -> Result<Record, FerryError>;

    /// Replaces the record stored under `id`, keeping `id` and creation time.
    async fn update(&self, id: &str, record: &Record) -> Result<Record, FerryError>;

    async fn delete(&self, id: &str) -> Result<(), FerryError>;

    /// Deletes every listed id, or none if any is unknown.
    async fn delete_many(&self, ids: &[String]) -> Result<(), FerryError>;

    async fn list(&self) -> Result<Vec<Record>, FerryError>;

    async fn get(&self, id: &str) -> Result<Option<Record>, FerryError>;

    /// First stored record satisfying `query` under strict match options.
    async fn find_match(&self, query: &LoginQuery) -> Result<Option<Record>, FerryError>;

    async fn count(&self) -> Result<usize, FerryError>;

    /// Deletes every stored record through `delete_many`. Returns the count removed.
    async fn delete_all(&self) -> Result<usize, FerryError> {
        let ids: Vec<String> = self.list().await?.into_iter().map(|r| r.id).collect();
        let removed = ids.len();
        if removed > 0 {
            self.delete_many(&ids).await?;
        }
        Ok(removed)
    }
}
