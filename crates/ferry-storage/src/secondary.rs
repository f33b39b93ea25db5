// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the SecondaryStore trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use ferry_config::model::SecondaryConfig;
use ferry_core::{
    FerryError, Fingerprint, HealthStatus, LoginQuery, Record, SecondaryStore, StoreAdapter,
};

use crate::database::Database;
use crate::queries::{logins, meta};

/// SQLite-backed secondary store.
///
/// The database is opened lazily by [`SecondaryStore::initialize`]; every
/// other method fails with a storage error until then.
pub struct SqliteSecondaryStore {
    config: SecondaryConfig,
    db: OnceCell<Database>,
}

impl SqliteSecondaryStore {
    /// Create a store for the configured database. Nothing is opened yet.
    pub fn new(config: SecondaryConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Path of the backing database file.
    pub fn database_path(&self) -> &str {
        &self.config.database_path
    }

    /// Whether [`SecondaryStore::initialize`] has completed.
    pub fn is_initialized(&self) -> bool {
        self.db.initialized()
    }

    fn db(&self) -> Result<&Database, FerryError> {
        self.db.get().ok_or_else(|| FerryError::Storage {
            source: "secondary store not initialized -- call initialize() first".into(),
        })
    }

    /// Checkpoint the WAL. A no-op if the store was never opened.
    pub async fn close(&self) -> Result<(), FerryError> {
        if let Some(db) = self.db.get() {
            db.checkpoint_wal().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StoreAdapter for SqliteSecondaryStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn health_check(&self) -> Result<HealthStatus, FerryError> {
        let Some(db) = self.db.get() else {
            return Ok(HealthStatus::Unhealthy("not initialized".to_string()));
        };
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl SecondaryStore for SqliteSecondaryStore {
    async fn initialize(&self) -> Result<(), FerryError> {
        let path = self.config.database_path.clone();
        let wal_mode = self.config.wal_mode;
        self.db
            .get_or_try_init(|| async move {
                Database::open(&path, wal_mode)
                    .await
                    .map_err(|e| FerryError::Initialization(format!("{path}: {e}")))
            })
            .await?;
        info!(path = %self.config.database_path, "secondary store initialized");
        Ok(())
    }

    async fn checkpoint(&self) -> Result<Option<Fingerprint>, FerryError> {
        Ok(meta::get_meta(self.db()?, meta::CHECKPOINT_KEY)
            .await?
            .map(Fingerprint))
    }

    async fn set_checkpoint(&self, checkpoint: &Fingerprint) -> Result<(), FerryError> {
        meta::set_meta(self.db()?, meta::CHECKPOINT_KEY, checkpoint.as_str()).await?;
        debug!(checkpoint = %checkpoint, "checkpoint written");
        Ok(())
    }

    async fn clear_all(&self) -> Result<(), FerryError> {
        let removed = logins::clear(self.db()?).await?;
        debug!(removed, "secondary store cleared");
        Ok(())
    }

    async fn bulk_insert(&self, records: &[Record]) -> Result<Vec<String>, FerryError> {
        logins::bulk_insert(self.db()?, records).await
    }

    async fn insert(&self, record: &Record) -> Result<Record, FerryError> {
        logins::insert(self.db()?, record).await
    }

    async fn update(&self, id: &str, record: &Record) -> Result<Record, FerryError> {
        logins::update(self.db()?, id, record).await
    }

    async fn delete(&self, id: &str) -> Result<(), FerryError> {
        logins::delete(self.db()?, id).await
    }

    async fn delete_many(&self, ids: &[String]) -> Result<(), FerryError> {
        logins::delete_many(self.db()?, ids).await
    }

    async fn list(&self) -> Result<Vec<Record>, FerryError> {
        logins::list(self.db()?).await
    }

    async fn get(&self, id: &str) -> Result<Option<Record>, FerryError> {
        logins::get(self.db()?, id).await
    }

    async fn find_match(&self, query: &LoginQuery) -> Result<Option<Record>, FerryError> {
        logins::find_match(self.db()?, query).await
    }

    async fn count(&self) -> Result<usize, FerryError> {
        logins::count(self.db()?).await
    }
}
