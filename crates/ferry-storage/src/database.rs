// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All access goes through tokio-rusqlite's single background thread, so the
//! [`Database`] handle is the one writer for its file. Do not open a second
//! connection for writes.

use std::path::Path;

use ferry_core::FerryError;
use tracing::debug;

use crate::migrations::run_migrations;

/// Map a tokio-rusqlite error into the Ferry taxonomy.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> FerryError {
    FerryError::storage(e)
}

/// Handle to an open, migrated SQLite database.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path`, apply PRAGMAs and
    /// run embedded migrations.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, FerryError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(FerryError::storage)?;
        }
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(FerryError::storage)?;
        let db = Self { conn };
        db.prepare(wal_mode).await?;
        debug!(path, wal_mode, "database opened");
        Ok(db)
    }

    /// Open a private in-memory database. Used by tests.
    pub async fn open_in_memory() -> Result<Self, FerryError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(FerryError::storage)?;
        let db = Self { conn };
        db.prepare(false).await?;
        Ok(db)
    }

    async fn prepare(&self, wal_mode: bool) -> Result<(), FerryError> {
        self.conn
            .call(move |conn| -> Result<Result<(), FerryError>, rusqlite::Error> {
                conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")?;
                if wal_mode {
                    let mode: String = conn.pragma_update_and_check(
                        None,
                        "journal_mode",
                        "WAL",
                        |row| row.get(0),
                    )?;
                    debug!(journal_mode = %mode, "journal mode set");
                    conn.pragma_update(None, "synchronous", "NORMAL")?;
                }
                Ok(run_migrations(conn))
            })
            .await
            .map_err(map_tr_err)?
    }

    /// The underlying async connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Flush the WAL into the main database file.
    pub async fn checkpoint_wal(&self) -> Result<(), FerryError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("schema.db");
        let db = Database::open(path.to_str().unwrap(), true).await.unwrap();

        let tables = db
            .connection()
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
                )?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .unwrap();
        assert!(tables.contains(&"logins".to_string()));
        assert!(tables.contains(&"ferry_meta".to_string()));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn reopening_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reopen.db");
        let first = Database::open(path.to_str().unwrap(), true).await.unwrap();
        first.checkpoint_wal().await.unwrap();
        drop(first);
        Database::open(path.to_str().unwrap(), true).await.unwrap();
    }

    #[tokio::test]
    async fn in_memory_database_is_migrated() {
        let db = Database::open_in_memory().await.unwrap();
        let count = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM logins", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
