// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key/value metadata in the `ferry_meta` table.

use ferry_core::FerryError;
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};

/// Key under which the migration checkpoint is stored.
pub const CHECKPOINT_KEY: &str = "checkpoint";

pub async fn get_meta(db: &Database, key: &str) -> Result<Option<String>, FerryError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<String>, rusqlite::Error> {
            conn.query_row(
                "SELECT value FROM ferry_meta WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn set_meta(db: &Database, key: &str, value: &str) -> Result<(), FerryError> {
    let key = key.to_string();
    let value = value.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO ferry_meta (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
