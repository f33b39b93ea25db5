// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record CRUD against the `logins` table.
//!
//! Business-rule failures (duplicate identity, unknown id) are decided inside
//! the connection thread, in the same transaction as the write, and handed
//! back as the inner `Result` of the closure.

use ferry_core::{FerryError, LoginQuery, MatchOptions, Record, RecordFailure};
use rusqlite::{params, params_from_iter, OptionalExtension};

use crate::database::{map_tr_err, Database};
use crate::validation::validate_record;

const SELECT_COLUMNS: &str = "SELECT id, origin, form_action_origin, http_realm, username, password,
        username_field, password_field, times_used, time_created, time_last_used,
        time_password_changed
 FROM logins";

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<Record> {
    let times_used: i64 = row.get(8)?;
    Ok(Record {
        id: row.get(0)?,
        origin: row.get(1)?,
        form_action_origin: row.get(2)?,
        http_realm: row.get(3)?,
        username: row.get(4)?,
        password: row.get(5)?,
        username_field: row.get(6)?,
        password_field: row.get(7)?,
        times_used: u64::try_from(times_used).unwrap_or_default(),
        time_created: row.get(9)?,
        time_last_used: row.get(10)?,
        time_password_changed: row.get(11)?,
    })
}

fn select_all(conn: &rusqlite::Connection) -> rusqlite::Result<Vec<Record>> {
    let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY time_created, id"))?;
    let rows = stmt.query_map([], row_to_record)?;
    rows.collect()
}

fn select_one(conn: &rusqlite::Connection, id: &str) -> rusqlite::Result<Option<Record>> {
    conn.query_row(
        &format!("{SELECT_COLUMNS} WHERE id = ?1"),
        params![id],
        row_to_record,
    )
    .optional()
}

/// Id of a stored record with the same identity as `record`, other than `exclude`.
fn find_duplicate(
    conn: &rusqlite::Connection,
    record: &Record,
    exclude: Option<&str>,
) -> rusqlite::Result<Option<String>> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT_COLUMNS} WHERE origin = ?1 AND username = ?2 ORDER BY time_created, id"
    ))?;
    let candidates = stmt.query_map(params![record.origin, record.username], row_to_record)?;
    for candidate in candidates {
        let candidate = candidate?;
        if exclude == Some(candidate.id.as_str()) {
            continue;
        }
        if candidate.same_identity(record) {
            return Ok(Some(candidate.id));
        }
    }
    Ok(None)
}

/// Keep the caller's id when it is free, otherwise mint a new one.
fn assign_id(conn: &rusqlite::Connection, wanted: &str) -> rusqlite::Result<String> {
    if !wanted.is_empty() {
        let taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM logins WHERE id = ?1)",
            params![wanted],
            |row| row.get(0),
        )?;
        if !taken {
            return Ok(wanted.to_string());
        }
    }
    Ok(uuid::Uuid::new_v4().to_string())
}

fn insert_row(conn: &rusqlite::Connection, record: &Record) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO logins (id, origin, form_action_origin, http_realm, username, password,
                             username_field, password_field, times_used, time_created,
                             time_last_used, time_password_changed)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            record.id,
            record.origin,
            record.form_action_origin,
            record.http_realm,
            record.username,
            record.password,
            record.username_field,
            record.password_field,
            i64::try_from(record.times_used).unwrap_or(i64::MAX),
            record.time_created,
            record.time_last_used,
            record.time_password_changed,
        ],
    )?;
    Ok(())
}

/// Insert one record, refusing invalid records and duplicate identities.
pub async fn insert(db: &Database, record: &Record) -> Result<Record, FerryError> {
    validate_record(record)?;
    let record = record.clone();
    db.connection()
        .call(move |conn| -> Result<Result<Record, FerryError>, rusqlite::Error> {
            let tx = conn.transaction()?;
            if let Some(existing_id) = find_duplicate(&tx, &record, None)? {
                return Ok(Err(FerryError::DuplicateRecord { existing_id }));
            }
            let mut stored = record;
            stored.id = assign_id(&tx, &stored.id)?;
            insert_row(&tx, &stored)?;
            tx.commit()?;
            Ok(Ok(stored))
        })
        .await
        .map_err(map_tr_err)?
}

/// Insert every record in one transaction, or none of them.
///
/// All records are checked so the error lists every rejection. On any
/// rejection the transaction is rolled back and the table is emptied.
pub async fn bulk_insert(db: &Database, records: &[Record]) -> Result<Vec<String>, FerryError> {
    let attempted = records.len();
    let mut failures: Vec<RecordFailure> = Vec::new();
    let mut valid = Vec::with_capacity(records.len());
    for record in records {
        match validate_record(record) {
            Ok(()) => valid.push(record.clone()),
            Err(e) => failures.push(RecordFailure {
                record_id: record.id.clone(),
                message: e.to_string(),
            }),
        }
    }

    db.connection()
        .call(move |conn| -> Result<Result<Vec<String>, FerryError>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let mut ids = Vec::with_capacity(valid.len());
            for record in valid {
                if let Some(existing_id) = find_duplicate(&tx, &record, None)? {
                    failures.push(RecordFailure {
                        record_id: record.id.clone(),
                        message: format!("duplicate of {existing_id}"),
                    });
                    continue;
                }
                let mut stored = record;
                stored.id = assign_id(&tx, &stored.id)?;
                match insert_row(&tx, &stored) {
                    Ok(()) => ids.push(stored.id),
                    Err(e) => failures.push(RecordFailure {
                        record_id: stored.id,
                        message: e.to_string(),
                    }),
                }
            }

            if failures.is_empty() {
                tx.commit()?;
                return Ok(Ok(ids));
            }
            tx.rollback()?;
            conn.execute("DELETE FROM logins", [])?;
            Ok(Err(FerryError::Migration {
                attempted,
                failures,
            }))
        })
        .await
        .map_err(map_tr_err)?
}

/// Replace the record stored under `id`, keeping its id and creation time.
pub async fn update(db: &Database, id: &str, record: &Record) -> Result<Record, FerryError> {
    validate_record(record)?;
    let id = id.to_string();
    let record = record.clone();
    db.connection()
        .call(move |conn| -> Result<Result<Record, FerryError>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let Some(existing) = select_one(&tx, &id)? else {
                return Ok(Err(FerryError::NotFound(id)));
            };
            if let Some(existing_id) = find_duplicate(&tx, &record, Some(&id))? {
                return Ok(Err(FerryError::DuplicateRecord { existing_id }));
            }
            let stored = Record {
                id: existing.id,
                time_created: existing.time_created,
                ..record
            };
            tx.execute(
                "UPDATE logins SET origin = ?2, form_action_origin = ?3, http_realm = ?4,
                        username = ?5, password = ?6, username_field = ?7, password_field = ?8,
                        times_used = ?9, time_last_used = ?10, time_password_changed = ?11
                 WHERE id = ?1",
                params![
                    stored.id,
                    stored.origin,
                    stored.form_action_origin,
                    stored.http_realm,
                    stored.username,
                    stored.password,
                    stored.username_field,
                    stored.password_field,
                    i64::try_from(stored.times_used).unwrap_or(i64::MAX),
                    stored.time_last_used,
                    stored.time_password_changed,
                ],
            )?;
            tx.commit()?;
            Ok(Ok(stored))
        })
        .await
        .map_err(map_tr_err)?
}

/// Delete one record by id.
pub async fn delete(db: &Database, id: &str) -> Result<(), FerryError> {
    delete_many(db, &[id.to_string()]).await
}

/// Delete every listed id in one transaction; nothing is deleted if any id is unknown.
pub async fn delete_many(db: &Database, ids: &[String]) -> Result<(), FerryError> {
    let ids = ids.to_vec();
    db.connection()
        .call(move |conn| -> Result<Result<(), FerryError>, rusqlite::Error> {
            let tx = conn.transaction()?;
            for id in ids {
                let removed = tx.execute("DELETE FROM logins WHERE id = ?1", params![id])?;
                if removed == 0 {
                    return Ok(Err(FerryError::NotFound(id)));
                }
            }
            tx.commit()?;
            Ok(Ok(()))
        })
        .await
        .map_err(map_tr_err)?
}

/// Remove every record.
pub async fn clear(db: &Database) -> Result<usize, FerryError> {
    db.connection()
        .call(|conn| -> Result<usize, rusqlite::Error> {
            conn.execute("DELETE FROM logins", [])
        })
        .await
        .map_err(map_tr_err)
}

/// All records ordered by creation time, then id.
pub async fn list(db: &Database) -> Result<Vec<Record>, FerryError> {
    db.connection()
        .call(|conn| -> Result<Vec<Record>, rusqlite::Error> { select_all(conn) })
        .await
        .map_err(map_tr_err)
}

pub async fn get(db: &Database, id: &str) -> Result<Option<Record>, FerryError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<Record>, rusqlite::Error> { select_one(conn, &id) })
        .await
        .map_err(map_tr_err)
}

/// First record, in list order, satisfying `query` under strict options.
///
/// Strict options compare origin and username exactly, so both narrow the
/// candidate set in SQL before the full predicate runs.
pub async fn find_match(db: &Database, query: &LoginQuery) -> Result<Option<Record>, FerryError> {
    let query = query.clone();
    db.connection()
        .call(move |conn| -> Result<Option<Record>, rusqlite::Error> {
            let mut clauses = Vec::new();
            let mut values = Vec::new();
            if let Some(origin) = &query.origin {
                values.push(origin.clone());
                clauses.push(format!("origin = ?{}", values.len()));
            }
            if let Some(username) = &query.username {
                values.push(username.clone());
                clauses.push(format!("username = ?{}", values.len()));
            }
            let filter = if clauses.is_empty() {
                String::new()
            } else {
                format!(" WHERE {}", clauses.join(" AND "))
            };

            let mut stmt =
                conn.prepare(&format!("{SELECT_COLUMNS}{filter} ORDER BY time_created, id"))?;
            let candidates = stmt.query_map(params_from_iter(values.iter()), row_to_record)?;
            let options = MatchOptions::default();
            for candidate in candidates {
                let candidate = candidate?;
                if query.matches(&candidate, &options) {
                    return Ok(Some(candidate));
                }
            }
            Ok(None)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn count(db: &Database) -> Result<usize, FerryError> {
    let n = db
        .connection()
        .call(|conn| -> Result<i64, rusqlite::Error> {
            conn.query_row("SELECT COUNT(*) FROM logins", [], |row| row.get(0))
        })
        .await
        .map_err(map_tr_err)?;
    Ok(usize::try_from(n).unwrap_or_default())
}
