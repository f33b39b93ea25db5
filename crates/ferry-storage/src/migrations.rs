// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded schema migrations using refinery.
//!
//! SQL files under `migrations/` are compiled into the binary and applied
//! every time the secondary database is opened.

use ferry_core::FerryError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Apply all pending migrations.
///
/// Refinery records applied versions in `refinery_schema_history`, so this is
/// a no-op on an up-to-date database.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), FerryError> {
    let report = embedded::migrations::runner()
        .run(conn)
        .map_err(FerryError::storage)?;
    for migration in report.applied_migrations() {
        tracing::debug!(version = migration.version(), name = migration.name(), "applied schema migration");
    }
    Ok(())
}
