// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record stores for the Ferry migration engine.
//!
//! [`MemoryPrimaryStore`] is the authoritative store: it keeps records in
//! memory, persists them as a JSON snapshot, and publishes every mutation on
//! an ordered event bus. [`SqliteSecondaryStore`] is the derived store: a
//! WAL-mode SQLite database with embedded migrations, stricter record
//! validation, and the migration checkpoint.

pub mod database;
pub mod migrations;
pub mod primary;
pub mod queries;
pub mod secondary;
pub mod validation;

pub use database::Database;
pub use primary::MemoryPrimaryStore;
pub use secondary::SqliteSecondaryStore;
pub use validation::validate_record;
