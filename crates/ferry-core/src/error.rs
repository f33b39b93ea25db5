// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Ferry migration engine.

use thiserror::Error;

/// A single record that a bulk insert refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    /// Id of the rejected record.
    pub record_id: String,
    /// Why the secondary store rejected it.
    pub message: String,
}

/// The primary error type used across all Ferry stores and engine components.
///
/// Business-rule variants ([`DuplicateRecord`](Self::DuplicateRecord),
/// [`NotFound`](Self::NotFound), [`InvalidRecord`](Self::InvalidRecord)) are
/// recoverable; [`Initialization`](Self::Initialization) and
/// [`Storage`](Self::Storage) are fatal to the operation that raised them.
#[derive(Debug, Error)]
pub enum FerryError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// The secondary store could not be opened.
    #[error("initialization failed: {0}")]
    Initialization(String),

    /// Storage backend errors (database connection, query failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A bulk insert was rejected. The secondary store has been left empty.
    #[error("bulk insert rejected {} of {attempted} records", failures.len())]
    Migration {
        attempted: usize,
        failures: Vec<RecordFailure>,
    },

    /// A single mirrored event could not be applied to the secondary store.
    #[error("mirror {operation} failed: {message}")]
    MirrorApply {
        operation: String,
        record_id: Option<String>,
        message: String,
    },

    /// A record with the same identity already exists.
    #[error("record already exists: {existing_id}")]
    DuplicateRecord { existing_id: String },

    /// No record matched the requested id or identity.
    #[error("no matching record: {0}")]
    NotFound(String),

    /// The record violates the store's validation rules.
    #[error("invalid record field `{field}`: {reason}")]
    InvalidRecord { field: &'static str, reason: String },

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl FerryError {
    /// Wraps any error as a storage error.
    pub fn storage(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        FerryError::Storage {
            source: Box::new(source),
        }
    }

    /// Returns true for business-rule failures that leave the store usable.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FerryError::DuplicateRecord { .. }
                | FerryError::NotFound(_)
                | FerryError::InvalidRecord { .. }
                | FerryError::MirrorApply { .. }
                | FerryError::Migration { .. }
        )
    }
}
