// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Ferry dual-store migration engine.
//!
//! This crate provides the record model, the error taxonomy, the typed query
//! predicate, and the collaborator traits (primary store, secondary store,
//! metrics sink, policy source) that the engine is written against.

pub mod error;
pub mod query;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{FerryError, RecordFailure};
pub use query::{LoginQuery, MatchOptions};
pub use types::{
    CountFilter, Fingerprint, HealthStatus, IncompatibilityClass, MigrationFailure,
    MutationEvent, Record, RecordField,
};

pub use ferry_bus::{Subscription, SubscriptionId};
pub use traits::{MetricsSink, Policy, PolicySource, PrimaryStore, SecondaryStore, StoreAdapter};
