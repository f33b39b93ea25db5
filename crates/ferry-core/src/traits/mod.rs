// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits consumed by the migration engine.
//!
//! Store traits extend the [`StoreAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod metrics;
pub mod policy;
pub mod primary;
pub mod secondary;

pub use adapter::StoreAdapter;
pub use metrics::MetricsSink;
pub use policy::{Policy, PolicySource};
pub use primary::PrimaryStore;
pub use secondary::SecondaryStore;
