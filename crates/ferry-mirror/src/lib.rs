// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dual-store migration and mirroring engine.
//!
//! Keeps a secondary store consistent with an authoritative primary during a
//! staged cutover:
//!
//! - [`ChecksumGate`] fingerprints the primary's content.
//! - [`RollingMigrator`] clears and reloads the secondary when the fingerprint
//!   no longer matches the stored checkpoint.
//! - [`ChangeMirror`] replays primary mutation events onto the secondary, in
//!   order, isolating each failure.
//! - [`CompatibilityFilter`] classifies records the secondary mishandles.
//! - [`ActivationController`] arms and disarms the mirror according to
//!   policy.

pub mod activation;
pub mod checksum;
pub mod compat;
pub mod context;
pub mod migrator;
pub mod mirror;
pub mod policy;

pub use activation::{ActivationController, ActivationState};
pub use checksum::ChecksumGate;
pub use compat::{CompatibilityFilter, Finding};
pub use context::{EngineContext, MirrorSettings};
pub use migrator::{MigrationOutcome, RollingMigrator, MIGRATION_OPERATION};
pub use mirror::{ChangeMirror, MirrorProgress, MirrorTask};
pub use policy::WatchPolicy;
