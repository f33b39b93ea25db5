// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Ferry integration tests.
//!
//! # Components
//!
//! - [`form_login`] / [`auth_login`] - record builders
//! - [`RecordingMetrics`] - metrics sink that keeps every call
//! - [`FlakySecondary`] - secondary store wrapper with fault injection
//! - [`TestHarness`] - primary + SQLite secondary + metrics + controller

pub mod builders;
pub mod flaky;
pub mod harness;
pub mod recording;

pub use builders::{auth_login, form_login, seeded_login};
pub use flaky::{FlakyOp, FlakySecondary};
pub use harness::{HarnessSecondary, TestHarness};
pub use recording::RecordingMetrics;
