// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base trait shared by every store implementation.

use async_trait::async_trait;

use crate::error::FerryError;
use crate::types::HealthStatus;

/// Identity and health reporting common to primary and secondary stores.
#[async_trait]
pub trait StoreAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this store instance.
    fn name(&self) -> &str;

    /// Performs a health check and returns the store's current status.
    async fn health_check(&self) -> Result<HealthStatus, FerryError>;
}
