// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The authoritative store whose content is mirrored.

use async_trait::async_trait;
use ferry_bus::{Subscription, SubscriptionId};

use crate::error::FerryError;
use crate::traits::adapter::StoreAdapter;
use crate::types::{CountFilter, MutationEvent, Record};

/// Authoritative record store.
///
/// Implementations publish one [`MutationEvent`] per committed mutation, in
/// commit order, to every live subscription. Publishing must never block or
/// fail the mutation itself.
#[async_trait]
pub trait PrimaryStore: StoreAdapter {
    /// Returns every record in the store.
    async fn list_all(&self) -> Result<Vec<Record>, FerryError>;

    /// Counts records matching the site filter. Empty filter fields are wildcards.
    async fn count_all(&self, filter: &CountFilter) -> Result<usize, FerryError>;

    /// Opens a subscription to the mutation feed.
    fn subscribe(&self) -> Subscription<MutationEvent>;

    /// Closes a subscription. Returns false if it was not live.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}
