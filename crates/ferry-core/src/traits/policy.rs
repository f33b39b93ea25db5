// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! External activation policy.

use tokio::sync::watch;

/// Snapshot of the inputs that decide whether mirroring may run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Policy {
    /// The "mirroring enabled" flag.
    pub mirroring_enabled: bool,
    /// Blocking precondition, e.g. the user-secret store is locked.
    pub secret_store_locked: bool,
}

impl Policy {
    /// Target state is enabled iff the flag is set and nothing blocks it.
    pub fn permits_mirroring(&self) -> bool {
        self.mirroring_enabled && !self.secret_store_locked
    }
}

/// Source of the current [`Policy`] plus change notifications.
pub trait PolicySource: Send + Sync {
    /// Re-reads the flag and the precondition.
    fn current(&self) -> Policy;

    /// Receiver that is notified whenever either input changes.
    fn watch(&self) -> watch::Receiver<Policy>;
}
