// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process policy source backed by a watch channel.

use tokio::sync::watch;

use ferry_core::{Policy, PolicySource};

/// Holds the mirroring flag and the lock precondition; every setter
/// notifies watchers, even when the value does not change.
#[derive(Debug)]
pub struct WatchPolicy {
    tx: watch::Sender<Policy>,
}

impl WatchPolicy {
    pub fn new(initial: Policy) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn set_mirroring_enabled(&self, enabled: bool) {
        self.tx.send_modify(|p| p.mirroring_enabled = enabled);
    }

    pub fn set_secret_store_locked(&self, locked: bool) {
        self.tx.send_modify(|p| p.secret_store_locked = locked);
    }

    pub fn set(&self, policy: Policy) {
        self.tx.send_replace(policy);
    }
}

impl PolicySource for WatchPolicy {
    fn current(&self) -> Policy {
        *self.tx.borrow()
    }

    fn watch(&self) -> watch::Receiver<Policy> {
        self.tx.subscribe()
    }
}
