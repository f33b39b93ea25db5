// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory authoritative store with JSON snapshot persistence.
//!
//! Every committed mutation publishes exactly one [`MutationEvent`]. The event
//! is published while the record lock is still held, so subscribers observe
//! events in commit order.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ferry_bus::{EventBus, Subscription, SubscriptionId};
use ferry_core::{
    CountFilter, FerryError, HealthStatus, MutationEvent, PrimaryStore, Record, StoreAdapter,
};

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    logins: Vec<Record>,
}

/// The primary record store.
pub struct MemoryPrimaryStore {
    records: Mutex<Vec<Record>>,
    bus: EventBus<MutationEvent>,
}

impl MemoryPrimaryStore {
    pub fn new() -> Self {
        Self::with_records(Vec::new())
    }

    /// Seed the store without publishing events.
    pub fn with_records(records: Vec<Record>) -> Self {
        Self {
            records: Mutex::new(records),
            bus: EventBus::new(),
        }
    }

    /// Load a snapshot written by [`save`](Self::save). A missing file yields
    /// an empty store.
    pub async fn load(path: &Path) -> Result<Self, FerryError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no primary snapshot, starting empty");
                return Ok(Self::new());
            }
            Err(e) => return Err(FerryError::storage(e)),
        };
        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(FerryError::Internal(format!(
                "unsupported snapshot version {} in {}",
                snapshot.version,
                path.display()
            )));
        }
        debug!(path = %path.display(), records = snapshot.logins.len(), "primary snapshot loaded");
        Ok(Self::with_records(snapshot.logins))
    }

    /// Write the current records to `path` (via a temporary file and rename).
    pub async fn save(&self, path: &Path) -> Result<(), FerryError> {
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            logins: self.lock().clone(),
        };
        let bytes = serde_json::to_vec_pretty(&snapshot)?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(FerryError::storage)?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(FerryError::storage)?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(FerryError::storage)?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Record>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a record. Missing ids and timestamps are filled in.
    pub fn add(&self, record: Record) -> Result<Record, FerryError> {
        check_record(&record)?;
        let mut records = self.lock();
        if let Some(existing) = records.iter().find(|r| r.same_identity(&record)) {
            return Err(FerryError::DuplicateRecord {
                existing_id: existing.id.clone(),
            });
        }

        let now = now_ms();
        let mut stored = record;
        if stored.id.is_empty() || records.iter().any(|r| r.id == stored.id) {
            stored.id = uuid::Uuid::new_v4().to_string();
        }
        if stored.time_created == 0 {
            stored.time_created = now;
        }
        if stored.time_last_used == 0 {
            stored.time_last_used = stored.time_created;
        }
        if stored.time_password_changed == 0 {
            stored.time_password_changed = stored.time_created;
        }

        records.push(stored.clone());
        self.bus.publish(&MutationEvent::Added(stored.clone()));
        debug!(id = %stored.id, "primary record added");
        Ok(stored)
    }

    /// Replace `old` with `new`. The stored id and creation time are kept.
    pub fn modify(&self, old: &Record, new: Record) -> Result<Record, FerryError> {
        check_record(&new)?;
        let mut records = self.lock();
        let index = position_of(&records, old)
            .ok_or_else(|| FerryError::NotFound(describe(old)))?;
        let previous = records[index].clone();
        if let Some(clash) = records
            .iter()
            .find(|r| r.id != previous.id && r.same_identity(&new))
        {
            return Err(FerryError::DuplicateRecord {
                existing_id: clash.id.clone(),
            });
        }

        let mut updated = Record {
            id: previous.id.clone(),
            time_created: previous.time_created,
            ..new
        };
        if updated.password != previous.password
            && updated.time_password_changed == previous.time_password_changed
        {
            updated.time_password_changed = now_ms();
        }

        records[index] = updated.clone();
        self.bus.publish(&MutationEvent::Modified {
            old: previous,
            new: updated.clone(),
        });
        debug!(id = %updated.id, "primary record modified");
        Ok(updated)
    }

    /// Remove the stored counterpart of `record` (by id, else identity).
    pub fn remove(&self, record: &Record) -> Result<Record, FerryError> {
        let mut records = self.lock();
        let index = position_of(&records, record)
            .ok_or_else(|| FerryError::NotFound(describe(record)))?;
        let removed = records.remove(index);
        self.bus.publish(&MutationEvent::Removed(removed.clone()));
        debug!(id = %removed.id, "primary record removed");
        Ok(removed)
    }

    /// Remove every record. Always publishes `RemovedAll`.
    pub fn remove_all(&self) -> usize {
        let mut records = self.lock();
        let removed = records.len();
        records.clear();
        self.bus.publish(&MutationEvent::RemovedAll);
        debug!(removed, "primary store cleared");
        removed
    }

    pub fn get(&self, id: &str) -> Option<Record> {
        self.lock().iter().find(|r| r.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of live subscriptions on the mutation feed.
    pub fn subscriber_count(&self) -> usize {
        self.bus.subscriber_count()
    }
}

impl Default for MemoryPrimaryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreAdapter for MemoryPrimaryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn health_check(&self) -> Result<HealthStatus, FerryError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl PrimaryStore for MemoryPrimaryStore {
    async fn list_all(&self) -> Result<Vec<Record>, FerryError> {
        Ok(self.lock().clone())
    }

    async fn count_all(&self, filter: &CountFilter) -> Result<usize, FerryError> {
        Ok(self.lock().iter().filter(|r| filter.matches(r)).count())
    }

    fn subscribe(&self) -> Subscription<MutationEvent> {
        self.bus.subscribe()
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }
}

/// The primary only insists on the fields it cannot work without.
fn check_record(record: &Record) -> Result<(), FerryError> {
    if record.origin.is_empty() {
        return Err(FerryError::InvalidRecord {
            field: "origin",
            reason: "must not be empty".to_string(),
        });
    }
    if record.password.is_empty() {
        return Err(FerryError::InvalidRecord {
            field: "password",
            reason: "must not be empty".to_string(),
        });
    }
    Ok(())
}

fn position_of(records: &[Record], wanted: &Record) -> Option<usize> {
    if !wanted.id.is_empty() {
        return records.iter().position(|r| r.id == wanted.id);
    }
    records.iter().position(|r| r.same_identity(wanted))
}

fn describe(record: &Record) -> String {
    if record.id.is_empty() {
        format!("{} ({})", record.origin, record.username)
    } else {
        record.id.clone()
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn login(origin: &str, username: &str) -> Record {
        Record {
            id: String::new(),
            origin: origin.to_string(),
            form_action_origin: Some(origin.to_string()),
            http_realm: None,
            username: username.to_string(),
            password: "pw".to_string(),
            username_field: String::new(),
            password_field: String::new(),
            times_used: 0,
            time_created: 0,
            time_last_used: 0,
            time_password_changed: 0,
        }
    }

    #[tokio::test]
    async fn add_fills_id_and_timestamps() {
        let store = MemoryPrimaryStore::new();
        let stored = store.add(login("https://a.example", "u")).unwrap();
        assert!(uuid::Uuid::parse_str(&stored.id).is_ok());
        assert!(stored.time_created > 0);
        assert_eq!(stored.time_password_changed, stored.time_created);
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[test]
    fn add_rejects_duplicate_identity() {
        let store = MemoryPrimaryStore::new();
        let first = store.add(login("https://a.example", "u")).unwrap();
        let err = store.add(login("https://a.example", "u")).unwrap_err();
        assert!(matches!(err, FerryError::DuplicateRecord { existing_id } if existing_id == first.id));
    }

    #[test]
    fn primary_accepts_what_secondary_refuses() {
        let store = MemoryPrimaryStore::new();
        let mut odd = login(".", "u");
        odd.form_action_origin = Some(".".into());
        assert!(store.add(odd).is_ok());
    }

    #[tokio::test]
    async fn events_follow_commit_order() {
        let store = MemoryPrimaryStore::new();
        let mut sub = store.subscribe();

        let a = store.add(login("https://a.example", "u")).unwrap();
        let mut changed = a.clone();
        changed.password = "new".into();
        let a2 = store.modify(&a, changed).unwrap();
        store.remove(&a2).unwrap();
        store.remove_all();

        assert_eq!(sub.recv().await, Some(MutationEvent::Added(a.clone())));
        match sub.recv().await {
            Some(MutationEvent::Modified { old, new }) => {
                assert_eq!(old, a);
                assert_eq!(new.id, a.id);
                assert_eq!(new.password, "new");
                assert!(new.time_password_changed >= a.time_password_changed);
            }
            other => panic!("expected Modified, got {other:?}"),
        }
        assert_eq!(sub.recv().await, Some(MutationEvent::Removed(a2)));
        assert_eq!(sub.recv().await, Some(MutationEvent::RemovedAll));
    }

    #[test]
    fn failed_mutations_publish_nothing() {
        let store = MemoryPrimaryStore::new();
        let sub = store.subscribe();
        assert!(store.remove(&login("https://nope.example", "u")).is_err());
        assert!(store.add(login("", "u")).is_err());
        assert_eq!(sub.pending(), 0);
    }

    #[test]
    fn modify_into_existing_identity_is_rejected() {
        let store = MemoryPrimaryStore::new();
        store.add(login("https://a.example", "u")).unwrap();
        let b = store.add(login("https://a.example", "v")).unwrap();
        let err = store.modify(&b, login("https://a.example", "u")).unwrap_err();
        assert!(matches!(err, FerryError::DuplicateRecord { .. }));
    }

    #[tokio::test]
    async fn count_all_treats_empty_filter_fields_as_wildcards() {
        let store = MemoryPrimaryStore::new();
        store.add(login("https://a.example", "u")).unwrap();
        store.add(login("https://a.example", "v")).unwrap();
        store.add(login("https://b.example", "u")).unwrap();

        assert_eq!(store.count_all(&CountFilter::all()).await.unwrap(), 3);
        let filter = CountFilter {
            origin: "https://a.example".into(),
            ..CountFilter::default()
        };
        assert_eq!(store.count_all(&filter).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let store = MemoryPrimaryStore::new();
        let sub = store.subscribe();
        assert_eq!(store.subscriber_count(), 1);
        assert!(store.unsubscribe(sub.id()));
        store.add(login("https://a.example", "u")).unwrap();
        assert_eq!(sub.pending(), 0);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn snapshot_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("primary").join("logins.json");
        let store = MemoryPrimaryStore::new();
        let a = store.add(login("https://a.example", "u")).unwrap();
        store.save(&path).await.unwrap();

        let loaded = MemoryPrimaryStore::load(&path).await.unwrap();
        assert_eq!(loaded.get(&a.id), Some(a));
        assert_eq!(loaded.len(), 1);
    }

    #[tokio::test]
    async fn missing_snapshot_loads_empty() {
        let dir = tempdir().unwrap();
        let store = MemoryPrimaryStore::load(&dir.path().join("absent.json"))
            .await
            .unwrap();
        assert!(store.is_empty());
    }
}
