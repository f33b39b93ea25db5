// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Order-independent content fingerprints.
//!
//! Each record is hashed over its canonical JSON serialization. The per-record
//! digests are sorted before being hashed together, so the order in which a
//! store returns its records never affects the result.

use sha2::{Digest, Sha256};

use ferry_core::{FerryError, Fingerprint, PrimaryStore, Record};

/// Computes store fingerprints.
pub struct ChecksumGate;

impl ChecksumGate {
    /// Fingerprint of everything the store currently holds. `None` for an
    /// empty store, which never requires migration.
    pub async fn compute_fingerprint(
        store: &dyn PrimaryStore,
    ) -> Result<Option<Fingerprint>, FerryError> {
        let records = store.list_all().await?;
        Self::fingerprint_records(&records)
    }

    /// Fingerprint of an in-memory record set.
    pub fn fingerprint_records(records: &[Record]) -> Result<Option<Fingerprint>, FerryError> {
        if records.is_empty() {
            return Ok(None);
        }
        let mut digests = records
            .iter()
            .map(record_digest)
            .collect::<Result<Vec<_>, _>>()?;
        digests.sort_unstable();

        let mut hasher = Sha256::new();
        for digest in &digests {
            hasher.update(digest);
        }
        Ok(Some(Fingerprint(hex::encode(hasher.finalize()))))
    }
}

fn record_digest(record: &Record) -> Result<[u8; 32], FerryError> {
    let canonical = serde_json::to_vec(record)?;
    Ok(Sha256::digest(&canonical).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(id: &str, origin: &str, username: &str) -> Record {
        Record {
            id: id.into(),
            origin: origin.into(),
            form_action_origin: Some(origin.into()),
            http_realm: None,
            username: username.into(),
            password: "pw".into(),
            username_field: String::new(),
            password_field: String::new(),
            times_used: 0,
            time_created: 1,
            time_last_used: 1,
            time_password_changed: 1,
        }
    }

    #[test]
    fn empty_set_has_no_fingerprint() {
        assert_eq!(ChecksumGate::fingerprint_records(&[]).unwrap(), None);
    }

    #[test]
    fn fingerprint_is_hex_sha256() {
        let fp = ChecksumGate::fingerprint_records(&[record("1", "https://a.example", "u")])
            .unwrap()
            .unwrap();
        assert_eq!(fp.as_str().len(), 64);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn any_field_change_changes_fingerprint() {
        let a = record("1", "https://a.example", "u");
        let mut b = a.clone();
        b.times_used = 1;
        assert_ne!(
            ChecksumGate::fingerprint_records(&[a]).unwrap(),
            ChecksumGate::fingerprint_records(&[b]).unwrap()
        );
    }

    #[test]
    fn duplicated_record_is_not_absorbed() {
        let a = record("1", "https://a.example", "u");
        assert_ne!(
            ChecksumGate::fingerprint_records(&[a.clone()]).unwrap(),
            ChecksumGate::fingerprint_records(&[a.clone(), a]).unwrap()
        );
    }

    proptest! {
        #[test]
        fn fingerprint_ignores_order(
            users in proptest::collection::vec("[a-z]{1,8}", 1..8),
            seed in any::<u64>(),
        ) {
            let records: Vec<Record> = users
                .iter()
                .enumerate()
                .map(|(i, u)| record(&i.to_string(), "https://a.example", u))
                .collect();
            let mut shuffled = records.clone();
            let len = shuffled.len();
            shuffled.rotate_left((seed as usize) % len);
            shuffled.reverse();

            prop_assert_eq!(
                ChecksumGate::fingerprint_records(&records).unwrap(),
                ChecksumGate::fingerprint_records(&shuffled).unwrap()
            );
        }
    }
}
