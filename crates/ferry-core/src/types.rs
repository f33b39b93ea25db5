// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by stores, the migration engine, and telemetry.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A saved credential entry.
///
/// Identity for duplicate detection is (origin, form action origin or http
/// realm, username), never `id`. Timestamps are milliseconds since the Unix
/// epoch.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Opaque identifier, unique within one store.
    #[serde(default)]
    pub id: String,
    pub origin: String,
    #[serde(default)]
    pub form_action_origin: Option<String>,
    #[serde(default)]
    pub http_realm: Option<String>,
    #[serde(default)]
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub username_field: String,
    #[serde(default)]
    pub password_field: String,
    #[serde(default)]
    pub times_used: u64,
    #[serde(default)]
    pub time_created: i64,
    #[serde(default)]
    pub time_last_used: i64,
    #[serde(default)]
    pub time_password_changed: i64,
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("id", &self.id)
            .field("origin", &self.origin)
            .field("form_action_origin", &self.form_action_origin)
            .field("http_realm", &self.http_realm)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("times_used", &self.times_used)
            .finish_non_exhaustive()
    }
}

impl Record {
    /// Form action origin with `None` folded to the empty string.
    pub fn form_action(&self) -> &str {
        self.form_action_origin.as_deref().unwrap_or("")
    }

    /// HTTP realm with `None` folded to the empty string.
    pub fn realm(&self) -> &str {
        self.http_realm.as_deref().unwrap_or("")
    }

    /// Whether two records describe the same login, ignoring id and password.
    ///
    /// An empty form action on either side acts as a wildcard.
    pub fn same_identity(&self, other: &Record) -> bool {
        if self.origin != other.origin || self.realm() != other.realm() {
            return false;
        }
        if self.form_action() != other.form_action()
            && !self.form_action().is_empty()
            && !other.form_action().is_empty()
        {
            return false;
        }
        self.username == other.username
    }
}

/// Order-independent digest of a store's full record set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(pub String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Fingerprint {
    fn from(value: String) -> Self {
        Fingerprint(value)
    }
}

/// A mutation committed by the primary store, in commit order.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationEvent {
    Added(Record),
    Modified { old: Record, new: Record },
    Removed(Record),
    RemovedAll,
    /// An event tag this build does not understand.
    Unknown(String),
}

impl MutationEvent {
    /// Operation name used when reporting failures.
    pub fn operation(&self) -> &'static str {
        match self {
            MutationEvent::Added(_) => "add",
            MutationEvent::Modified { .. } => "modify-login",
            MutationEvent::Removed(_) => "remove-login",
            MutationEvent::RemovedAll => "remove-all-logins",
            MutationEvent::Unknown(_) => "unknown",
        }
    }

    /// Id of the record the event concerns, if any.
    pub fn record_id(&self) -> Option<&str> {
        match self {
            MutationEvent::Added(r) | MutationEvent::Removed(r) => Some(&r.id),
            MutationEvent::Modified { old, .. } => Some(&old.id),
            MutationEvent::RemovedAll | MutationEvent::Unknown(_) => None,
        }
    }
}

/// Count filter over the site-identity fields. Empty strings are wildcards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountFilter {
    pub origin: String,
    pub form_action_origin: String,
    pub http_realm: String,
}

impl CountFilter {
    /// Matches every record.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn matches(&self, record: &Record) -> bool {
        (self.origin.is_empty() || record.origin == self.origin)
            && (self.form_action_origin.is_empty()
                || record.form_action() == self.form_action_origin)
            && (self.http_realm.is_empty() || record.realm() == self.http_realm)
    }
}

/// Record fields inspected by the compatibility classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum RecordField {
    Origin,
    FormActionOrigin,
}

/// Known classes of records the secondary store mishandles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum IncompatibilityClass {
    /// Internationalized hostname that needs ASCII-compatible encoding.
    NonAsciiHostname,
    /// Field value is a lone `"."`.
    DegenerateSeparator,
}

/// A failure reported to the metrics sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFailure {
    pub operation: String,
    pub error_message: String,
    pub record_id: Option<String>,
}

/// Health status of a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login(origin: &str, form_action: Option<&str>, username: &str) -> Record {
        Record {
            id: "id".into(),
            origin: origin.into(),
            form_action_origin: form_action.map(str::to_string),
            http_realm: None,
            username: username.into(),
            password: "pw".into(),
            username_field: String::new(),
            password_field: String::new(),
            times_used: 0,
            time_created: 0,
            time_last_used: 0,
            time_password_changed: 0,
        }
    }

    #[test]
    fn identity_ignores_id_and_password() {
        let a = login("https://a.example", Some("https://a.example"), "u");
        let mut b = a.clone();
        b.id = "other".into();
        b.password = "changed".into();
        assert!(a.same_identity(&b));
    }

    #[test]
    fn empty_form_action_is_identity_wildcard() {
        let a = login("https://a.example", Some(""), "u");
        let b = login("https://a.example", Some("https://login.a.example"), "u");
        assert!(a.same_identity(&b));
        let c = login("https://a.example", Some("https://other.example"), "u");
        assert!(!b.same_identity(&c));
    }

    #[test]
    fn debug_redacts_password() {
        let r = login("https://a.example", None, "u");
        let rendered = format!("{r:?}");
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("\"pw\""));
    }

    #[test]
    fn count_filter_empty_is_wildcard() {
        let r = login("https://a.example", Some("https://a.example"), "u");
        assert!(CountFilter::all().matches(&r));
        let f = CountFilter {
            origin: "https://b.example".into(),
            ..CountFilter::default()
        };
        assert!(!f.matches(&r));
    }

    #[test]
    fn event_operation_names() {
        let r = login("https://a.example", None, "u");
        assert_eq!(MutationEvent::Added(r.clone()).operation(), "add");
        assert_eq!(MutationEvent::RemovedAll.operation(), "remove-all-logins");
        assert_eq!(MutationEvent::Removed(r).record_id(), Some("id"));
    }

    #[test]
    fn incompatibility_labels_are_snake_case() {
        assert_eq!(
            IncompatibilityClass::NonAsciiHostname.to_string(),
            "non_ascii_hostname"
        );
        assert_eq!(RecordField::FormActionOrigin.to_string(), "form_action_origin");
    }
}
