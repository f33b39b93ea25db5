// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed record queries with a single match predicate.
//!
//! A [`LoginQuery`] names the fields to compare; `None` means "not part of the
//! query" and `Some("")` means "must be empty". Origin-bearing fields are
//! compared with [`origin_matches`], which honours the [`MatchOptions`] flags.

use url::Url;

use crate::types::Record;

/// Optional relaxations applied when comparing origins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchOptions {
    /// Treat `https://www.a.example` and `https://login.a.example` as equal.
    pub accept_different_subdomains: bool,
    /// Accept hosts rooted in one of `related_realms`.
    pub accept_related_realms: bool,
    /// Let a stored `http://` origin match a wanted `https://` origin.
    pub scheme_upgrades: bool,
    pub related_realms: Vec<String>,
}

/// Query over record fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginQuery {
    pub id: Option<String>,
    pub origin: Option<String>,
    pub form_action_origin: Option<String>,
    pub http_realm: Option<String>,
    pub username: Option<String>,
    pub username_field: Option<String>,
    pub password_field: Option<String>,
}

impl LoginQuery {
    /// Query that finds the stored counterpart of `record` by identity fields.
    pub fn identity_of(record: &Record) -> Self {
        Self {
            origin: Some(record.origin.clone()),
            form_action_origin: Some(record.form_action().to_string()),
            http_realm: Some(record.realm().to_string()),
            username: Some(record.username.clone()),
            ..Self::default()
        }
    }

    /// Query by site only (origin plus form action or realm).
    pub fn site_of(record: &Record) -> Self {
        Self {
            origin: Some(record.origin.clone()),
            form_action_origin: Some(record.form_action().to_string()),
            http_realm: Some(record.realm().to_string()),
            ..Self::default()
        }
    }

    fn field_count(&self) -> usize {
        [
            &self.id,
            &self.origin,
            &self.form_action_origin,
            &self.http_realm,
            &self.username,
            &self.username_field,
            &self.password_field,
        ]
        .iter()
        .filter(|f| f.is_some())
        .count()
    }

    /// Returns true if `record` satisfies every field named by the query.
    pub fn matches(&self, record: &Record, options: &MatchOptions) -> bool {
        if let Some(wanted) = &self.form_action_origin {
            // A stored empty form action, or an empty wanted value combined
            // with other criteria, matches anything.
            let wildcard =
                record.form_action().is_empty() || (wanted.is_empty() && self.field_count() != 1);
            if !wildcard && !origin_matches(record.form_action(), wanted, options) {
                return false;
            }
        }
        if let Some(wanted) = &self.origin
            && !origin_matches(&record.origin, wanted, options)
        {
            return false;
        }
        let exact = [
            (&self.id, record.id.as_str()),
            (&self.http_realm, record.realm()),
            (&self.username, record.username.as_str()),
            (&self.username_field, record.username_field.as_str()),
            (&self.password_field, record.password_field.as_str()),
        ];
        exact
            .iter()
            .all(|(wanted, stored)| wanted.as_deref().is_none_or(|w| w == *stored))
    }
}

/// Compare a stored origin against a wanted origin.
///
/// Identical strings always match. Otherwise both sides must parse as URLs
/// and one of the enabled relaxations must apply.
pub fn origin_matches(stored: &str, wanted: &str, options: &MatchOptions) -> bool {
    if stored == wanted {
        return true;
    }
    if !options.accept_different_subdomains && !options.scheme_upgrades {
        return false;
    }
    let (Ok(stored_url), Ok(wanted_url)) = (Url::parse(stored), Url::parse(wanted)) else {
        return false;
    };
    let (Some(stored_host), Some(wanted_host)) = (stored_url.host_str(), wanted_url.host_str())
    else {
        return false;
    };
    let upgraded = stored_url.scheme() == "http" && wanted_url.scheme() == "https";

    if options.accept_different_subdomains {
        if base_domain(stored_host) == base_domain(wanted_host)
            && (stored_url.scheme() == wanted_url.scheme() || (options.scheme_upgrades && upgraded))
        {
            return true;
        }
        if options.accept_related_realms
            && options
                .related_realms
                .iter()
                .any(|realm| has_root_domain(stored_host, realm))
        {
            return true;
        }
    }

    options.scheme_upgrades
        && upgraded
        && stored_host == wanted_host
        && stored_url.port() == wanted_url.port()
}

/// Registrable domain approximation: the last two labels of a DNS name.
///
/// IP literals and single-label hosts are returned unchanged.
pub fn base_domain(host: &str) -> &str {
    if host.parse::<std::net::IpAddr>().is_ok() || host.starts_with('[') {
        return host;
    }
    let mut dots = host.rmatch_indices('.');
    dots.next();
    match dots.next() {
        Some((idx, _)) => &host[idx + 1..],
        None => host,
    }
}

fn has_root_domain(host: &str, root: &str) -> bool {
    host == root
        || host
            .strip_suffix(root)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(origin: &str, form_action: &str, realm: &str, username: &str) -> Record {
        Record {
            id: "r1".into(),
            origin: origin.into(),
            form_action_origin: (!form_action.is_empty()).then(|| form_action.to_string()),
            http_realm: (!realm.is_empty()).then(|| realm.to_string()),
            username: username.into(),
            password: "pw".into(),
            username_field: "user".into(),
            password_field: "pass".into(),
            times_used: 1,
            time_created: 1,
            time_last_used: 1,
            time_password_changed: 1,
        }
    }

    #[test]
    fn identical_origins_match_without_options() {
        assert!(origin_matches(
            "https://a.example",
            "https://a.example",
            &MatchOptions::default()
        ));
        assert!(!origin_matches(
            "http://a.example",
            "https://a.example",
            &MatchOptions::default()
        ));
    }

    #[test]
    fn scheme_upgrade_requires_same_host_and_port() {
        let opts = MatchOptions {
            scheme_upgrades: true,
            ..MatchOptions::default()
        };
        assert!(origin_matches("http://a.example", "https://a.example", &opts));
        assert!(!origin_matches("https://a.example", "http://a.example", &opts));
        assert!(!origin_matches("http://a.example:8080", "https://a.example", &opts));
    }

    #[test]
    fn subdomains_share_base_domain() {
        let opts = MatchOptions {
            accept_different_subdomains: true,
            ..MatchOptions::default()
        };
        assert!(origin_matches(
            "https://login.a.example",
            "https://www.a.example",
            &opts
        ));
        assert!(!origin_matches(
            "https://login.b.example",
            "https://www.a.example",
            &opts
        ));
    }

    #[test]
    fn related_realms_extend_subdomain_matching() {
        let opts = MatchOptions {
            accept_different_subdomains: true,
            accept_related_realms: true,
            related_realms: vec!["partner.example".into()],
            ..MatchOptions::default()
        };
        assert!(origin_matches(
            "https://sso.partner.example",
            "https://a.example",
            &opts
        ));
    }

    #[test]
    fn base_domain_takes_last_two_labels() {
        assert_eq!(base_domain("www.login.a.example"), "a.example");
        assert_eq!(base_domain("a.example"), "a.example");
        assert_eq!(base_domain("localhost"), "localhost");
        assert_eq!(base_domain("10.0.0.1"), "10.0.0.1");
    }

    #[test]
    fn identity_query_finds_counterpart() {
        let stored = record("https://a.example", "https://a.example", "", "u");
        let query = LoginQuery::identity_of(&stored);
        assert!(query.matches(&stored, &MatchOptions::default()));

        let other_user = record("https://a.example", "https://a.example", "", "v");
        assert!(!query.matches(&other_user, &MatchOptions::default()));
    }

    #[test]
    fn identity_query_distinguishes_realm_from_form_login() {
        let form = record("https://a.example", "https://a.example", "", "u");
        let auth = record("https://a.example", "", "Protected", "u");
        let query = LoginQuery::identity_of(&form);
        assert!(!query.matches(&auth, &MatchOptions::default()));
    }

    #[test]
    fn stored_empty_form_action_is_wildcard() {
        let stored = record("https://a.example", "", "", "u");
        let query = LoginQuery {
            form_action_origin: Some("https://elsewhere.example".into()),
            ..LoginQuery::default()
        };
        assert!(query.matches(&stored, &MatchOptions::default()));
    }

    #[test]
    fn empty_wanted_value_requires_empty_field() {
        let stored = record("https://a.example", "", "Realm", "u");
        let query = LoginQuery {
            http_realm: Some(String::new()),
            ..LoginQuery::default()
        };
        assert!(!query.matches(&stored, &MatchOptions::default()));
    }
}
