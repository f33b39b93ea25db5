// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record builders for tests.

use ferry_core::Record;

/// A login captured from a web form on `origin`.
///
/// The id and timestamps are left empty so the primary store fills them in.
pub fn form_login(origin: &str, username: &str) -> Record {
    Record {
        id: String::new(),
        origin: origin.to_string(),
        form_action_origin: Some(origin.to_string()),
        http_realm: None,
        username: username.to_string(),
        password: format!("{username}-secret"),
        username_field: "username".to_string(),
        password_field: "password".to_string(),
        times_used: 1,
        time_created: 0,
        time_last_used: 0,
        time_password_changed: 0,
    }
}

/// A login for an HTTP authentication realm.
pub fn auth_login(origin: &str, realm: &str, username: &str) -> Record {
    Record {
        form_action_origin: None,
        http_realm: Some(realm.to_string()),
        username_field: String::new(),
        password_field: String::new(),
        ..form_login(origin, username)
    }
}

/// A form login with a fixed id and creation time, for seeding stores directly.
pub fn seeded_login(id: &str, origin: &str, username: &str, created: i64) -> Record {
    Record {
        id: id.to_string(),
        time_created: created,
        time_last_used: created,
        time_password_changed: created,
        ..form_login(origin, username)
    }
}
