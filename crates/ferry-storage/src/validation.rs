// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Write-time validation enforced by the secondary store.
//!
//! The secondary is stricter than the primary: records the primary happily
//! keeps may be refused here, and that gap is what the compatibility
//! telemetry measures.

use ferry_core::{FerryError, Record};
use url::Url;

/// Check a record before it is written to the secondary store.
pub fn validate_record(record: &Record) -> Result<(), FerryError> {
    validate_origin("origin", &record.origin)?;

    if let Some(action) = &record.form_action_origin {
        if action == "." {
            return Err(invalid("form_action_origin", "must not be \".\""));
        }
        if !action.is_ascii() {
            return Err(invalid(
                "form_action_origin",
                "hostname must be in ASCII-compatible form",
            ));
        }
    }

    match (&record.form_action_origin, &record.http_realm) {
        (Some(_), Some(_)) => Err(invalid(
            "http_realm",
            "only one of form_action_origin and http_realm may be set",
        )),
        (None, None) => Err(invalid(
            "form_action_origin",
            "one of form_action_origin and http_realm must be set",
        )),
        _ => Ok(()),
    }?;

    if record.password.is_empty() {
        return Err(invalid("password", "must not be empty"));
    }
    Ok(())
}

fn validate_origin(field: &'static str, origin: &str) -> Result<(), FerryError> {
    if origin.is_empty() {
        return Err(invalid(field, "must not be empty"));
    }
    if origin == "." {
        return Err(invalid(field, "must not be \".\""));
    }
    if !origin.is_ascii() {
        return Err(invalid(field, "hostname must be in ASCII-compatible form"));
    }
    Url::parse(origin).map_err(|e| invalid(field, &format!("not a valid origin: {e}")))?;
    Ok(())
}

fn invalid(field: &'static str, reason: &str) -> FerryError {
    FerryError::InvalidRecord {
        field,
        reason: reason.to_string(),
    }
}
