// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classification of records the secondary store is known to mishandle.
//!
//! Classification is telemetry only: it never decides by itself whether a
//! record is sent. That is the `incompatible_records` setting's job.

use url::Url;

use ferry_core::{IncompatibilityClass, MetricsSink, Record, RecordField};

/// One flagged field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Finding {
    pub field: RecordField,
    pub class: IncompatibilityClass,
}

/// Stateless record classifier.
pub struct CompatibilityFilter;

impl CompatibilityFilter {
    /// Every finding for `record`, origin first.
    pub fn classify(record: &Record) -> Vec<Finding> {
        let mut findings = Vec::new();
        let fields = [
            (RecordField::Origin, Some(record.origin.as_str())),
            (
                RecordField::FormActionOrigin,
                record.form_action_origin.as_deref(),
            ),
        ];
        for (field, value) in fields {
            let Some(value) = value else { continue };
            if needs_ascii_encoding(value) {
                findings.push(Finding {
                    field,
                    class: IncompatibilityClass::NonAsciiHostname,
                });
            }
            if value == "." {
                findings.push(Finding {
                    field,
                    class: IncompatibilityClass::DegenerateSeparator,
                });
            }
        }
        findings
    }

    /// Classify and count each finding in `metrics`.
    pub fn report(record: &Record, metrics: &dyn MetricsSink) -> Vec<Finding> {
        let findings = Self::classify(record);
        for finding in &findings {
            metrics.record_incompatibility(finding.field, finding.class);
        }
        findings
    }

    pub fn is_compatible(record: &Record) -> bool {
        Self::classify(record).is_empty()
    }
}

/// True when the URL's hostname is (or becomes, once parsed) punycode.
fn needs_ascii_encoding(value: &str) -> bool {
    let Ok(url) = Url::parse(value) else {
        return false;
    };
    url.host_str()
        .is_some_and(|host| host.split('.').any(|label| label.starts_with("xn--")))
}
