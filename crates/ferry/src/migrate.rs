// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ferry migrate` and `ferry audit` command implementations.

use ferry_core::{FerryError, PrimaryStore};
use ferry_mirror::{CompatibilityFilter, MigrationOutcome, RollingMigrator};
use ferry_storage::validate_record;

use crate::engine::Engine;

/// Run one checksum-gated migration and print what it did.
pub async fn run_migrate(engine: &Engine) -> Result<MigrationOutcome, FerryError> {
    engine.initialize().await?;
    let outcome = RollingMigrator::new(engine.ctx.clone()).run_if_needed().await?;
    println!("{}", describe_outcome(&outcome));
    Ok(outcome)
}

pub fn describe_outcome(outcome: &MigrationOutcome) -> String {
    match outcome {
        MigrationOutcome::EmptyPrimary => "primary is empty, nothing to migrate".to_string(),
        MigrationOutcome::UpToDate { checkpoint } => {
            format!("secondary is up to date (checkpoint {checkpoint})")
        }
        MigrationOutcome::Migrated {
            fingerprint,
            inserted,
            skipped,
            diff,
        } => format!(
            "migrated {inserted} records ({skipped} skipped), diff {diff}, checkpoint {fingerprint}"
        ),
    }
}

/// Summary of an audit run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct AuditSummary {
    pub total: usize,
    pub flagged: usize,
    pub rejected: usize,
}

/// Classify every primary record and check it against the secondary's
/// write-time rules. Findings are also counted in the metrics sink.
pub async fn run_audit(engine: &Engine) -> Result<AuditSummary, FerryError> {
    let records = engine.primary.list_all().await?;
    let mut summary = AuditSummary {
        total: records.len(),
        ..AuditSummary::default()
    };

    for record in &records {
        let findings = CompatibilityFilter::report(record, engine.ctx.metrics.as_ref());
        let verdict = validate_record(record).err();
        if findings.is_empty() && verdict.is_none() {
            continue;
        }

        if !findings.is_empty() {
            summary.flagged += 1;
        }
        let mut line = format!("{}\t{}\t{}", record.id, record.origin, record.username);
        for finding in &findings {
            line.push_str(&format!("\t{}:{}", finding.field, finding.class));
        }
        if let Some(e) = verdict {
            summary.rejected += 1;
            line.push_str(&format!("\trejected: {e}"));
        }
        println!("{line}");
    }

    println!(
        "{} of {} records flagged, {} would be rejected by the secondary",
        summary.flagged, summary.total, summary.rejected
    );
    Ok(summary)
}
