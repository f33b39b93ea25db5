// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ferry status` and `ferry fingerprint` command implementations.
//!
//! Both are read-only: they never clear, migrate, or write a checkpoint.

use serde::Serialize;

use ferry_core::{CountFilter, FerryError, HealthStatus, PrimaryStore, SecondaryStore, StoreAdapter};
use ferry_mirror::ChecksumGate;

use crate::engine::Engine;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub snapshot_path: String,
    pub database_path: String,
    pub fingerprint: Option<String>,
    pub checkpoint: Option<String>,
    pub in_sync: bool,
    pub primary_records: usize,
    pub secondary_records: usize,
    pub diff: i64,
    pub secondary_health: String,
}

/// Gather the report. Opens the secondary if it is not open yet.
pub async fn collect_status(engine: &Engine) -> Result<StatusReport, FerryError> {
    engine.initialize().await?;

    let fingerprint = ChecksumGate::compute_fingerprint(engine.primary.as_ref()).await?;
    let checkpoint = engine.secondary.checkpoint().await?;
    let primary_records = engine.primary.count_all(&CountFilter::all()).await?;
    let secondary_records = engine.secondary.count().await?;
    let health = match engine.secondary.health_check().await? {
        HealthStatus::Healthy => "healthy".to_string(),
        HealthStatus::Degraded(reason) => format!("degraded: {reason}"),
        HealthStatus::Unhealthy(reason) => format!("unhealthy: {reason}"),
    };

    Ok(StatusReport {
        snapshot_path: engine.snapshot_path().display().to_string(),
        database_path: engine.secondary.database_path().to_string(),
        in_sync: fingerprint.is_some() && fingerprint == checkpoint,
        fingerprint: fingerprint.map(|f| f.0),
        checkpoint: checkpoint.map(|c| c.0),
        primary_records,
        secondary_records,
        diff: primary_records as i64 - secondary_records as i64,
        secondary_health: health,
    })
}

/// Run `ferry status`.
pub async fn run_status(engine: &Engine, json: bool) -> Result<(), FerryError> {
    let report = collect_status(engine).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("primary:    {} ({} records)", report.snapshot_path, report.primary_records);
    println!(
        "secondary:  {} ({} records, {})",
        report.database_path, report.secondary_records, report.secondary_health
    );
    println!(
        "fingerprint: {}",
        report.fingerprint.as_deref().unwrap_or("empty")
    );
    println!(
        "checkpoint:  {}",
        report.checkpoint.as_deref().unwrap_or("none")
    );
    println!("diff:        {}", report.diff);
    println!(
        "state:       {}",
        if report.in_sync { "in sync" } else { "migration pending" }
    );
    Ok(())
}

/// Run `ferry fingerprint`. Prints `empty` for an empty primary.
pub async fn run_fingerprint(engine: &Engine) -> Result<(), FerryError> {
    match ChecksumGate::compute_fingerprint(engine.primary.as_ref()).await? {
        Some(fingerprint) => println!("{fingerprint}"),
        None => println!("empty"),
    }
    Ok(())
}
