// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ferry mirror` command implementation.
//!
//! Arms the mirror (migrating first if needed), applies a JSON-lines script
//! of mutations to the primary, disarms the mirror once every event has been
//! replayed, and saves the primary snapshot.
//!
//! One step per line, tagged by `op`:
//!
//! ```text
//! {"op":"add","record":{"origin":"https://a.example","formActionOrigin":"https://a.example","username":"u","password":"p"}}
//! {"op":"modify","old":{...},"new":{...}}
//! {"op":"remove","record":{...}}
//! {"op":"remove_all"}
//! ```
//!
//! Blank lines and lines starting with `#` are ignored.

use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use ferry_core::{FerryError, Policy, Record};
use ferry_mirror::{ActivationController, ActivationState};
use ferry_storage::MemoryPrimaryStore;

use crate::engine::Engine;

/// One scripted mutation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptStep {
    Add { record: Record },
    Modify { old: Record, new: Record },
    Remove { record: Record },
    RemoveAll,
}

/// Parse a script into `(line number, step)` pairs.
pub fn parse_script(text: &str) -> Result<Vec<(usize, ScriptStep)>, FerryError> {
    text.lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(number, line)| {
            serde_json::from_str(line)
                .map(|step| (number, step))
                .map_err(|e| FerryError::Internal(format!("script line {number}: {e}")))
        })
        .collect()
}

fn apply_step(primary: &MemoryPrimaryStore, step: ScriptStep) -> Result<(), FerryError> {
    match step {
        ScriptStep::Add { record } => primary.add(record).map(drop),
        ScriptStep::Modify { old, new } => primary.modify(&old, new).map(drop),
        ScriptStep::Remove { record } => primary.remove(&record).map(drop),
        ScriptStep::RemoveAll => {
            primary.remove_all();
            Ok(())
        }
    }
}

/// What a scripted mirror run did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MirrorSummary {
    pub mirroring: bool,
    pub steps: usize,
    pub rejected_by_primary: usize,
    pub mirrored: u64,
    pub mirror_failures: u64,
    pub diff: i64,
}

/// Run `ferry mirror <script>`.
pub async fn run_mirror(engine: &Engine, script: &Path) -> Result<MirrorSummary, FerryError> {
    let text = tokio::fs::read_to_string(script).await.map_err(|e| {
        FerryError::Internal(format!("cannot read script {}: {e}", script.display()))
    })?;
    let steps = parse_script(&text)?;

    let controller = ActivationController::new(engine.ctx.clone());
    let policy = Policy {
        mirroring_enabled: engine.mirroring_enabled,
        secret_store_locked: false,
    };
    let mirroring = controller.reconcile(policy).await? == ActivationState::Enabled;
    if !mirroring {
        info!("mirroring is disabled, script changes the primary only");
    }
    let progress = controller.watch_progress().await;

    let mut summary = MirrorSummary {
        mirroring,
        steps: steps.len(),
        ..MirrorSummary::default()
    };
    for (line, step) in steps {
        if let Err(e) = apply_step(&engine.primary, step) {
            warn!(line, error = %e, "primary rejected script step");
            summary.rejected_by_primary += 1;
        }
    }

    // Drains every queued event before returning.
    controller.deactivate().await;
    if let Some(progress) = progress {
        let done = *progress.borrow();
        summary.mirrored = done.applied;
        summary.mirror_failures = done.failed;
    }

    engine.save_primary().await?;
    summary.diff = engine.ctx.diff_count().await?;

    println!(
        "{} steps ({} rejected by primary), {} events mirrored, {} failed, diff {}",
        summary.steps,
        summary.rejected_by_primary,
        summary.mirrored,
        summary.mirror_failures,
        summary.diff
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_script_skips_blank_lines_and_comments() {
        let text = r#"
# seed
{"op":"add","record":{"origin":"https://a.example","formActionOrigin":"https://a.example","username":"u","password":"p"}}

{"op":"remove_all"}
"#;
        let steps = parse_script(text).unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].0, 3);
        assert!(matches!(&steps[0].1, ScriptStep::Add { record } if record.username == "u"));
        assert_eq!(steps[1], (5, ScriptStep::RemoveAll));
    }

    #[test]
    fn parse_script_reports_line_of_bad_step() {
        let text = "{\"op\":\"remove_all\"}\n{\"op\":\"rename\"}\n";
        let err = parse_script(text).unwrap_err();
        assert!(err.to_string().contains("script line 2"), "{err}");
    }

    #[test]
    fn apply_step_reports_primary_errors() {
        let primary = MemoryPrimaryStore::new();
        let record: Record = serde_json::from_str(
            r#"{"origin":"https://a.example","formActionOrigin":"https://a.example","username":"u","password":"p"}"#,
        )
        .unwrap();

        apply_step(&primary, ScriptStep::Add { record: record.clone() }).unwrap();
        let err = apply_step(&primary, ScriptStep::Add { record: record.clone() }).unwrap_err();
        assert!(matches!(err, FerryError::DuplicateRecord { .. }));

        apply_step(&primary, ScriptStep::Remove { record: record.clone() }).unwrap();
        let err = apply_step(&primary, ScriptStep::Remove { record }).unwrap_err();
        assert!(matches!(err, FerryError::NotFound(_)));
    }
}
