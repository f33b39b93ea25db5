// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests that drive the `ferry` binary against temp files.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use ferry_core::Record;
use ferry_test_utils::seeded_login;
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
    config: PathBuf,
}

impl Workspace {
    fn new(extra_toml: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("ferry.toml");
        let toml = format!(
            "[general]\nlog_level = \"warn\"\n\n[primary]\nsnapshot_path = {:?}\n\n[secondary]\ndatabase_path = {:?}\n\n{extra_toml}",
            dir.path().join("logins.json").display().to_string(),
            dir.path().join("secondary.db").display().to_string(),
        );
        fs::write(&config, toml).unwrap();
        Self { dir, config }
    }

    fn snapshot(&self) -> PathBuf {
        self.dir.path().join("logins.json")
    }

    fn seed(&self, records: &[Record]) {
        let snapshot = serde_json::json!({ "version": 1, "logins": records });
        fs::write(self.snapshot(), serde_json::to_vec_pretty(&snapshot).unwrap()).unwrap();
    }

    fn write_script(&self, lines: &[&str]) -> PathBuf {
        let path = self.dir.path().join("script.jsonl");
        fs::write(&path, lines.join("\n")).unwrap();
        path
    }

    fn ferry(&self, args: &[&str]) -> Output {
        run_ferry(&self.config, args)
    }
}

fn run_ferry(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ferry"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "ferry failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).unwrap()
}

fn status_json(ws: &Workspace) -> serde_json::Value {
    serde_json::from_str(&stdout(&ws.ferry(&["status", "--json"]))).unwrap()
}

#[test]
fn fingerprint_of_missing_snapshot_is_empty() {
    let ws = Workspace::new("");
    assert_eq!(stdout(&ws.ferry(&["fingerprint"])).trim(), "empty");
}

#[test]
fn migrate_then_status_reports_in_sync() {
    let ws = Workspace::new("");
    ws.seed(&[
        seeded_login("a", "https://a.example", "alice", 1_000),
        seeded_login("b", "https://b.example", "bob", 2_000),
    ]);

    let first = stdout(&ws.ferry(&["migrate"]));
    assert!(first.contains("migrated 2 records (0 skipped), diff 0"), "{first}");

    let status = status_json(&ws);
    assert_eq!(status["in_sync"], true);
    assert_eq!(status["secondary_records"], 2);
    assert_eq!(status["diff"], 0);
    assert_eq!(status["fingerprint"], status["checkpoint"]);

    let fingerprint = stdout(&ws.ferry(&["fingerprint"]));
    assert_eq!(status["fingerprint"], fingerprint.trim());

    let second = stdout(&ws.ferry(&["migrate"]));
    assert!(second.contains("secondary is up to date"), "{second}");
}

#[test]
fn mirror_script_reaches_secondary_and_snapshot() {
    let ws = Workspace::new("");
    ws.seed(&[seeded_login("a", "https://a.example", "alice", 1_000)]);
    let add = r#"{"op":"add","record":{"origin":"https://c.example","formActionOrigin":"https://c.example","username":"carol","password":"pw"}}"#;
    let script = ws.write_script(&[
        add,
        add,
        r#"{"op":"remove","record":{"id":"a","origin":"https://a.example","formActionOrigin":"https://a.example","username":"alice","password":"x"}}"#,
    ]);

    let out = stdout(&ws.ferry(&["mirror", script.to_str().unwrap()]));
    assert!(
        out.contains("3 steps (1 rejected by primary), 2 events mirrored, 0 failed, diff 0"),
        "{out}"
    );

    let status = status_json(&ws);
    assert_eq!(status["primary_records"], 1);
    assert_eq!(status["secondary_records"], 1);
    // The checkpoint still names the content migrated at activation.
    assert_eq!(status["in_sync"], false);

    let saved: serde_json::Value =
        serde_json::from_slice(&fs::read(ws.snapshot()).unwrap()).unwrap();
    assert_eq!(saved["logins"][0]["username"], "carol");
}

#[test]
fn mirror_disabled_by_config_only_changes_primary() {
    let ws = Workspace::new("[mirror]\nenabled = false\n");
    let script = ws.write_script(&[
        r#"{"op":"add","record":{"origin":"https://c.example","formActionOrigin":"https://c.example","username":"carol","password":"pw"}}"#,
    ]);

    let out = stdout(&ws.ferry(&["mirror", script.to_str().unwrap()]));
    assert!(out.contains("0 events mirrored"), "{out}");

    let status = status_json(&ws);
    assert_eq!(status["primary_records"], 1);
    assert_eq!(status["secondary_records"], 0);
}

#[test]
fn audit_lists_flagged_records() {
    let ws = Workspace::new("");
    ws.seed(&[
        seeded_login("ok", "https://a.example", "alice", 1_000),
        seeded_login("idn", "https://bücher.example", "dora", 2_000),
    ]);

    let out = stdout(&ws.ferry(&["audit"]));
    assert!(out.contains("idn\thttps://bücher.example"), "{out}");
    assert!(out.contains("origin:non_ascii_hostname"), "{out}");
    assert!(
        out.contains("1 of 2 records flagged, 1 would be rejected by the secondary"),
        "{out}"
    );
}

#[test]
fn render_on_exit_prints_prometheus_text() {
    let ws = Workspace::new("[metrics]\nprefix = \"e2e\"\nrender_on_exit = true\n");
    ws.seed(&[seeded_login("a", "https://a.example", "alice", 1_000)]);

    let out = stdout(&ws.ferry(&["migrate"]));
    assert!(out.contains("e2e_diff_saved_records"), "{out}");
}

#[test]
fn unknown_config_key_exits_with_failure() {
    let ws = Workspace::new("[mirror]\nbogus = 1\n");
    let output = ws.ferry(&["status"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn missing_config_file_exits_with_failure() {
    let dir = TempDir::new().unwrap();
    let output = run_ferry(&dir.path().join("absent.toml"), &["status"]);
    assert_eq!(output.status.code(), Some(1));
}
