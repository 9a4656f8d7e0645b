//! Integration tests for CLI behavior
//!
//! These drive the actual binary against a throwaway hark home, project
//! directory and user home, so nothing on the developer's machine is read or
//! written.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

struct Sandbox {
    _tmp: TempDir,
    hark_home: PathBuf,
    user_home: PathBuf,
    project: PathBuf,
}

impl Sandbox {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let hark_home = tmp.path().join("hark");
        let user_home = tmp.path().join("home");
        let project = tmp.path().join("project");
        fs::create_dir_all(&user_home).unwrap();
        fs::create_dir_all(project.join(".git")).unwrap();
        Self {
            _tmp: tmp,
            hark_home,
            user_home,
            project,
        }
    }

    fn hark(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_hark"))
            .args(args)
            .current_dir(&self.project)
            .env("HARK_HOME", &self.hark_home)
            .env("HOME", &self.user_home)
            .env_remove("HARK_API_KEY")
            .env_remove("RUST_LOG")
            .output()
            .expect("failed to run hark")
    }

    fn history_path(&self) -> PathBuf {
        self.hark_home.join("history.json")
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

// =============================================================================
// CLI parsing
// =============================================================================

#[test]
fn integration_help_flag() {
    let sandbox = Sandbox::new();
    let output = sandbox.hark(&["--help"]);

    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("hark"));
    assert!(out.contains("Usage"));
}

#[test]
fn integration_version_flag() {
    let sandbox = Sandbox::new();
    let output = sandbox.hark(&["--version"]);

    assert!(output.status.success());
    assert!(stdout(&output).contains(env!("CARGO_PKG_VERSION")));
}

// =============================================================================
// History
// =============================================================================

#[test]
fn integration_record_then_list() {
    let sandbox = Sandbox::new();

    assert!(sandbox.hark(&["record", "first question", "a1"]).status.success());
    assert!(sandbox.hark(&["record", "follow up", "a2"]).status.success());
    assert!(
        sandbox
            .hark(&["record", "another topic", "b1", "--new"])
            .status
            .success()
    );

    let output = sandbox.hark(&["history", "list"]);
    assert!(output.status.success());
    let out = stdout(&output);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("1. another topic (1 turns"));
    assert!(lines[1].starts_with("2. first question (2 turns"));

    let doc = read_json(&sandbox.history_path());
    assert_eq!(doc["version"], 2);
    assert_eq!(doc["conversations"][1]["messages"].as_array().unwrap().len(), 4);
}

#[test]
fn integration_show_and_delete() {
    let sandbox = Sandbox::new();
    sandbox.hark(&["record", "keep me", "ok"]);
    sandbox.hark(&["record", "drop me", "ok", "--new"]);

    let shown = sandbox.hark(&["history", "show", "2"]);
    assert!(shown.status.success());
    let conversation: serde_json::Value = serde_json::from_slice(&shown.stdout).unwrap();
    assert_eq!(conversation["summary"], "keep me");

    let deleted = sandbox.hark(&["history", "delete", "1"]);
    assert!(deleted.status.success());
    assert!(stdout(&deleted).contains("drop me"));

    let doc = read_json(&sandbox.history_path());
    assert_eq!(doc["conversations"].as_array().unwrap().len(), 1);
    assert_eq!(doc["conversations"][0]["summary"], "keep me");
}

#[test]
fn integration_delete_out_of_range_fails() {
    let sandbox = Sandbox::new();
    sandbox.hark(&["record", "only", "one"]);

    let output = sandbox.hark(&["history", "delete", "5"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("error:"));

    let doc = read_json(&sandbox.history_path());
    assert_eq!(doc["conversations"].as_array().unwrap().len(), 1);
}

#[test]
fn integration_clear_history() {
    let sandbox = Sandbox::new();
    sandbox.hark(&["record", "q", "a"]);

    assert!(sandbox.hark(&["history", "clear"]).status.success());
    assert!(stdout(&sandbox.hark(&["history", "list"])).is_empty());
}

#[test]
fn integration_legacy_history_is_migrated() {
    let sandbox = Sandbox::new();
    fs::create_dir_all(&sandbox.hark_home).unwrap();
    let legacy = r#"{"entries":[
        {"timestamp":"2024-02-01T10:00:00Z","prompt":"newer","response":"r2"},
        {"timestamp":"2024-01-01T10:00:00Z","prompt":"older","response":"r1"}
    ]}"#;
    fs::write(sandbox.history_path(), legacy).unwrap();

    let output = sandbox.hark(&["history", "list"]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.starts_with("1. newer"));
    assert!(out.contains("2. older"));

    let backup = sandbox.hark_home.join("history.json.v1.backup");
    assert_eq!(fs::read_to_string(backup).unwrap(), legacy);
    assert_eq!(read_json(&sandbox.history_path())["version"], 2);
}

// =============================================================================
// Config
// =============================================================================

#[test]
fn integration_config_set_get() {
    let sandbox = Sandbox::new();

    assert!(
        sandbox
            .hark(&["config", "set", "preprompt", "be brief"])
            .status
            .success()
    );
    let output = sandbox.hark(&["config", "get", "preprompt"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "be brief");

    let doc = read_json(&sandbox.hark_home.join("config.json"));
    assert_eq!(doc["preprompt"], "be brief");
}

#[test]
fn integration_config_get_missing_exits_nonzero() {
    let sandbox = Sandbox::new();
    let output = sandbox.hark(&["config", "get", "api_key"]);

    assert!(!output.status.success());
    assert!(stdout(&output).is_empty());
}

#[test]
fn integration_config_rejects_bad_values() {
    let sandbox = Sandbox::new();

    assert!(!sandbox.hark(&["config", "set", "colour", "red"]).status.success());
    assert!(
        !sandbox
            .hark(&["config", "set", "max_conversations", "lots"])
            .status
            .success()
    );
    assert!(!sandbox.hark(&["config", "scope", "team"]).status.success());
}

#[test]
fn integration_project_scope_switch() {
    let sandbox = Sandbox::new();
    sandbox.hark(&["config", "set", "api_key", "global-key"]);

    assert_eq!(stdout(&sandbox.hark(&["config", "scope"])).trim(), "global");
    assert!(sandbox.hark(&["config", "scope", "project"]).status.success());
    assert_eq!(stdout(&sandbox.hark(&["config", "scope"])).trim(), "project");

    // Project document has no key; falls through to the home fallback file only.
    assert!(!sandbox.hark(&["config", "get", "api_key"]).status.success());
    fs::write(sandbox.user_home.join(".hark_api_key"), "file-key\n").unwrap();
    assert_eq!(
        stdout(&sandbox.hark(&["config", "get", "api_key"])).trim(),
        "file-key"
    );

    sandbox.hark(&["config", "set", "api_key", "project-key"]);
    assert!(sandbox.project.join(".hark").join("config.json").exists());
    assert_eq!(
        stdout(&sandbox.hark(&["config", "get", "api_key"])).trim(),
        "project-key"
    );
}

#[test]
fn integration_env_key_wins() {
    let sandbox = Sandbox::new();
    sandbox.hark(&["config", "set", "api_key", "stored"]);

    let output = Command::new(env!("CARGO_BIN_EXE_hark"))
        .args(["config", "get", "api_key"])
        .current_dir(&sandbox.project)
        .env("HARK_HOME", &sandbox.hark_home)
        .env("HOME", &sandbox.user_home)
        .env("HARK_API_KEY", "from-env")
        .output()
        .expect("failed to run hark");
    assert_eq!(stdout(&output).trim(), "from-env");
}

#[test]
fn integration_config_path() {
    let sandbox = Sandbox::new();
    let out = stdout(&sandbox.hark(&["config", "path"]));

    assert!(out.contains("global: "));
    assert!(out.contains("project: "));
    assert!(out.contains(&sandbox.hark_home.join("config.json").display().to_string()));
}

// =============================================================================
// Logging
// =============================================================================

#[test]
fn integration_corrupt_files_are_reported() {
    let sandbox = Sandbox::new();
    fs::create_dir_all(&sandbox.hark_home).unwrap();
    fs::write(sandbox.hark_home.join("config.json"), "{ not json").unwrap();
    fs::write(sandbox.history_path(), "also not json").unwrap();

    let output = sandbox.hark(&["config", "scope"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "global");
    assert!(stderr(&output).contains("config is corrupt"));

    let output = sandbox.hark(&["history", "list"]);
    assert!(output.status.success());
    assert!(stderr(&output).contains("history at"));
    assert_eq!(
        fs::read_to_string(sandbox.history_path()).unwrap(),
        "also not json"
    );
}

#[test]
fn integration_debug_logging_from_flag_or_setting() {
    let sandbox = Sandbox::new();

    assert!(!stderr(&sandbox.hark(&["history", "list"])).contains("starting"));
    assert!(stderr(&sandbox.hark(&["history", "list", "--debug"])).contains("starting"));

    sandbox.hark(&["config", "set", "debug", "true"]);
    assert!(stderr(&sandbox.hark(&["history", "list"])).contains("starting"));
}

// =============================================================================
// Outbound window
// =============================================================================

#[test]
fn integration_window_prunes_turns() {
    let sandbox = Sandbox::new();
    sandbox.hark(&["config", "set", "max_conversation_turns", "2"]);
    sandbox.hark(&["config", "set", "preprompt", "house style"]);
    sandbox.hark(&["record", "q1", "a1"]);
    sandbox.hark(&["record", "q2", "a2"]);

    let output = sandbox.hark(&["window", "q3"]);
    assert!(output.status.success());
    let payload: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();

    assert_eq!(payload[0]["role"], "system");
    assert!(payload[0]["content"].as_str().unwrap().ends_with("house style"));
    let contents: Vec<&str> = payload[1..]
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, ["q2", "a2", "q3"]);
}

#[test]
fn integration_window_new_has_no_history() {
    let sandbox = Sandbox::new();
    sandbox.hark(&["record", "q1", "a1"]);

    let output = sandbox.hark(&["window", "fresh", "--new"]);
    let payload: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(payload.len(), 2);
    assert_eq!(payload[1]["content"], "fresh");
}
