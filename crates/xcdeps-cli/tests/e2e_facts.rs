//! E2E CLI tests driven by `--facts` input:
//! - exit codes (0, 2 with --fail-on-cycles, 3 config, 4 extraction, 1 missing root)
//! - output files: DOT, cycles.txt, JSON report, per-framework and cycle views
//! - reproducible output with --no-timestamp
//!
//! Each test runs `xcdeps` as a subprocess in an isolated temp directory.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

const APP_CORE: &str = r#"[
  {"source": "AppTarget", "destination": "UIKit.framework", "kind": "library",
   "path": "System/Library/Frameworks/UIKit.framework", "source_tree": "SDKROOT"},
  {"source": "AppTarget", "destination": "CoreModule", "kind": "target"},
  {"source": "CoreModule", "destination": "AppTarget", "kind": "target"}
]"#;

const CHAIN: &str = r#"[
  {"source": "App", "destination": "Core", "kind": "target"},
  {"source": "Core", "destination": "Net", "kind": "target"},
  {"source": "App", "destination": "Alamofire.framework", "kind": "library"},
  {"source": "Core", "destination": "Alamofire.framework", "kind": "library"},
  {"source": "App", "destination": "Lottie", "kind": "spm_product",
   "subtitle": "https://github.com/airbnb/lottie-ios"}
]"#;

/// Build a Command targeting the xcdeps binary, rooted in `dir`.
fn xcdeps_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("xcdeps"));
    cmd.current_dir(dir);
    cmd.env("XCDEPS_LOG", "error");
    cmd.env_remove("FORMAT");
    cmd
}

/// Write `facts` to `facts.json` in a fresh temp dir.
fn workspace(facts: &str) -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("facts.json"), facts).expect("write facts");
    dir
}

fn run_json(dir: &Path, extra: &[&str]) -> (i32, Value) {
    let output = xcdeps_cmd(dir)
        .args(["--facts", "facts.json", "--no-render", "--format", "json"])
        .args(extra)
        .output()
        .expect("xcdeps should not crash");
    let code = output.status.code().expect("exit code");
    let report = serde_json::from_slice(&output.stdout).unwrap_or(Value::Null);
    (code, report)
}

fn read(dir: &Path, name: &str) -> String {
    fs::read_to_string(dir.join(name)).unwrap_or_else(|e| panic!("reading {name}: {e}"))
}

// ---------------------------------------------------------------------------
// Exit codes
// ---------------------------------------------------------------------------

#[test]
fn cycle_with_fail_on_cycles_exits_2_after_writing_outputs() {
    let dir = workspace(APP_CORE);
    let (code, report) = run_json(
        dir.path(),
        &["--fail-on-cycles", "--json-out", "report.json"],
    );

    assert_eq!(code, 2);
    assert_eq!(report["exit_code"], 2);
    assert_eq!(report["has_cycles"], true);
    assert_eq!(report["summary"]["targets"], 2);
    assert_eq!(report["summary"]["libraries"], 1);
    assert_eq!(report["summary"]["edges"], 3);

    let cycles = read(dir.path(), "xcode_deps_graph.cycles.txt");
    assert_eq!(
        cycles,
        "HAS_CYCLES=true\nCYCLES_COUNT=1\nCYCLE_1=AppTarget,CoreModule\n"
    );

    let json: Value =
        serde_json::from_str(&read(dir.path(), "report.json")).expect("report.json is JSON");
    assert_eq!(json["has_cycles"], true);
    assert_eq!(json["cycles_count"], 1);
    assert_eq!(
        json["cycles"]["components"],
        serde_json::json!([["AppTarget", "CoreModule"]])
    );
    assert_eq!(json["nodes"]["libraries"][0]["is_system"], true);

    let dot = read(dir.path(), "xcode_deps_graph.dot");
    assert!(dot.starts_with("digraph XcodeDeps {"));
    assert!(dot.contains("Cycles: YES"));
}

#[test]
fn cycles_without_gate_exit_0() {
    let dir = workspace(APP_CORE);
    xcdeps_cmd(dir.path())
        .args(["--facts", "facts.json", "--no-render", "--format", "text"])
        .assert()
        .success()
        .stdout(predicate::str::contains("CYCLES: PRESENT (1)"))
        .stdout(predicate::str::contains("cycle 1: AppTarget,CoreModule"));
}

#[test]
fn acyclic_graph_passes_the_gate() {
    let dir = workspace(CHAIN);
    xcdeps_cmd(dir.path())
        .args([
            "--facts",
            "facts.json",
            "--no-render",
            "--fail-on-cycles",
            "--format",
            "text",
        ])
        .assert()
        .code(0)
        .stdout(predicate::str::starts_with("CYCLES: NONE"));
    assert_eq!(
        read(dir.path(), "xcode_deps_graph.cycles.txt"),
        "HAS_CYCLES=false\nCYCLES_COUNT=0\n"
    );
}

#[test]
fn invalid_regex_is_a_config_error() {
    let dir = workspace(CHAIN);
    xcdeps_cmd(dir.path())
        .args(["--facts", "facts.json", "--no-render", "--include-target", "(["])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("include-target"));
    assert!(!dir.path().join("xcode_deps_graph.dot").exists());
}

#[test]
fn invalid_color_is_a_config_error() {
    let dir = workspace(CHAIN);
    xcdeps_cmd(dir.path())
        .args(["--facts", "facts.json", "--color", "edge_cycle=red"])
        .assert()
        .code(3);
}

#[test]
fn config_file_with_no_view_is_rejected() {
    let dir = workspace(CHAIN);
    fs::write(
        dir.path().join(".xcdeps.toml"),
        "[views]\nfull_graph = false\n",
    )
    .expect("write config");
    xcdeps_cmd(dir.path())
        .args(["--facts", "facts.json", "--no-render"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("no output view selected"));
}

#[test]
fn malformed_config_file_is_a_config_error() {
    let dir = workspace(CHAIN);
    fs::write(dir.path().join("ci.toml"), "fail_on_cycles = maybe").expect("write config");
    xcdeps_cmd(dir.path())
        .args(["--facts", "facts.json", "--config", "ci.toml"])
        .assert()
        .code(3);
}

#[test]
fn unreadable_facts_are_an_extraction_error() {
    let dir = workspace("[{\"source\": \"App\"}]");
    xcdeps_cmd(dir.path())
        .args(["--facts", "facts.json", "--no-render"])
        .assert()
        .code(4);

    xcdeps_cmd(dir.path())
        .args(["--facts", "missing.json", "--no-render"])
        .assert()
        .code(4);
}

#[test]
fn missing_root_exits_1() {
    let dir = TempDir::new().expect("tempdir");
    xcdeps_cmd(dir.path())
        .args(["--path", "does/not/exist", "--no-render"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn unknown_flag_is_a_usage_error() {
    let dir = TempDir::new().expect("tempdir");
    xcdeps_cmd(dir.path()).arg("--bogus").assert().code(3);
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

#[test]
fn split_only_writes_framework_views_without_full_graph() {
    let dir = workspace(CHAIN);
    let (code, report) = run_json(
        dir.path(),
        &["--split-only", "--no-timestamp", "--output", "out/deps"],
    );
    assert_eq!(code, 0);
    assert!(!dir.path().join("out/deps.dot").exists());

    let alamofire = read(dir.path(), "out/deps_by_framework/Alamofire/Alamofire.dot");
    assert!(alamofire.starts_with("digraph FrameworkView {"));
    assert!(alamofire.contains("\"App\""));
    assert!(alamofire.contains("\"Core\""));
    assert!(dir
        .path()
        .join("out/deps_by_framework/Lottie/Lottie.dot")
        .exists());

    let outputs = report["outputs"].as_array().expect("outputs");
    assert_eq!(outputs.len(), 3);
}

#[test]
fn split_flat_with_cap_and_custom_dir() {
    let dir = workspace(CHAIN);
    let (code, _) = run_json(
        dir.path(),
        &[
            "--split-by-framework",
            "--split-flat",
            "--split-max",
            "1",
            "--split-dir",
            "views",
        ],
    );
    assert_eq!(code, 0);
    assert!(dir.path().join("views/Alamofire.dot").exists());
    assert!(!dir.path().join("views/Lottie.dot").exists());
    assert!(dir.path().join("xcode_deps_graph.dot").exists());
}

#[test]
fn only_cycles_writes_cycle_view() {
    let dir = workspace(APP_CORE);
    let (code, _) = run_json(dir.path(), &["--only-cycles"]);
    assert_eq!(code, 0);
    assert!(!dir.path().join("xcode_deps_graph.dot").exists());
    let cycles = read(dir.path(), "xcode_deps_graph.cycles-only.dot");
    assert!(cycles.starts_with("digraph XcodeCycles {"));
    assert!(cycles.contains("AppTarget"));
    assert!(!cycles.contains("UIKit"));
}

#[test]
fn filters_collapse_and_highlight_reach_the_report() {
    let dir = workspace(CHAIN);
    let (code, _) = run_json(
        dir.path(),
        &[
            "--exclude-suffix",
            "spm",
            "--highlight-lib",
            "Alamo",
            "--json-out",
            "report.json",
            "--no-timestamp",
        ],
    );
    assert_eq!(code, 0);
    let json: Value = serde_json::from_str(&read(dir.path(), "report.json")).expect("JSON");
    assert!(json.get("generated_at").is_none());
    assert_eq!(json["filters"]["exclude_suffix"], serde_json::json!(["spm"]));
    let libraries = json["nodes"]["libraries"].as_array().expect("libraries");
    assert_eq!(libraries.len(), 1);
    assert_eq!(libraries[0]["name"], "Alamofire");
    assert_eq!(libraries[0]["is_highlighted"], true);
}

#[test]
fn no_timestamp_output_is_reproducible() {
    let dir = workspace(CHAIN);
    let args = ["--no-timestamp", "--json-out", "report.json"];

    run_json(dir.path(), &args);
    let first_dot = read(dir.path(), "xcode_deps_graph.dot");
    let first_json = read(dir.path(), "report.json");

    run_json(dir.path(), &args);
    assert_eq!(read(dir.path(), "xcode_deps_graph.dot"), first_dot);
    assert_eq!(read(dir.path(), "report.json"), first_json);
    assert!(!first_dot.contains("Generated:"));
}

#[test]
fn timestamp_is_included_by_default() {
    let dir = workspace(CHAIN);
    run_json(dir.path(), &["--json-out", "report.json"]);
    assert!(read(dir.path(), "xcode_deps_graph.dot").contains("Generated: "));
    let json: Value = serde_json::from_str(&read(dir.path(), "report.json")).expect("JSON");
    assert!(json["generated_at"].is_string());
}
