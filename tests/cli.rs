use std::path::PathBuf;
use std::process::Command;

use serde_json::Value;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_neurovex_cli"))
}

fn fixture_file(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(name)
        .to_string_lossy()
        .into_owned()
}

fn json_lines(stdout: &[u8]) -> Vec<Value> {
    String::from_utf8(stdout.to_vec())
        .expect("stdout UTF-8")
        .lines()
        .map(|line| serde_json::from_str(line).expect("JSON line"))
        .collect()
}

#[test]
fn run_focus_profile_prints_events_and_summary() {
    let output = cli()
        .args(["run", "--profile", "focus", "--samples", "96", "--seed", "5"])
        .output()
        .expect("failed to run neurovex_cli run");
    assert!(
        output.status.success(),
        "CLI exited with {:?}",
        output.status.code()
    );

    let lines = json_lines(&output.stdout);
    assert_eq!(lines[0]["event"], "aggregate");
    assert_eq!(lines[1]["event"], "safety_verdict");
    assert_eq!(lines[2]["event"], "classification");

    let summary = lines.last().unwrap();
    assert_eq!(summary["event"], "summary");
    assert_eq!(summary["samples"], 96);
    assert_eq!(summary["final_state"], "Focus");
    assert_eq!(summary["actuation_permitted"], true);
}

#[test]
fn replay_summary_counts_skipped_lines() {
    let output = cli()
        .args([
            "replay",
            &fixture_file("with_invalid.jsonl"),
            "--summary-only",
        ])
        .output()
        .expect("failed to run neurovex_cli replay");
    assert!(output.status.success());

    let lines = json_lines(&output.stdout);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["samples"], 2);
    assert_eq!(lines[0]["rejected"], 3);
}

#[test]
fn replay_abort_on_invalid_fails() {
    let output = cli()
        .args([
            "replay",
            &fixture_file("with_invalid.jsonl"),
            "--abort-on-invalid",
        ])
        .output()
        .expect("failed to run neurovex_cli replay");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).expect("stderr UTF-8");
    assert!(stderr.contains("line 2"), "unexpected stderr: {stderr}");
}

#[test]
fn replay_recording_ends_unsafe() {
    let output = cli()
        .args([
            "replay",
            &fixture_file("focus_then_fatigue.jsonl"),
            "--summary-only",
        ])
        .output()
        .expect("failed to run neurovex_cli replay");
    assert!(output.status.success());

    let summary = &json_lines(&output.stdout)[0];
    assert_eq!(summary["final_state"], "Fatigue");
    assert_eq!(summary["last_verdict"]["reason"], "fatigue_detected");
    assert_eq!(summary["actuation_permitted"], false);
    assert!(summary["unsafe_verdicts"]["fatigue_detected"].as_u64().unwrap() >= 1);
}

#[test]
fn merged_flag_lists_active_reasons() {
    let output = cli()
        .args([
            "--merged",
            "--quality-threshold",
            "0.99",
            "replay",
            &fixture_file("focus_then_fatigue.jsonl"),
            "--summary-only",
        ])
        .output()
        .expect("failed to run neurovex_cli replay");
    assert!(output.status.success());

    let summary = &json_lines(&output.stdout)[0];
    assert_eq!(summary["last_verdict"]["reason"], "poor_signal");
    assert_eq!(
        summary["last_verdict"]["active"],
        serde_json::json!(["poor_signal", "fatigue_detected"])
    );
}

#[test]
fn config_command_prints_effective_config() {
    let output = cli()
        .args(["--quality-threshold", "0.6", "config"])
        .output()
        .expect("failed to run neurovex_cli config");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    let json: Value = serde_json::from_str(&stdout).expect("config JSON");
    let threshold = json["safety"]["quality_threshold"].as_f64().unwrap();
    assert!((threshold - 0.6).abs() < 1e-6);
    assert_eq!(json["aggregator"]["window_size"], 64);
}

#[test]
fn live_stream_emits_summary() {
    let output = cli()
        .args(["live", "--profile", "relax", "--duration-ms", "300", "--seed", "1"])
        .output()
        .expect("failed to run neurovex_cli live");
    assert!(output.status.success());

    let lines = json_lines(&output.stdout);
    let summary = lines.last().unwrap();
    assert_eq!(summary["event"], "summary");
    assert!(summary["stream"]["processed"].as_u64().unwrap() >= 1);
}

#[test]
fn nan_quality_threshold_is_ignored() {
    let output = cli()
        .args(["--quality-threshold", "NaN", "config"])
        .output()
        .expect("failed to run neurovex_cli config");
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).expect("config JSON");
    let threshold = json["safety"]["quality_threshold"].as_f64().unwrap();
    assert!((threshold - 0.45).abs() < 1e-6);
}
