use assert_cmd::prelude::*;
use rstest::rstest;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[sensor]
sample_rate_hz = 100

[haptics]
motors = [
    { zone = "upper_arm", pin = 25 },
    { zone = "lower_arm", pin = 26 },
    { zone = "wrist", pin = 27 },
]
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn swish_json(cfg: &Path) -> Command {
    let mut cmd = Command::cargo_bin("swish").unwrap();
    cmd.arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(cfg);
    cmd
}

fn json_lines(bytes: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(bytes)
        .lines()
        .filter(|l| l.starts_with('{'))
        .map(|l| serde_json::from_str(l).expect("valid JSON"))
        .collect()
}

fn calibrate(cfg: &Path, out: &Path) {
    swish_json(cfg)
        .arg("calibrate")
        .arg("--out")
        .arg(out)
        .assert()
        .success();
}

fn is_number(v: &Value) -> bool {
    v.as_f64().is_some()
}

/// Every scored shot is one JSON object with the assessment, the cue and
/// the running summary.
#[rstest]
fn scored_event_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let baseline = dir.path().join("baseline.toml");
    calibrate(&cfg, &baseline);

    let out = swish_json(&cfg)
        .arg("train")
        .arg("--baseline")
        .arg(&baseline)
        .arg("--shots")
        .arg("2")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let lines = json_lines(&out);

    let scored: Vec<&Value> = lines.iter().filter(|v| v["event"] == "scored").collect();
    assert_eq!(scored.len(), 2, "stdout was: {lines:?}");
    let v = scored[0];

    let score = v["form_score"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&score));
    let dim = v["dimension"].as_str().unwrap();
    assert!(["elbow", "wrist", "timing", "trajectory", "none"].contains(&dim));
    for key in ["elbow", "wrist", "timing", "trajectory"] {
        assert!(is_number(&v["components"][key]), "{key} should be a number");
    }
    assert!(v["cue"]["zone"].is_string());
    assert!(v["cue"]["pattern"].is_string());
    assert!(v["cue"]["delivered"].as_bool().unwrap());
    assert!(v["shot"]["duration_ms"].as_u64().is_some());
    assert!(is_number(&v["shot"]["form_score"]));
    assert_eq!(v["summary"]["kind"], "summary");

    let session = lines.iter().find(|v| v["event"] == "session").unwrap();
    assert_eq!(session["stop"], "shot_budget");
    assert_eq!(session["summary"]["total_shots"], 2);
}

/// The shot log gets a baseline record during calibration and a shot plus a
/// summary per scored shot during training.
#[rstest]
fn shot_log_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let baseline = dir.path().join("baseline.toml");
    let log = dir.path().join("shots.jsonl");

    swish_json(&cfg)
        .arg("--shot-log")
        .arg(&log)
        .arg("calibrate")
        .arg("--out")
        .arg(&baseline)
        .assert()
        .success();
    swish_json(&cfg)
        .arg("--shot-log")
        .arg(&log)
        .arg("train")
        .arg("--baseline")
        .arg(&baseline)
        .arg("--shots")
        .arg("1")
        .assert()
        .success();

    let lines = json_lines(fs::read(&log).unwrap().as_slice());
    let count = |kind: &str| lines.iter().filter(|v| v["kind"] == kind).count();
    assert_eq!(count("calibration"), 1);
    assert_eq!(count("shot"), 11);
    assert_eq!(count("summary"), 1);

    for v in &lines {
        assert!(v["timestamp"].as_i64().is_some());
    }
    let cal = lines.iter().find(|v| v["kind"] == "calibration").unwrap();
    assert_eq!(cal["valid"], true);
    assert_eq!(cal["sample_count"], 10);
    assert_eq!(cal["trajectory_points"], 50);

    // calibration shots are unscored, the training shot carries its score
    let shots: Vec<&Value> = lines.iter().filter(|v| v["kind"] == "shot").collect();
    assert!(shots[..10].iter().all(|v| v["form_score"].is_null()));
    assert!(is_number(&shots[10]["form_score"]));
}

/// Failures in JSON mode are one object with a stable reason name.
#[rstest]
fn error_schema_without_baseline() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let out = swish_json(&cfg)
        .arg("train")
        .assert()
        .code(3)
        .get_output()
        .stdout
        .clone();
    let lines = json_lines(&out);
    let err = lines.iter().find(|v| v.get("reason").is_some()).unwrap();
    assert_eq!(err["reason"], "NotCalibrated");
    assert!(err["message"].as_str().unwrap().starts_with("What happened:"));
}
