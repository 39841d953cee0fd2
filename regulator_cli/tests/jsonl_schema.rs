use assert_cmd::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = format!(
        r#"
[control]
sample_time_s = 0.05
ramp_time_s = 0.25

[session]
log_dir = "{}"
"#,
        dir.path().join("sessions").display()
    );
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn last_json_line(stdout: &[u8]) -> serde_json::Value {
    let text = String::from_utf8_lossy(stdout);
    let line = text
        .lines()
        .rev()
        .find(|l| l.trim_start().starts_with('{'))
        .expect("a JSON line on stdout");
    serde_json::from_str(line).expect("valid JSON")
}

/// Validate the JSON summary of a successful run.
#[rstest]
fn json_run_summary_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("regulator").unwrap();
    cmd.arg("--json")
        .arg("--log-level")
        .arg("warn")
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--pressure", "1", "--exponent", "8", "--duration-ms", "250"]);
    let out = cmd.output().unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let v = last_json_line(&out.stdout);
    assert_eq!(v["setpoint"].as_f64(), Some(1e-8));
    assert!(v["last_pressure"].as_f64().is_some());
    assert!(v["applied"].as_u64().unwrap() >= 1);
    assert_eq!(v["skipped"].as_u64(), Some(0));
    assert_eq!(v["session_files"].as_array().map(Vec::len), Some(1));
    assert_eq!(v["interrupted"], false);
}

#[rstest]
fn json_read_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("regulator").unwrap();
    cmd.arg("--json").arg("--config").arg(&cfg).arg("read");
    let out = cmd.output().unwrap();
    assert!(out.status.success());
    let v = last_json_line(&out.stdout);
    assert!(v["pressure"].as_f64().unwrap() > 0.0);
    assert!(v["text"].as_str().unwrap().contains('E'));
}

#[rstest]
fn json_error_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("regulator").unwrap();
    cmd.arg("--json")
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--pressure", "abc", "--exponent", "8"]);
    let out = cmd.output().unwrap();
    assert_eq!(out.status.code(), Some(2));
    let v = last_json_line(&out.stdout);
    assert_eq!(v["reason"], "MalformedSetpoint");
    assert_eq!(v["exit_code"], 2);
    assert!(v["message"].as_str().unwrap().starts_with("What happened"));
}
