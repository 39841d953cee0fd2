use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::process::Command;

#[rstest]
#[case("read")]
#[case("self-check")]
fn gauge_timeout_bubbles_to_cli(#[case] sub: &str) {
    let mut cmd = Command::cargo_bin("regulator").unwrap();
    cmd.env("REGULATOR_SIM_GAUGE_OFFLINE", "1").arg(sub);
    cmd.assert().code(3).stderr(predicate::str::contains(
        "What happened: A serial device did not answer",
    ));
}

#[rstest]
fn run_refuses_to_start_without_a_reading() {
    let dir = tempfile::tempdir().unwrap();
    let mut cmd = Command::cargo_bin("regulator").unwrap();
    cmd.current_dir(dir.path())
        .env("REGULATOR_SIM_GAUGE_OFFLINE", "1")
        .args(["run", "--pressure", "5", "--exponent", "8", "--duration-ms", "100"]);
    cmd.assert().code(3);
    assert!(!dir.path().join("sessions").exists());
}
