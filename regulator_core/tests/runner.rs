use std::time::Duration;

use regulator_core::{ControlLoop, ControlCfg, CsvSessionWriter, DisplayCfg, channel, run_until};
use regulator_hardware::SimulatedChamber;
use regulator_traits::{Clock, ManualClock};

fn sim_loop(
    chamber: &SimulatedChamber,
    clock: &ManualClock,
    dir: &std::path::Path,
) -> ControlLoop<regulator_hardware::SimulatedGauge, regulator_hardware::SimulatedValve> {
    ControlLoop::builder()
        .with_gauge(chamber.gauge())
        .with_valve(chamber.valve())
        .with_control(ControlCfg {
            sample_time_s: 2.0,
            ramp_time_s: 10.0,
            ..ControlCfg::default()
        })
        .with_display(DisplayCfg { refresh_ms: 500 })
        .with_clock(Box::new(clock.clone()))
        .with_sink(Box::new(CsvSessionWriter::new(dir)))
        .build()
        .unwrap()
}

#[test]
fn runs_session_until_deadline_then_closes_valve() {
    let dir = tempfile::tempdir().unwrap();
    let chamber = SimulatedChamber::new();
    let clock = ManualClock::new();
    let mut ctl = sim_loop(&chamber, &clock, dir.path());
    let (handle, inbox) = channel();

    handle.start(1.0e-8).unwrap();
    let deadline = clock.now() + Duration::from_secs(20);
    let summary = run_until(&mut ctl, &inbox, Some(deadline));

    assert!(!summary.shutdown_requested);
    assert!(
        (8..=10).contains(&summary.stats.applied),
        "applied {}",
        summary.stats.applied
    );
    assert_eq!(summary.stats.skipped, 0);
    assert!(summary.stats.display_refreshes >= 30);
    assert_eq!(summary.session_files.len(), 1);
    assert!(summary.session_files[0].exists());
    assert!(!ctl.is_active());
    assert_eq!(chamber.valve_position(), 0.0);
    assert!(clock.elapsed() >= Duration::from_secs(20));
}

#[test]
fn shutdown_command_ends_loop_and_session() {
    let dir = tempfile::tempdir().unwrap();
    let chamber = SimulatedChamber::new();
    let clock = ManualClock::new();
    let mut ctl = sim_loop(&chamber, &clock, dir.path());
    let (handle, inbox) = channel();

    handle.start(1.0e-8).unwrap();
    handle.shutdown().unwrap();
    let summary = run_until(&mut ctl, &inbox, None);

    assert!(summary.shutdown_requested);
    assert_eq!(summary.stats.applied, 0);
    assert_eq!(summary.session_files.len(), 1);
    assert!(!ctl.is_active());
    assert_eq!(chamber.valve_position(), 0.0);
}

#[test]
fn stop_then_restart_gives_two_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let chamber = SimulatedChamber::new();
    let clock = ManualClock::new();
    let mut ctl = sim_loop(&chamber, &clock, dir.path());
    let (handle, inbox) = channel();

    handle.start(1.0e-8).unwrap();
    run_until(&mut ctl, &inbox, Some(clock.now() + Duration::from_secs(5)));
    // run_until closed the first session at its deadline
    assert!(!ctl.is_active());

    handle.start(1.5e-8).unwrap();
    handle.update(2.0e-8).unwrap();
    let summary = run_until(&mut ctl, &inbox, Some(clock.now() + Duration::from_secs(5)));
    assert_eq!(summary.session_files.len(), 1);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
}
