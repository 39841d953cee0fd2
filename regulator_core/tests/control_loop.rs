use regulator_core::mocks::FakeTransport;
use regulator_core::session_log::read_session_csv;
use regulator_core::{
    ControlCfg, ControlLoop, ControllerError, CsvSessionWriter, HoldReason, LinkError, Phase,
    RegulatorError, TickOutcome, ValveCfg,
};
use regulator_core::DisplayCfg;
use regulator_traits::ManualClock;
use std::time::Duration;

struct Rig {
    gauge: FakeTransport,
    valve: FakeTransport,
    ctl: ControlLoop<FakeTransport, FakeTransport>,
}

fn rig_with(control: ControlCfg, valve_cfg: ValveCfg) -> Rig {
    let gauge = FakeTransport::new();
    let valve = FakeTransport::new();
    let ctl = ControlLoop::builder()
        .with_gauge(gauge.clone())
        .with_valve(valve.clone())
        .with_control(control)
        .with_valve_cfg(valve_cfg)
        .with_clock(Box::new(ManualClock::new()))
        .build()
        .expect("valid config");
    Rig { gauge, valve, ctl }
}

fn five_step() -> ControlCfg {
    ControlCfg {
        sample_time_s: 2.0,
        ramp_time_s: 10.0,
        ..ControlCfg::default()
    }
}

fn rig() -> Rig {
    rig_with(five_step(), ValveCfg::default())
}

fn started_rig() -> Rig {
    let mut r = rig();
    r.gauge.push_reading(10.0);
    r.ctl.start_session(50.0).expect("start");
    r
}

#[test]
fn start_opens_closed_valve_to_default() {
    let r = started_rig();
    assert!(r.ctl.is_active());
    assert_eq!(r.ctl.current_pressure(), Some(10.0));
    assert_eq!(r.ctl.current_valve_position(), 46.0);
    assert_eq!(r.ctl.target(), Some(18.0));
    assert_eq!(r.valve.written_text(), vec!["R:0046000\r\n".to_string()]);
}

#[test]
fn tick_applies_adjusted_position() {
    let mut r = started_rig();
    r.gauge.push_reading(10.0);
    let outcome = r.ctl.tick();
    let pc: f64 = (18.0 - 14.0) / 18.0;
    // positions are kept at the valve's thousandths resolution
    let expected = (46.0 * (1.0 + pc / 100.0) * 1000.0).round() / 1000.0;
    match outcome {
        TickOutcome::Applied {
            pressure,
            target,
            percent_change,
            position,
        } => {
            assert_eq!(pressure, 10.0);
            assert_eq!(target, 18.0);
            assert_eq!(percent_change, pc);
            assert_eq!(position, expected);
        }
        other => panic!("expected Applied, got {other:?}"),
    }
    assert_eq!(r.valve.written_text().last().unwrap(), "R:0046102\r\n");
    assert_eq!(r.ctl.samples().len(), 1);
    assert_eq!(r.ctl.samples()[0].valve_position, expected);
}

#[test]
fn five_ticks_reach_final_setpoint() {
    let mut r = started_rig();
    let mut targets = Vec::new();
    for _ in 0..5 {
        r.gauge.push_reading(10.0);
        assert!(matches!(r.ctl.tick(), TickOutcome::Applied { .. }));
        targets.push(r.ctl.target().unwrap());
    }
    assert_eq!(targets, vec![18.0, 26.0, 34.0, 42.0, 50.0]);
    assert_eq!(r.ctl.phase(), Phase::Holding);
}

#[test]
fn gauge_timeout_skips_tick_without_touching_state() {
    let mut reference = started_rig();
    let mut flaky = started_rig();

    reference.gauge.push_reading(10.0);
    reference.ctl.tick();
    flaky.gauge.push_reading(10.0);
    flaky.ctl.tick();

    let before = flaky.ctl.controller().state().cloned();
    let position_before = flaky.ctl.current_valve_position();
    let writes_before = flaky.valve.writes().len();
    flaky.gauge.push_timeout();
    assert_eq!(
        flaky.ctl.tick(),
        TickOutcome::Skipped(RegulatorError::Link(LinkError::Timeout))
    );
    assert_eq!(flaky.ctl.controller().state().cloned(), before);
    assert_eq!(flaky.ctl.current_valve_position(), position_before);
    assert_eq!(flaky.valve.writes().len(), writes_before);

    // The next good tick matches a run that never failed
    for rig in [&mut reference, &mut flaky] {
        rig.gauge.push_reading(10.0);
        rig.ctl.tick();
    }
    assert_eq!(
        flaky.ctl.controller().state(),
        reference.ctl.controller().state()
    );
    assert_eq!(
        flaky.ctl.current_valve_position(),
        reference.ctl.current_valve_position()
    );
    assert_eq!(flaky.ctl.stats().skipped, 1);
}

#[test]
fn garbled_gauge_text_is_a_protocol_error() {
    let mut r = started_rig();
    r.gauge.push_line(">  OVERRANGE");
    assert!(matches!(
        r.ctl.tick(),
        TickOutcome::Skipped(RegulatorError::Link(LinkError::Protocol(_)))
    ));
}

#[test]
fn failed_valve_write_rolls_back() {
    let mut r = started_rig();
    let before = r.ctl.controller().state().cloned();
    r.gauge.push_reading(10.0);
    r.valve.fail_next_writes(1);
    assert!(matches!(
        r.ctl.tick(),
        TickOutcome::Skipped(RegulatorError::Link(LinkError::Io(_)))
    ));
    assert_eq!(r.ctl.controller().state().cloned(), before);
    assert_eq!(r.ctl.current_valve_position(), 46.0);
    assert!(r.ctl.samples().is_empty());
}

#[test]
fn out_of_range_holds_valve() {
    let mut r = rig_with(
        five_step(),
        ValveCfg {
            max_open: 46.05,
            default_position: 46.0,
        },
    );
    r.gauge.push_reading(10.0);
    r.ctl.start_session(50.0).unwrap();
    r.gauge.push_reading(10.0);
    match r.ctl.tick() {
        TickOutcome::Held {
            reason: HoldReason::OutOfRange(_),
            ..
        } => {}
        other => panic!("expected OutOfRange hold, got {other:?}"),
    }
    assert_eq!(r.ctl.current_valve_position(), 46.0);
    assert_eq!(r.valve.writes().len(), 1);
}

#[test]
fn converged_tick_holds_when_enabled() {
    let mut r = rig_with(
        ControlCfg {
            hold_when_converged: true,
            ..five_step()
        },
        ValveCfg::default(),
    );
    r.gauge.push_reading(49.0);
    r.ctl.start_session(50.0).unwrap();
    r.gauge.push_reading(49.0);
    let step_before = r.ctl.controller().state().map(|s| s.step_count);
    assert!(matches!(
        r.ctl.tick(),
        TickOutcome::Held {
            reason: HoldReason::Converged,
            ..
        }
    ));
    assert!(r.ctl.is_converged());
    assert_eq!(r.ctl.controller().state().map(|s| s.step_count), step_before);
    assert_eq!(r.valve.writes().len(), 1);
    assert_eq!(r.ctl.samples().len(), 1);
}

#[test]
fn converged_tick_still_adjusts_by_default() {
    let mut r = started_rig();
    r.gauge.push_reading(49.0);
    assert!(matches!(r.ctl.tick(), TickOutcome::Applied { .. }));
    assert!(r.ctl.is_converged());
}

#[test]
fn start_while_active_updates_in_place() {
    let mut r = started_rig();
    r.gauge.push_reading(10.0);
    r.ctl.tick();
    let step = r.ctl.controller().state().map(|s| s.step_count);
    r.ctl.start_session(80.0).unwrap();
    assert_eq!(r.ctl.final_setpoint(), Some(80.0));
    assert_eq!(r.ctl.controller().state().map(|s| s.step_count), step);
    // no extra gauge read or valve open
    assert_eq!(r.valve.writes().len(), 2);
}

#[test]
fn start_without_any_reading_fails_cleanly() {
    let mut r = rig();
    r.gauge.push_timeout();
    assert_eq!(
        r.ctl.start_session(50.0),
        Err(RegulatorError::Link(LinkError::Timeout))
    );
    assert!(!r.ctl.is_active());
    assert_eq!(r.ctl.phase(), Phase::Idle);
    assert!(r.valve.writes().is_empty());
}

#[test]
fn start_falls_back_to_last_reading() {
    let mut r = rig();
    r.gauge.push_reading(10.0);
    r.ctl.refresh_display().unwrap();
    r.gauge.push_timeout();
    r.ctl.start_session(50.0).unwrap();
    assert_eq!(r.ctl.target(), Some(18.0));
}

#[test]
fn failed_valve_open_aborts_start() {
    let mut r = rig();
    r.gauge.push_reading(10.0);
    r.valve.fail_next_writes(1);
    assert!(matches!(
        r.ctl.start_session(50.0),
        Err(RegulatorError::Link(LinkError::Io(_)))
    ));
    assert!(!r.ctl.is_active());
    assert_eq!(r.ctl.current_valve_position(), 0.0);
    assert_eq!(r.ctl.phase(), Phase::Idle);
}

#[test]
fn invalid_setpoint_is_rejected() {
    let mut r = rig();
    assert_eq!(
        r.ctl.start_session(-1.0),
        Err(RegulatorError::Controller(ControllerError::InvalidSetpoint(
            -1.0
        )))
    );
    assert_eq!(r.gauge.clears(), 0);
}

#[test]
fn update_and_stop_need_a_session() {
    let mut r = rig();
    let no_session = RegulatorError::Controller(ControllerError::NoActiveSession);
    assert_eq!(r.ctl.update_setpoint(5.0), Err(no_session.clone()));
    assert_eq!(r.ctl.stop_session(), Err(no_session));
    assert_eq!(r.ctl.tick(), TickOutcome::Idle);
}

#[test]
fn stop_closes_valve_and_writes_csv() {
    let dir = tempfile::tempdir().unwrap();
    let gauge = FakeTransport::new();
    let valve = FakeTransport::new();
    let mut ctl = ControlLoop::builder()
        .with_gauge(gauge.clone())
        .with_valve(valve.clone())
        .with_control(five_step())
        .with_clock(Box::new(ManualClock::new()))
        .with_sink(Box::new(CsvSessionWriter::new(dir.path())))
        .build()
        .unwrap();

    gauge.push_reading(10.0);
    ctl.start_session(50.0).unwrap();
    for p in [10.0, 12.0, 15.0] {
        gauge.push_reading(p);
        ctl.tick();
    }
    let path = ctl.stop_session().unwrap().expect("csv path");
    assert!(!ctl.is_active());
    assert_eq!(ctl.current_valve_position(), 0.0);
    assert_eq!(valve.written_text().last().unwrap(), "C:\r\n");
    assert_eq!(ctl.phase(), Phase::Idle);

    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("session_") && name.ends_with(".csv"), "{name}");
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("timestamp,pressure,valve_position\n"));
    let rows = read_session_csv(&path).unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(
        rows.iter().map(|s| s.pressure).collect::<Vec<_>>(),
        vec![10.0, 12.0, 15.0]
    );
}

#[test]
fn failed_close_keeps_position_but_ends_session() {
    let mut r = started_rig();
    r.valve.fail_next_writes(1);
    assert!(matches!(
        r.ctl.stop_session(),
        Err(RegulatorError::Link(LinkError::Io(_)))
    ));
    assert!(!r.ctl.is_active());
    assert_eq!(r.ctl.current_valve_position(), 46.0);
}

#[test]
fn valve_ack_line_is_accepted() {
    let mut r = rig();
    r.gauge.push_reading(10.0);
    r.valve.push_line("OK");
    r.ctl.start_session(50.0).unwrap();
    assert_eq!(r.valve.pending_replies(), 0);
}

#[test]
fn first_tick_waits_one_sample_time() {
    let gauge = FakeTransport::new();
    let valve = FakeTransport::new();
    let clock = ManualClock::new();
    let mut ctl = ControlLoop::builder()
        .with_gauge(gauge.clone())
        .with_valve(valve.clone())
        .with_control(five_step())
        .with_display(DisplayCfg { refresh_ms: 60_000 })
        .with_clock(Box::new(clock.clone()))
        .build()
        .unwrap();

    gauge.push_reading(10.0);
    ctl.start_session(50.0).unwrap();
    // only the default opening went out
    assert_eq!(valve.writes().len(), 1);
    assert!(ctl.poll().is_empty());

    clock.advance(Duration::from_millis(1999));
    assert!(ctl.poll().is_empty());
    assert_eq!(valve.writes().len(), 1);

    clock.advance(Duration::from_millis(1));
    gauge.push_reading(10.0);
    let outcomes = ctl.poll();
    assert_eq!(outcomes.len(), 1);
    assert!(matches!(outcomes[0], TickOutcome::Applied { .. }));
    assert_eq!(valve.writes().len(), 2);
}
