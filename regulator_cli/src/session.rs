//! Command implementations: assemble the control loop and drive it.

use std::time::Duration;

use eyre::WrapErr;
use regulator_core::{
    ControlLoop, CsvSessionWriter, RegulatorError, RunSummary, channel, run_until, sci,
};
use regulator_traits::Transport;
use serde_json::json;

use crate::devices;

type Loop = ControlLoop<Box<dyn Transport>, Box<dyn Transport>>;

fn assemble(cfg: &regulator_config::Config) -> eyre::Result<Loop> {
    let (gauge, valve) = devices::open(cfg)?;
    ControlLoop::builder()
        .with_config(cfg)
        .with_gauge(gauge)
        .with_valve(valve)
        .with_sink(Box::new(CsvSessionWriter::new(&cfg.session.log_dir)))
        .build()
}

/// Parse the operator setpoint `<whole>E-<digits>`.
pub fn setpoint(whole: &str, exponent: &str) -> eyre::Result<f64> {
    sci::parse_operator_setpoint(whole, exponent)
        .map_err(|e| eyre::Report::new(RegulatorError::from(e)))
}

pub fn run(
    cfg: &regulator_config::Config,
    whole: &str,
    exponent: &str,
    duration_ms: Option<u64>,
    json_out: bool,
) -> eyre::Result<()> {
    let sp = setpoint(whole, exponent)?;
    let mut ctl = assemble(cfg)?;
    let (handle, inbox) = channel();

    let ctrlc_handle = handle.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        let _ = ctrlc_handle.shutdown();
    }) {
        tracing::warn!(error = %e, "failed to install Ctrl-C handler");
    }

    // Start here rather than through the inbox so a failed start is fatal.
    ctl.start_session(sp).map_err(eyre::Report::new)?;
    tracing::info!(setpoint = %sci::render(sp), duration_ms, "regulating");

    let deadline = duration_ms.map(|ms| ctl.now() + Duration::from_millis(ms));
    let summary = run_until(&mut ctl, &inbox, deadline);
    drop(handle);
    report(&summary, sp, ctl.current_pressure(), json_out);
    Ok(())
}

fn report(summary: &RunSummary, sp: f64, last_pressure: Option<f64>, json_out: bool) {
    let files: Vec<String> = summary
        .session_files
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    if json_out {
        let obj = json!({
            "setpoint": sp,
            "last_pressure": last_pressure,
            "applied": summary.stats.applied,
            "held": summary.stats.held,
            "skipped": summary.stats.skipped,
            "session_files": files,
            "interrupted": summary.shutdown_requested,
        });
        println!("{obj}");
    } else {
        println!(
            "session complete: setpoint {}, last pressure {}, {} applied / {} held / {} skipped",
            sci::render(sp),
            last_pressure.map_or_else(|| "n/a".to_string(), sci::render),
            summary.stats.applied,
            summary.stats.held,
            summary.stats.skipped
        );
        for f in &files {
            println!("session log: {f}");
        }
    }
}

pub fn read(cfg: &regulator_config::Config, json_out: bool) -> eyre::Result<()> {
    let mut ctl = assemble(cfg)?;
    let p = ctl
        .read_pressure()
        .map_err(|e| eyre::Report::new(RegulatorError::from(e)))?;
    if json_out {
        println!("{}", json!({ "pressure": p, "text": sci::render(p) }));
    } else {
        println!("{}", sci::render(p));
    }
    Ok(())
}

pub fn close(cfg: &regulator_config::Config, json_out: bool) -> eyre::Result<()> {
    let mut ctl = assemble(cfg)?;
    ctl.close_valve().map_err(eyre::Report::new)?;
    if json_out {
        println!("{}", json!({ "valve": "closed" }));
    } else {
        println!("valve closed");
    }
    Ok(())
}

pub fn self_check(cfg: &regulator_config::Config, json_out: bool) -> eyre::Result<()> {
    let mut ctl = assemble(cfg)?;
    let p = ctl
        .read_pressure()
        .map_err(|e| eyre::Report::new(RegulatorError::from(e)))
        .wrap_err("gauge check")?;
    ctl.close_valve()
        .map_err(eyre::Report::new)
        .wrap_err("valve check")?;
    if json_out {
        println!("{}", json!({ "ok": true, "pressure": p }));
    } else {
        println!("ok: gauge reads {}, valve accepts commands", sci::render(p));
    }
    Ok(())
}
