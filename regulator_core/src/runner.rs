//! Cooperative event loop around `ControlLoop`.
//!
//! One thread: drain the command inbox, fire due timers, sleep on the loop's
//! clock until the next deadline. Commands are picked up at least every
//! `IDLE_POLL`.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use regulator_traits::Transport;
use tracing::{info, warn};

use crate::command::{Command, Inbox};
use crate::control_loop::ControlLoop;
use crate::status::{LoopStats, TickOutcome};

/// Longest the loop sleeps without checking the inbox.
pub const IDLE_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub stats: LoopStats,
    /// Session logs written while running, in order.
    pub session_files: Vec<PathBuf>,
    /// Last tick outcome, if any tick ran.
    pub last_outcome: Option<TickOutcome>,
    /// True when the loop ended because of `Command::Shutdown`.
    pub shutdown_requested: bool,
}

fn finish_session<G: Transport, V: Transport>(ctl: &mut ControlLoop<G, V>, summary: &mut RunSummary) {
    match ctl.stop_session() {
        Ok(Some(path)) => summary.session_files.push(path),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "stop failed"),
    }
}

/// Apply one command. Returns false on `Shutdown`.
fn apply<G: Transport, V: Transport>(
    ctl: &mut ControlLoop<G, V>,
    cmd: Command,
    summary: &mut RunSummary,
) -> bool {
    match cmd {
        Command::Start(sp) => {
            if let Err(e) = ctl.start_session(sp) {
                warn!(error = %e, setpoint = sp, "start rejected");
            }
        }
        Command::Update(sp) => {
            if let Err(e) = ctl.update_setpoint(sp) {
                warn!(error = %e, setpoint = sp, "update rejected");
            }
        }
        Command::Stop => finish_session(ctl, summary),
        Command::Shutdown => {
            summary.shutdown_requested = true;
            return false;
        }
    }
    true
}

/// Run until `Shutdown` arrives or `deadline` passes, then stop any active
/// session so the valve is closed and the samples are flushed.
pub fn run_until<G: Transport, V: Transport>(
    ctl: &mut ControlLoop<G, V>,
    inbox: &Inbox,
    deadline: Option<Instant>,
) -> RunSummary {
    let mut summary = RunSummary::default();
    'outer: loop {
        for cmd in inbox.drain() {
            if !apply(ctl, cmd, &mut summary) {
                break 'outer;
            }
        }
        if deadline.is_some_and(|d| ctl.now() >= d) {
            break;
        }

        for outcome in ctl.poll() {
            summary.last_outcome = Some(outcome);
        }

        let mut wake = ctl.now() + IDLE_POLL;
        if let Some(next) = ctl.next_deadline() {
            wake = wake.min(next);
        }
        if let Some(d) = deadline {
            wake = wake.min(d);
        }
        ctl.sleep_until(wake);
    }

    if ctl.is_active() {
        finish_session(ctl, &mut summary);
    }
    summary.stats = ctl.stats();
    info!(
        applied = summary.stats.applied,
        held = summary.stats.held,
        skipped = summary.stats.skipped,
        sessions = summary.session_files.len(),
        "run loop finished"
    );
    summary
}
