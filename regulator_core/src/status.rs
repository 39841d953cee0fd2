//! Outcome of one control tick.

use crate::error::{RegulatorError, ValveError};

#[derive(Debug, Clone, PartialEq)]
pub enum HoldReason {
    /// The computed opening was refused by the valve driver.
    OutOfRange(ValveError),
    /// Pressure is within the convergence bound and holding is enabled.
    Converged,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// No session active; nothing was done.
    Idle,
    /// A new opening was sent to the valve.
    Applied {
        pressure: f64,
        target: f64,
        percent_change: f64,
        position: f64,
    },
    /// The valve was left where it was.
    Held {
        pressure: f64,
        target: f64,
        reason: HoldReason,
    },
    /// The tick was abandoned; controller and valve state are unchanged.
    Skipped(RegulatorError),
}

/// Running counters for one control loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub applied: u64,
    pub held: u64,
    pub skipped: u64,
    pub display_refreshes: u64,
    pub display_errors: u64,
}

impl LoopStats {
    pub fn record(&mut self, outcome: &TickOutcome) {
        match outcome {
            TickOutcome::Idle => {}
            TickOutcome::Applied { .. } => self.applied += 1,
            TickOutcome::Held { .. } => self.held += 1,
            TickOutcome::Skipped(_) => self.skipped += 1,
        }
    }
}
