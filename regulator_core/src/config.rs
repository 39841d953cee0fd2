//! Configuration types for the control loop.
//!
//! These are the runtime configuration structs used by `ControlLoop`.
//! They are separate from the TOML-deserialized config in `regulator_config`.

use std::time::Duration;

use crate::controller::{Gains, IntegralMode, RampPolicy};

/// Control law and cadence.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlCfg {
    pub gains: Gains,
    /// Seconds between control ticks.
    pub sample_time_s: f64,
    /// Seconds over which a new setpoint is approached.
    pub ramp_time_s: f64,
    /// Fractional tolerance for "at setpoint". Default: 0.05.
    pub convergence_bound: f64,
    pub integral_mode: IntegralMode,
    pub ramp_policy: RampPolicy,
    /// Skip valve moves on ticks where the pressure is already converged.
    pub hold_when_converged: bool,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            gains: Gains::default(),
            sample_time_s: 2.0,
            ramp_time_s: 75.0,
            convergence_bound: 0.05,
            integral_mode: IntegralMode::Frozen,
            ramp_policy: RampPolicy::FreezeIncrement,
            hold_when_converged: false,
        }
    }
}

/// Valve limits.
#[derive(Debug, Clone, PartialEq)]
pub struct ValveCfg {
    /// Requests at or above this opening are refused.
    pub max_open: f64,
    /// Opening applied when a session starts with the valve closed.
    pub default_position: f64,
}

impl Default for ValveCfg {
    fn default() -> Self {
        Self {
            max_open: 65.0,
            default_position: 46.0,
        }
    }
}

/// Serial wait budgets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeouts {
    /// Max wait for a gauge reply.
    pub gauge_ms: u64,
    /// Max wait for an optional valve acknowledgement.
    pub valve_ack_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            gauge_ms: 500,
            valve_ack_ms: 300,
        }
    }
}

impl Timeouts {
    /// Longest any single serial round trip may wait.
    pub const MAX_MS: u64 = 3000;

    pub fn gauge(&self) -> Duration {
        Duration::from_millis(self.gauge_ms)
    }

    pub fn valve_ack(&self) -> Duration {
        Duration::from_millis(self.valve_ack_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayCfg {
    pub refresh_ms: u64,
}

impl Default for DisplayCfg {
    fn default() -> Self {
        Self { refresh_ms: 500 }
    }
}
