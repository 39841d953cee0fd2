//! `From` implementations bridging `regulator_config` types to `regulator_core` types.

use crate::config::{ControlCfg, DisplayCfg, Timeouts, ValveCfg};
use crate::controller::{Gains, IntegralMode, RampPolicy};

// ── Policies ─────────────────────────────────────────────────────────────────

impl From<regulator_config::IntegralMode> for IntegralMode {
    fn from(m: regulator_config::IntegralMode) -> Self {
        match m {
            regulator_config::IntegralMode::Frozen => Self::Frozen,
            regulator_config::IntegralMode::Accumulating => Self::Accumulating,
        }
    }
}

impl From<regulator_config::RampPolicy> for RampPolicy {
    fn from(p: regulator_config::RampPolicy) -> Self {
        match p {
            regulator_config::RampPolicy::FreezeIncrement => Self::FreezeIncrement,
            regulator_config::RampPolicy::RecomputeIncrement => Self::RecomputeIncrement,
        }
    }
}

// ── ControlCfg ───────────────────────────────────────────────────────────────

impl From<&regulator_config::ControlCfg> for ControlCfg {
    fn from(c: &regulator_config::ControlCfg) -> Self {
        Self {
            gains: Gains {
                p: c.p,
                i: c.i,
                d: c.d,
            },
            sample_time_s: c.sample_time_s,
            ramp_time_s: c.ramp_time_s,
            convergence_bound: c.convergence_bound,
            integral_mode: c.integral_mode.into(),
            ramp_policy: c.ramp_policy.into(),
            hold_when_converged: c.hold_when_converged,
        }
    }
}

// ── ValveCfg ─────────────────────────────────────────────────────────────────

impl From<&regulator_config::ValveCfg> for ValveCfg {
    fn from(c: &regulator_config::ValveCfg) -> Self {
        Self {
            max_open: c.max_open,
            default_position: c.default_position,
        }
    }
}

// ── Timeouts ─────────────────────────────────────────────────────────────────

impl From<&regulator_config::Config> for Timeouts {
    fn from(c: &regulator_config::Config) -> Self {
        Self {
            gauge_ms: c.gauge.timeout_ms,
            valve_ack_ms: c.valve_port.ack_timeout_ms,
        }
    }
}

// ── DisplayCfg ───────────────────────────────────────────────────────────────

impl From<&regulator_config::DisplayCfg> for DisplayCfg {
    fn from(c: &regulator_config::DisplayCfg) -> Self {
        Self {
            refresh_ms: c.refresh_ms,
        }
    }
}
