//! Ramped PID-style control law.
//!
//! The controller never jumps straight to a new setpoint. `start` splits the
//! distance between the current pressure and the final setpoint into
//! `ramp_increments` equal steps and every tick moves the effective target one
//! step further, until it is pinned to the final setpoint (holding).
//!
//! Each tick yields a *fractional* adjustment, `(target - predicted) / target`,
//! which the control loop turns into a new valve opening.

use crate::config::ControlCfg;
use crate::error::ControllerError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gains {
    pub p: f64,
    pub i: f64,
    pub d: f64,
}

impl Default for Gains {
    fn default() -> Self {
        Self {
            p: 0.5,
            i: 0.05,
            d: 0.0,
        }
    }
}

/// Which accumulator feeds the integral term.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IntegralMode {
    /// Reads `error_sum`, which is never updated; the I term is always zero.
    /// Matches the behavior of the bench controller this replaces.
    #[default]
    Frozen,
    /// Reads `error_integral`, the running `sum(error * sample_time)`.
    Accumulating,
}

/// What a mid-session setpoint change does to the ramp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RampPolicy {
    /// Only the final setpoint moves; the step size stays as computed at start.
    #[default]
    FreezeIncrement,
    /// Re-derive the step size so the remaining steps land on the new setpoint.
    RecomputeIncrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Ramping,
    Holding,
}

/// Per-session controller state. Created by `start`, dropped by `stop`.
#[derive(Debug, Clone, PartialEq)]
pub struct RampState {
    pub target: f64,
    pub final_setpoint: f64,
    pub increment_amount: f64,
    pub step_count: u32,
    pub error_integral: f64,
    pub error_sum: f64,
    pub previous_error: f64,
}

/// Number of ramp steps for a ramp time and sample time; at least 1.
///
/// A fractional ratio rounds up (75 s / 2 s -> 38) so the ramp never finishes
/// early; the final step snaps onto the setpoint.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn ramp_increments(sample_time_s: f64, ramp_time_s: f64) -> u32 {
    let n = (ramp_time_s / sample_time_s - 1e-9).ceil();
    if n.is_finite() && n >= 1.0 {
        n.min(f64::from(u32::MAX)) as u32
    } else {
        1
    }
}

#[derive(Debug, Clone)]
pub struct RampedController {
    gains: Gains,
    sample_time_s: f64,
    ramp_increments: u32,
    integral_mode: IntegralMode,
    ramp_policy: RampPolicy,
    active: Option<RampState>,
}

impl RampedController {
    pub fn new(cfg: &ControlCfg) -> Self {
        Self {
            gains: cfg.gains,
            sample_time_s: cfg.sample_time_s,
            ramp_increments: ramp_increments(cfg.sample_time_s, cfg.ramp_time_s),
            integral_mode: cfg.integral_mode,
            ramp_policy: cfg.ramp_policy,
            active: None,
        }
    }

    /// Begin a ramp from `current_pressure` toward `final_setpoint`.
    ///
    /// The first increment is applied immediately, so `target` lies strictly
    /// between the two (or equals `final_setpoint` for a single-step ramp).
    pub fn start(
        &mut self,
        final_setpoint: f64,
        current_pressure: f64,
    ) -> Result<(), ControllerError> {
        check_setpoint(final_setpoint)?;
        check_measurement(current_pressure)?;
        let n = f64::from(self.ramp_increments);
        let increment_amount = (final_setpoint - current_pressure) / n;
        let target = if self.ramp_increments <= 1 {
            final_setpoint
        } else {
            current_pressure + increment_amount
        };
        self.active = Some(RampState {
            target,
            final_setpoint,
            increment_amount,
            step_count: 0,
            error_integral: 0.0,
            error_sum: 0.0,
            previous_error: 0.0,
        });
        tracing::debug!(
            final_setpoint,
            current_pressure,
            increments = self.ramp_increments,
            increment_amount,
            "ramp started"
        );
        Ok(())
    }

    /// Move the final setpoint of the active ramp according to the ramp policy.
    pub fn update_target(&mut self, new_final: f64) -> Result<(), ControllerError> {
        check_setpoint(new_final)?;
        let n = self.ramp_increments;
        let policy = self.ramp_policy;
        let st = self.active.as_mut().ok_or(ControllerError::NoActiveSession)?;
        st.final_setpoint = new_final;
        if policy == RampPolicy::RecomputeIncrement {
            if st.step_count >= n {
                // Already holding: ramp again from where the target sits now.
                st.increment_amount = (new_final - st.target) / f64::from(n);
                st.target = if n <= 1 {
                    new_final
                } else {
                    st.target + st.increment_amount
                };
                st.step_count = 0;
            } else {
                // Tick 0 consumes the increment `start` already applied.
                let remaining = if st.step_count == 0 {
                    n - 1
                } else {
                    n - st.step_count
                };
                if remaining == 0 {
                    st.target = new_final;
                } else {
                    st.increment_amount = (new_final - st.target) / f64::from(remaining);
                }
            }
        }
        tracing::debug!(new_final, ?policy, "setpoint updated");
        Ok(())
    }

    /// One control step. Returns the fractional valve adjustment.
    pub fn calc_percent_change(&mut self, curr: f64) -> Result<f64, ControllerError> {
        check_measurement(curr)?;
        let n = self.ramp_increments;
        let gains = self.gains;
        let dt = self.sample_time_s;
        let mode = self.integral_mode;
        let st = self.active.as_mut().ok_or(ControllerError::NoActiveSession)?;

        // Advance ramp
        if st.step_count >= n {
            st.target = st.final_setpoint;
        } else if st.step_count > 0 {
            if st.step_count + 1 >= n {
                st.target = st.final_setpoint;
            } else {
                st.target += st.increment_amount;
            }
        }

        let error = st.target - curr;
        let derivative = (error - st.previous_error) / dt;
        st.error_integral += error * dt;
        let integral = match mode {
            IntegralMode::Frozen => st.error_sum,
            IntegralMode::Accumulating => st.error_integral,
        };
        let predicted = curr + gains.p * error + gains.i * integral + gains.d * derivative;
        let percent_change = (st.target - predicted) / st.target;

        st.previous_error = error;
        st.step_count = st.step_count.saturating_add(1);
        tracing::trace!(
            target = st.target,
            error,
            predicted,
            percent_change,
            step = st.step_count,
            "controller step"
        );
        Ok(percent_change)
    }

    pub fn stop(&mut self) {
        self.active = None;
    }

    pub fn phase(&self) -> Phase {
        match &self.active {
            None => Phase::Idle,
            Some(st) if st.step_count >= self.ramp_increments => Phase::Holding,
            Some(_) => Phase::Ramping,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn state(&self) -> Option<&RampState> {
        self.active.as_ref()
    }

    pub fn target(&self) -> Option<f64> {
        self.active.as_ref().map(|s| s.target)
    }

    pub fn final_setpoint(&self) -> Option<f64> {
        self.active.as_ref().map(|s| s.final_setpoint)
    }

    pub fn ramp_increments(&self) -> u32 {
        self.ramp_increments
    }

    pub fn gains(&self) -> Gains {
        self.gains
    }
}

fn check_setpoint(v: f64) -> Result<(), ControllerError> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(ControllerError::InvalidSetpoint(v))
    }
}

fn check_measurement(v: f64) -> Result<(), ControllerError> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(ControllerError::InvalidMeasurement(v))
    }
}
