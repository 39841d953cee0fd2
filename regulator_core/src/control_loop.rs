//! The control loop: one session at a time, driven by the scheduler.
//!
//! A session runs from `start_session` to `stop_session`. While it is active a
//! periodic `ControlTick` timer reads the gauge, asks the controller for an
//! adjustment, and moves the valve. A faster `DisplayRefresh` timer only
//! refreshes `current_pressure`.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use regulator_traits::{Clock, Transport};
use tracing::{debug, info, warn};

use crate::config::{ControlCfg, ValveCfg};
use crate::controller::{Phase, RampedController};
use crate::error::{ControllerError, LinkError, RegulatorError};
use crate::link::Link;
use crate::scheduler::{Scheduler, TimerId, TimerKind};
use crate::session_log::SampleSink;
use crate::status::{HoldReason, LoopStats, TickOutcome};
use crate::types::Sample;
use crate::util::{is_converged, secs_to_duration};

#[derive(Debug)]
struct Session {
    started_at: DateTime<Utc>,
    samples: Vec<Sample>,
    tick_timer: TimerId,
}

pub struct ControlLoop<G, V> {
    pub(crate) link: Link<G, V>,
    pub(crate) controller: RampedController,
    pub(crate) valve: crate::valve::ValveDriver,
    pub(crate) control: ControlCfg,
    pub(crate) valve_cfg: ValveCfg,
    pub(crate) scheduler: Scheduler,
    pub(crate) clock: Box<dyn Clock + Send + Sync>,
    pub(crate) sink: Box<dyn SampleSink>,
    session: Option<Session>,
    current_pressure: Option<f64>,
    converged: bool,
    pub(crate) display_period: Duration,
    display_timer: Option<TimerId>,
    stats: LoopStats,
}

impl<G, V> core::fmt::Debug for ControlLoop<G, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ControlLoop")
            .field("phase", &self.controller.phase())
            .field("target", &self.controller.target())
            .field("valve_position", &self.valve.position())
            .field("current_pressure", &self.current_pressure)
            .field("active", &self.session.is_some())
            .finish_non_exhaustive()
    }
}

impl<G: Transport, V: Transport> ControlLoop<G, V> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn assemble(
        link: Link<G, V>,
        control: ControlCfg,
        valve_cfg: ValveCfg,
        display_period: Duration,
        clock: Box<dyn Clock + Send + Sync>,
        sink: Box<dyn SampleSink>,
    ) -> Self {
        Self {
            link,
            controller: RampedController::new(&control),
            valve: crate::valve::ValveDriver::new(valve_cfg.max_open),
            control,
            valve_cfg,
            scheduler: Scheduler::new(),
            clock,
            sink,
            session: None,
            current_pressure: None,
            converged: false,
            display_period,
            display_timer: None,
            stats: LoopStats::default(),
        }
    }

    // ── Session control ──────────────────────────────────────────────────────

    /// Begin a session toward `final_setpoint`, or retarget the active one.
    ///
    /// A closed valve is first opened to the configured default position.
    /// No valve adjustment happens inside this call: the first control tick
    /// fires one sample time from now, on the next `poll` past that deadline.
    pub fn start_session(&mut self, final_setpoint: f64) -> Result<(), RegulatorError> {
        if !(final_setpoint.is_finite() && final_setpoint > 0.0) {
            return Err(ControllerError::InvalidSetpoint(final_setpoint).into());
        }
        if self.session.is_some() {
            return self.update_setpoint(final_setpoint);
        }

        let pressure = match self.link.read_pressure() {
            Ok(r) => {
                self.current_pressure = Some(r.pascals());
                r.pascals()
            }
            Err(e) => match self.current_pressure {
                Some(p) => {
                    warn!(error = %e, last_pressure = p, "gauge read failed at start; using last reading");
                    p
                }
                None => return Err(e.into()),
            },
        };

        self.controller.start(final_setpoint, pressure)?;

        if self.valve.is_closed() {
            let default = self.valve_cfg.default_position;
            let opened = self
                .valve
                .clamp_and_apply(default)
                .map_err(RegulatorError::from)
                .and_then(|pos| self.link.write_valve(pos).map_err(RegulatorError::from));
            if let Err(e) = opened {
                self.valve.close();
                self.controller.stop();
                return Err(e);
            }
            info!(position = default, "valve opened to default position");
        }

        let period = secs_to_duration(self.control.sample_time_s);
        let now = self.clock.now();
        let tick_timer = self
            .scheduler
            .schedule_every(TimerKind::ControlTick, now + period, period);
        self.session = Some(Session {
            started_at: Utc::now(),
            samples: Vec::new(),
            tick_timer,
        });
        self.converged = false;
        info!(
            final_setpoint,
            pressure,
            target = self.controller.target(),
            increments = self.controller.ramp_increments(),
            "session started"
        );
        Ok(())
    }

    /// Change the final setpoint of the active session.
    pub fn update_setpoint(&mut self, final_setpoint: f64) -> Result<(), RegulatorError> {
        if self.session.is_none() {
            return Err(ControllerError::NoActiveSession.into());
        }
        self.controller.update_target(final_setpoint)?;
        self.converged = false;
        info!(final_setpoint, "setpoint updated");
        Ok(())
    }

    /// End the session: cancel ticks, close the valve, flush the samples.
    ///
    /// Returns where the samples were written. If the close command fails the
    /// samples are still flushed, the stored position is kept, and the close
    /// error is returned.
    pub fn stop_session(&mut self) -> Result<Option<PathBuf>, RegulatorError> {
        let session = self
            .session
            .take()
            .ok_or(ControllerError::NoActiveSession)?;
        self.scheduler.cancel(session.tick_timer);
        self.controller.stop();
        self.converged = false;

        let closed = self.link.close_valve();
        if closed.is_ok() {
            self.valve.close();
        }
        let written = self.sink.write_session(session.started_at, &session.samples);
        info!(samples = session.samples.len(), "session stopped");

        match closed {
            Ok(_) => written,
            Err(e) => {
                warn!(error = %e, "valve close failed");
                if let Err(log_err) = written {
                    warn!(error = %log_err, "session log not written");
                }
                Err(e.into())
            }
        }
    }

    /// Close the valve outside of a session.
    pub fn close_valve(&mut self) -> Result<(), RegulatorError> {
        self.link.close_valve()?;
        self.valve.close();
        Ok(())
    }

    // ── Ticks ────────────────────────────────────────────────────────────────

    /// One control step. A failed step leaves controller and valve untouched.
    pub fn tick(&mut self) -> TickOutcome {
        let outcome = self.tick_inner();
        self.stats.record(&outcome);
        outcome
    }

    fn tick_inner(&mut self) -> TickOutcome {
        if self.session.is_none() {
            return TickOutcome::Idle;
        }
        let Some(final_setpoint) = self.controller.final_setpoint() else {
            return TickOutcome::Idle;
        };

        let pressure = match self.link.read_pressure() {
            Ok(r) => r.pascals(),
            Err(e) => {
                warn!(error = %e, "tick skipped: gauge read failed");
                return TickOutcome::Skipped(e.into());
            }
        };
        self.current_pressure = Some(pressure);

        let converged = is_converged(final_setpoint, pressure, self.control.convergence_bound);
        if converged != self.converged {
            if converged {
                info!(pressure, final_setpoint, "pressure converged");
            } else {
                info!(pressure, final_setpoint, "pressure left convergence band");
            }
            self.converged = converged;
        }

        if converged && self.control.hold_when_converged {
            self.record_sample(pressure);
            return TickOutcome::Held {
                pressure,
                target: self.controller.target().unwrap_or(final_setpoint),
                reason: HoldReason::Converged,
            };
        }

        let controller_before = self.controller.clone();
        let percent_change = match self.controller.calc_percent_change(pressure) {
            Ok(pc) => pc,
            Err(e) => {
                self.controller = controller_before;
                warn!(error = %e, "tick skipped: controller rejected input");
                return TickOutcome::Skipped(e.into());
            }
        };
        let target = self.controller.target().unwrap_or(final_setpoint);
        let candidate = self.valve.position() * (1.0 + percent_change / 100.0);

        let valve_before = self.valve.clone();
        let position = match self.valve.clamp_and_apply(candidate) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, requested = candidate, "valve move refused; holding");
                return TickOutcome::Held {
                    pressure,
                    target,
                    reason: HoldReason::OutOfRange(e),
                };
            }
        };

        if let Err(e) = self.link.write_valve(position) {
            self.controller = controller_before;
            self.valve = valve_before;
            warn!(error = %e, "tick skipped: valve write failed");
            return TickOutcome::Skipped(e.into());
        }

        self.record_sample(pressure);
        debug!(pressure, target, percent_change, position, "tick applied");
        TickOutcome::Applied {
            pressure,
            target,
            percent_change,
            position,
        }
    }

    fn record_sample(&mut self, pressure: f64) {
        let position = self.valve.position();
        if let Some(s) = self.session.as_mut() {
            s.samples.push(Sample::now(pressure, position));
        }
    }

    /// Refresh `current_pressure` only.
    pub fn refresh_display(&mut self) -> Result<f64, LinkError> {
        match self.link.read_pressure() {
            Ok(r) => {
                self.current_pressure = Some(r.pascals());
                self.stats.display_refreshes += 1;
                Ok(r.pascals())
            }
            Err(e) => {
                self.stats.display_errors += 1;
                debug!(error = %e, "display refresh failed");
                Err(e)
            }
        }
    }

    /// Fire every timer that is due. Returns the outcomes of control ticks.
    pub fn poll(&mut self) -> Vec<TickOutcome> {
        let now = self.clock.now();
        if self.display_timer.is_none() {
            self.display_timer = Some(self.scheduler.schedule_every(
                TimerKind::DisplayRefresh,
                now,
                self.display_period,
            ));
        }
        let mut outcomes = Vec::new();
        while let Some(fired) = self.scheduler.pop_due(now) {
            match fired.kind {
                TimerKind::ControlTick => outcomes.push(self.tick()),
                TimerKind::DisplayRefresh => {
                    let _ = self.refresh_display();
                }
            }
        }
        outcomes
    }

    /// Earliest pending timer deadline.
    pub fn next_deadline(&mut self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Sleep on the loop's clock until `until` (no-op if already past).
    pub fn sleep_until(&self, until: Instant) {
        let now = self.clock.now();
        self.clock.sleep(until.saturating_duration_since(now));
    }

    // ── Observers ────────────────────────────────────────────────────────────

    pub fn current_pressure(&self) -> Option<f64> {
        self.current_pressure
    }

    pub fn current_valve_position(&self) -> f64 {
        self.valve.position()
    }

    pub fn target(&self) -> Option<f64> {
        self.controller.target()
    }

    pub fn final_setpoint(&self) -> Option<f64> {
        self.controller.final_setpoint()
    }

    pub fn phase(&self) -> Phase {
        self.controller.phase()
    }

    pub fn controller(&self) -> &RampedController {
        &self.controller
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_converged(&self) -> bool {
        self.converged
    }

    /// Samples recorded so far in the active session.
    pub fn samples(&self) -> &[Sample] {
        self.session.as_ref().map_or(&[], |s| s.samples.as_slice())
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// Read one pressure value without touching session state.
    pub fn read_pressure(&mut self) -> Result<f64, LinkError> {
        let p = self.link.read_pressure()?.pascals();
        self.current_pressure = Some(p);
        Ok(p)
    }
}
