//! Type-state builder for `ControlLoop`.
//!
//! The builder starts with both transports `Missing`; `build()` only exists
//! once a gauge and a valve transport have been supplied. Everything else has
//! a default and is validated on `build()`.

use regulator_traits::{Clock, MonotonicClock, Transport};

use crate::config::{ControlCfg, DisplayCfg, Timeouts, ValveCfg};
use crate::control_loop::ControlLoop;
use crate::error::{BuildError, Result};
use crate::link::Link;
use crate::session_log::{NullSink, SampleSink};

// ── Type-state marker ────────────────────────────────────────────────────────

/// Placeholder for a transport that has not been provided yet.
#[derive(Debug, Default)]
pub struct Missing;

pub struct ControlLoopBuilder<G, V> {
    gauge: G,
    valve: V,
    control: ControlCfg,
    valve_cfg: ValveCfg,
    timeouts: Timeouts,
    display: DisplayCfg,
    clock: Option<Box<dyn Clock + Send + Sync>>,
    sink: Option<Box<dyn SampleSink>>,
}

impl Default for ControlLoopBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            gauge: Missing,
            valve: Missing,
            control: ControlCfg::default(),
            valve_cfg: ValveCfg::default(),
            timeouts: Timeouts::default(),
            display: DisplayCfg::default(),
            clock: None,
            sink: None,
        }
    }
}

impl ControlLoop<Missing, Missing> {
    /// Start building a control loop.
    pub fn builder() -> ControlLoopBuilder<Missing, Missing> {
        ControlLoopBuilder::default()
    }
}

// Setters available in any state
impl<G, V> ControlLoopBuilder<G, V> {
    pub fn with_control(mut self, control: ControlCfg) -> Self {
        self.control = control;
        self
    }

    pub fn with_valve_cfg(mut self, valve: ValveCfg) -> Self {
        self.valve_cfg = valve;
        self
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_display(mut self, display: DisplayCfg) -> Self {
        self.display = display;
        self
    }

    /// Take control, valve, timeout and display settings from a loaded config file.
    pub fn with_config(self, cfg: &regulator_config::Config) -> Self {
        self.with_control((&cfg.control).into())
            .with_valve_cfg((&cfg.valve).into())
            .with_timeouts(cfg.into())
            .with_display((&cfg.display).into())
    }

    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Where finished sessions go; defaults to discarding them.
    pub fn with_sink(mut self, sink: Box<dyn SampleSink>) -> Self {
        self.sink = Some(sink);
        self
    }
}

// Setters that advance type-state
impl<V> ControlLoopBuilder<Missing, V> {
    pub fn with_gauge<G: Transport>(self, gauge: G) -> ControlLoopBuilder<G, V> {
        ControlLoopBuilder {
            gauge,
            valve: self.valve,
            control: self.control,
            valve_cfg: self.valve_cfg,
            timeouts: self.timeouts,
            display: self.display,
            clock: self.clock,
            sink: self.sink,
        }
    }
}

impl<G> ControlLoopBuilder<G, Missing> {
    pub fn with_valve<V: Transport>(self, valve: V) -> ControlLoopBuilder<G, V> {
        ControlLoopBuilder {
            gauge: self.gauge,
            valve,
            control: self.control,
            valve_cfg: self.valve_cfg,
            timeouts: self.timeouts,
            display: self.display,
            clock: self.clock,
            sink: self.sink,
        }
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

fn validate(control: &ControlCfg, valve: &ValveCfg, timeouts: &Timeouts, display: &DisplayCfg) -> Result<()> {
    let g = control.gains;
    if !(g.p.is_finite() && g.i.is_finite() && g.d.is_finite()) {
        return Err(invalid("gains must be finite"));
    }
    if !(control.sample_time_s.is_finite() && control.sample_time_s > 0.0) {
        return Err(invalid("sample_time_s must be > 0"));
    }
    if !(control.ramp_time_s.is_finite() && control.ramp_time_s >= control.sample_time_s) {
        return Err(invalid("ramp_time_s must be >= sample_time_s"));
    }
    if !(control.convergence_bound > 0.0 && control.convergence_bound < 1.0) {
        return Err(invalid("convergence_bound must be in (0, 1)"));
    }
    if !(valve.max_open.is_finite() && valve.max_open > 0.0 && valve.max_open < 10_000.0) {
        return Err(invalid("max_open must be in (0, 10000)"));
    }
    if !(valve.default_position > 0.0 && valve.default_position < valve.max_open) {
        return Err(invalid("default_position must be in (0, max_open)"));
    }
    if timeouts.gauge_ms == 0 {
        return Err(invalid("gauge timeout must be >= 1 ms"));
    }
    if timeouts.gauge_ms > Timeouts::MAX_MS {
        return Err(invalid("gauge timeout must be <= 3000 ms"));
    }
    if timeouts.valve_ack_ms > Timeouts::MAX_MS {
        return Err(invalid("valve ack timeout must be <= 3000 ms"));
    }
    if display.refresh_ms == 0 {
        return Err(invalid("display refresh must be >= 1 ms"));
    }
    Ok(())
}

impl<G: Transport, V: Transport> ControlLoopBuilder<G, V> {
    /// Validate and build. Only available once both transports are set.
    pub fn build(self) -> Result<ControlLoop<G, V>> {
        validate(&self.control, &self.valve_cfg, &self.timeouts, &self.display)?;
        let link = Link::new(
            self.gauge,
            self.valve,
            self.timeouts.gauge(),
            self.timeouts.valve_ack(),
        );
        let clock = self
            .clock
            .unwrap_or_else(|| Box::new(MonotonicClock::new()));
        let sink = self.sink.unwrap_or_else(|| Box::new(NullSink));
        Ok(ControlLoop::assemble(
            link,
            self.control,
            self.valve_cfg,
            std::time::Duration::from_millis(self.display.refresh_ms),
            clock,
            sink,
        ))
    }
}
