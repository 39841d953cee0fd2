#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the pressure regulator.
//!
//! - `Config` and its sections are deserialized from TOML; every section has
//!   defaults so a minimal file only names what differs from the bench setup.
//! - `Config::validate` rejects values the control loop cannot run with.
use eyre::WrapErr;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    None,
    #[default]
    Even,
    Odd,
}

/// Ion gauge serial line.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GaugePort {
    pub port: String,
    pub baud_rate: u32,
    /// Max time to wait for a pressure reply (ms)
    pub timeout_ms: u64,
}

impl Default for GaugePort {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 4800,
            timeout_ms: 500,
        }
    }
}

/// Leak valve serial line.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ValvePort {
    pub port: String,
    pub baud_rate: u32,
    pub parity: Parity,
    /// 7 or 8
    pub data_bits: u8,
    /// Port-level read/write timeout (ms)
    pub timeout_ms: u64,
    /// How long to wait for an optional acknowledgement line (ms)
    pub ack_timeout_ms: u64,
}

impl Default for ValvePort {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB1".to_string(),
            baud_rate: 9600,
            parity: Parity::Even,
            data_bits: 7,
            timeout_ms: 3000,
            ack_timeout_ms: 300,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntegralMode {
    /// Integral term reads a sum that is never updated (bench-compatible)
    #[default]
    Frozen,
    /// Integral term reads the running error integral
    Accumulating,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RampPolicy {
    /// Setpoint changes keep the current ramp increment
    #[default]
    FreezeIncrement,
    /// Setpoint changes re-derive the increment over the remaining steps
    RecomputeIncrement,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ControlCfg {
    pub p: f64,
    pub i: f64,
    pub d: f64,
    pub sample_time_s: f64,
    pub ramp_time_s: f64,
    /// Fractional tolerance for "at setpoint"
    pub convergence_bound: f64,
    pub integral_mode: IntegralMode,
    pub ramp_policy: RampPolicy,
    /// Leave the valve alone on ticks where pressure is already converged
    pub hold_when_converged: bool,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            p: 0.5,
            i: 0.05,
            d: 0.0,
            sample_time_s: 2.0,
            ramp_time_s: 75.0,
            convergence_bound: 0.05,
            integral_mode: IntegralMode::Frozen,
            ramp_policy: RampPolicy::FreezeIncrement,
            hold_when_converged: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ValveCfg {
    /// Requests at or above this opening are refused
    pub max_open: f64,
    /// Opening applied when a session starts with the valve closed
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

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DisplayCfg {
    pub refresh_ms: u64,
}

impl Default for DisplayCfg {
    fn default() -> Self {
        Self { refresh_ms: 500 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SessionCfg {
    /// Directory receiving one CSV per session
    pub log_dir: String,
}

impl Default for SessionCfg {
    fn default() -> Self {
        Self {
            log_dir: "sessions".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    pub gauge: GaugePort,
    pub valve_port: ValvePort,
    pub control: ControlCfg,
    pub valve: ValveCfg,
    pub display: DisplayCfg,
    pub session: SessionCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    let cfg = load_toml(&text).wrap_err_with(|| format!("parse config {}", path.display()))?;
    cfg.validate()
        .wrap_err_with(|| format!("invalid configuration in {}", path.display()))?;
    Ok(cfg)
}

fn finite_positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Serial lines
        if self.gauge.port.trim().is_empty() {
            eyre::bail!("gauge.port must not be empty");
        }
        if self.gauge.baud_rate == 0 {
            eyre::bail!("gauge.baud_rate must be > 0");
        }
        if self.gauge.timeout_ms == 0 || self.gauge.timeout_ms > 3000 {
            eyre::bail!("gauge.timeout_ms must be in [1, 3000]");
        }
        if self.valve_port.port.trim().is_empty() {
            eyre::bail!("valve_port.port must not be empty");
        }
        if self.valve_port.baud_rate == 0 {
            eyre::bail!("valve_port.baud_rate must be > 0");
        }
        if !matches!(self.valve_port.data_bits, 7 | 8) {
            eyre::bail!("valve_port.data_bits must be 7 or 8");
        }
        if self.valve_port.timeout_ms == 0 || self.valve_port.timeout_ms > 3000 {
            eyre::bail!("valve_port.timeout_ms must be in [1, 3000]");
        }
        if self.valve_port.ack_timeout_ms > self.valve_port.timeout_ms {
            eyre::bail!("valve_port.ack_timeout_ms must not exceed valve_port.timeout_ms");
        }

        // Control
        for (name, gain) in [
            ("control.p", self.control.p),
            ("control.i", self.control.i),
            ("control.d", self.control.d),
        ] {
            if !gain.is_finite() {
                eyre::bail!("{name} must be finite");
            }
        }
        if !finite_positive(self.control.sample_time_s) {
            eyre::bail!("control.sample_time_s must be > 0");
        }
        if !finite_positive(self.control.ramp_time_s) {
            eyre::bail!("control.ramp_time_s must be > 0");
        }
        if self.control.ramp_time_s < self.control.sample_time_s {
            eyre::bail!("control.ramp_time_s must be >= control.sample_time_s");
        }
        if !(self.control.convergence_bound > 0.0 && self.control.convergence_bound < 1.0) {
            eyre::bail!("control.convergence_bound must be in (0.0, 1.0)");
        }

        // Valve
        if !finite_positive(self.valve.max_open) {
            eyre::bail!("valve.max_open must be > 0");
        }
        if self.valve.max_open >= 10_000.0 {
            eyre::bail!("valve.max_open must be < 10000 (7-digit command numeral)");
        }
        if !finite_positive(self.valve.default_position)
            || self.valve.default_position >= self.valve.max_open
        {
            eyre::bail!("valve.default_position must be in (0, valve.max_open)");
        }

        // Display
        if self.display.refresh_ms == 0 {
            eyre::bail!("display.refresh_ms must be >= 1");
        }

        // Session
        if self.session.log_dir.trim().is_empty() {
            eyre::bail!("session.log_dir must not be empty");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}
