pub mod error;
#[cfg(feature = "hardware")]
pub mod serial;
pub mod util;

use regulator_traits::Transport;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::error::HwError;

/// Parity setting for a serial line, independent of the backend crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
}

/// Character size for a serial line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataBits {
    Seven,
    #[default]
    Eight,
}

/// Everything needed to open one serial endpoint.
#[derive(Debug, Clone)]
pub struct SerialSettings {
    pub path: String,
    pub baud_rate: u32,
    pub parity: Parity,
    pub data_bits: DataBits,
    pub timeout: Duration,
}

/// First-order chamber model shared by the simulated gauge and valve.
///
/// The equilibrium pressure rises linearly with the valve opening; every gauge
/// read moves the chamber a fraction `relax` of the way toward equilibrium.
#[derive(Debug, Clone)]
pub struct ChamberModel {
    pub pressure: f64,
    pub base_pressure: f64,
    pub conductance: f64,
    pub relax: f64,
    pub valve_position: f64,
    /// When false the gauge swallows requests and never answers.
    pub gauge_online: bool,
}

impl Default for ChamberModel {
    fn default() -> Self {
        Self {
            pressure: 2.0e-9,
            base_pressure: 2.0e-9,
            conductance: 4.0e-10,
            relax: 0.3,
            valve_position: 0.0,
            gauge_online: true,
        }
    }
}

impl ChamberModel {
    fn equilibrium(&self) -> f64 {
        self.base_pressure + self.conductance * self.valve_position
    }

    fn settle_once(&mut self) -> f64 {
        let eq = self.equilibrium();
        self.pressure += (eq - self.pressure) * self.relax;
        self.pressure
    }
}

/// Simulated vacuum chamber with one ion gauge and one leak valve attached.
#[derive(Debug, Clone, Default)]
pub struct SimulatedChamber {
    state: Rc<RefCell<ChamberModel>>,
}

impl SimulatedChamber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(model: ChamberModel) -> Self {
        Self {
            state: Rc::new(RefCell::new(model)),
        }
    }

    pub fn gauge(&self) -> SimulatedGauge {
        SimulatedGauge {
            state: Rc::clone(&self.state),
            pending: false,
        }
    }

    pub fn valve(&self) -> SimulatedValve {
        SimulatedValve {
            state: Rc::clone(&self.state),
        }
    }

    pub fn pressure(&self) -> f64 {
        self.state.borrow().pressure
    }

    pub fn valve_position(&self) -> f64 {
        self.state.borrow().valve_position
    }

    /// Take the gauge off the line (or back on).
    pub fn set_gauge_online(&self, online: bool) {
        self.state.borrow_mut().gauge_online = online;
    }
}

/// Simulated ion gauge: answers `#  RDIG\r` with `">  <mantissa>E<exp>\r\n"`.
#[derive(Debug)]
pub struct SimulatedGauge {
    state: Rc<RefCell<ChamberModel>>,
    pending: bool,
}

impl Transport for SimulatedGauge {
    fn clear(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.pending = false;
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if bytes == b"#  RDIG\r" {
            self.pending = true;
            Ok(())
        } else {
            Err(Box::new(HwError::Serial(format!(
                "gauge rejected command {:?}",
                String::from_utf8_lossy(bytes)
            ))))
        }
    }

    fn read_line(
        &mut self,
        _timeout: Duration,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        if !self.pending || !self.state.borrow().gauge_online {
            return Err(Box::new(HwError::Timeout));
        }
        self.pending = false;
        let p = self.state.borrow_mut().settle_once();
        tracing::trace!(pressure = p, "simulated gauge read");
        Ok(format!(">  {p:.2E}\r\n"))
    }
}

/// Simulated leak valve: accepts `R:<7 digits>\r\n` and `C:\r\n`, never answers.
#[derive(Debug)]
pub struct SimulatedValve {
    state: Rc<RefCell<ChamberModel>>,
}

impl SimulatedValve {
    fn apply(&self, cmd: &str) -> Result<(), HwError> {
        let cmd = cmd.trim_end();
        if cmd == "C:" {
            self.state.borrow_mut().valve_position = 0.0;
            return Ok(());
        }
        let digits = cmd
            .strip_prefix("R:")
            .filter(|d| d.len() == 7 && d.bytes().all(|b| b.is_ascii_digit()))
            .ok_or_else(|| HwError::Serial(format!("valve rejected command {cmd:?}")))?;
        let thousandths: u32 = digits
            .parse()
            .map_err(|_| HwError::Serial(format!("valve rejected command {cmd:?}")))?;
        self.state.borrow_mut().valve_position = f64::from(thousandths) / 1000.0;
        Ok(())
    }
}

impl Transport for SimulatedValve {
    fn clear(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let cmd = std::str::from_utf8(bytes).map_err(|_| HwError::Encoding)?;
        self.apply(cmd)?;
        Ok(())
    }

    fn read_line(
        &mut self,
        _timeout: Duration,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(HwError::Timeout))
    }
}
