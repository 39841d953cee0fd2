//! Serial endpoints for the gauge and the valve: real ports with the
//! `hardware` feature, a simulated chamber otherwise.

use regulator_traits::Transport;

pub type Devices = (Box<dyn Transport>, Box<dyn Transport>);

#[cfg(feature = "hardware")]
pub fn open(cfg: &regulator_config::Config) -> eyre::Result<Devices> {
    use eyre::WrapErr;
    use regulator_hardware::serial::SerialTransport;
    use regulator_hardware::{DataBits, Parity, SerialSettings};
    use std::time::Duration;

    fn parity(p: regulator_config::Parity) -> Parity {
        match p {
            regulator_config::Parity::None => Parity::None,
            regulator_config::Parity::Even => Parity::Even,
            regulator_config::Parity::Odd => Parity::Odd,
        }
    }

    let gauge = SerialTransport::open(&SerialSettings {
        path: cfg.gauge.port.clone(),
        baud_rate: cfg.gauge.baud_rate,
        parity: Parity::None,
        data_bits: DataBits::Eight,
        timeout: Duration::from_millis(cfg.gauge.timeout_ms),
    })
    .wrap_err("open gauge port")?;
    let valve = SerialTransport::open(&SerialSettings {
        path: cfg.valve_port.port.clone(),
        baud_rate: cfg.valve_port.baud_rate,
        parity: parity(cfg.valve_port.parity),
        data_bits: if cfg.valve_port.data_bits == 7 {
            DataBits::Seven
        } else {
            DataBits::Eight
        },
        timeout: Duration::from_millis(cfg.valve_port.timeout_ms),
    })
    .wrap_err("open valve port")?;
    Ok((Box::new(gauge), Box::new(valve)))
}

/// Set `REGULATOR_SIM_GAUGE_OFFLINE=1` to simulate a gauge that never answers.
#[cfg(not(feature = "hardware"))]
pub fn open(_cfg: &regulator_config::Config) -> eyre::Result<Devices> {
    let chamber = regulator_hardware::SimulatedChamber::new();
    if std::env::var("REGULATOR_SIM_GAUGE_OFFLINE").is_ok_and(|v| v == "1") {
        chamber.set_gauge_online(false);
    }
    tracing::info!("using simulated chamber");
    Ok((Box::new(chamber.gauge()), Box::new(chamber.valve())))
}
