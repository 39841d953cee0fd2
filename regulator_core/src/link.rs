//! Request/response protocol for the ion gauge and the leak valve.
//!
//! Every command clears pending buffers first. `Link` methods take `&mut self`,
//! so a round trip can never interleave with another use of the same line.

use std::time::Duration;

use regulator_traits::Transport;

use crate::error::LinkError;
use crate::hw_error::map_link_error;
use crate::sci;
use crate::types::{Ack, PressureReading};
use crate::valve::format_position;

/// Gauge "read digital" request.
pub const GAUGE_READ_CMD: &[u8] = b"#  RDIG\r";
/// Valve close request.
pub const VALVE_CLOSE_CMD: &[u8] = b"C:\r\n";
/// Characters the gauge echoes ahead of the value.
const GAUGE_PREFIX_LEN: usize = 3;

/// Valve position request for `position`: `R:<7 digits>\r\n`.
pub fn valve_position_cmd(position: f64) -> String {
    format!("R:{}\r\n", format_position(position))
}

/// Extract the pressure from one gauge response line.
pub fn decode_gauge_line(line: &str) -> Result<PressureReading, LinkError> {
    let body = line
        .char_indices()
        .nth(GAUGE_PREFIX_LEN)
        .map(|(i, _)| &line[i..])
        .ok_or_else(|| LinkError::Protocol(format!("short gauge response {line:?}")))?;
    let value = sci::parse(body.trim_end()).map_err(|e| LinkError::Protocol(e.to_string()))?;
    PressureReading::new(value)
        .ok_or_else(|| LinkError::Protocol(format!("implausible pressure {value}")))
}

#[derive(Debug)]
pub struct Link<G, V> {
    gauge: G,
    valve: V,
    gauge_timeout: Duration,
    ack_timeout: Duration,
}

impl<G: Transport, V: Transport> Link<G, V> {
    pub fn new(gauge: G, valve: V, gauge_timeout: Duration, ack_timeout: Duration) -> Self {
        Self {
            gauge,
            valve,
            gauge_timeout,
            ack_timeout,
        }
    }

    /// Ask the gauge for one reading. The gauge must answer.
    pub fn read_pressure(&mut self) -> Result<PressureReading, LinkError> {
        self.gauge.clear().map_err(|e| map_link_error(&*e))?;
        self.gauge
            .write_all(GAUGE_READ_CMD)
            .map_err(|e| map_link_error(&*e))?;
        let line = self
            .gauge
            .read_line(self.gauge_timeout)
            .map_err(|e| map_link_error(&*e))?;
        let reading = decode_gauge_line(&line)?;
        tracing::trace!(pressure = reading.pascals(), "gauge read");
        Ok(reading)
    }

    /// Command the valve to `position`.
    pub fn write_valve(&mut self, position: f64) -> Result<Ack, LinkError> {
        let cmd = valve_position_cmd(position);
        self.valve_command(cmd.as_bytes())
    }

    pub fn close_valve(&mut self) -> Result<Ack, LinkError> {
        self.valve_command(VALVE_CLOSE_CMD)
    }

    fn valve_command(&mut self, cmd: &[u8]) -> Result<Ack, LinkError> {
        self.valve.clear().map_err(|e| map_link_error(&*e))?;
        self.valve.write_all(cmd).map_err(|e| map_link_error(&*e))?;
        match self.valve.read_line(self.ack_timeout) {
            Ok(line) => {
                let text = line.trim().to_string();
                tracing::trace!(ack = %text, "valve ack");
                Ok(Ack::Line(text))
            }
            Err(e) => match map_link_error(&*e) {
                LinkError::Timeout => Ok(Ack::Silent),
                other => Err(other),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_prefixed_line() {
        let r = decode_gauge_line(">  1.80E-08\r\n").unwrap();
        assert_eq!(r.pascals(), 1.8e-8);
    }

    #[test]
    fn short_or_garbled_lines_are_protocol_errors() {
        assert!(matches!(decode_gauge_line(">\r"), Err(LinkError::Protocol(_))));
        assert!(matches!(
            decode_gauge_line(">  ERR\r\n"),
            Err(LinkError::Protocol(_))
        ));
        assert!(matches!(
            decode_gauge_line(">  -1.0E-08\r\n"),
            Err(LinkError::Protocol(_))
        ));
    }

    #[test]
    fn position_command_bytes() {
        assert_eq!(valve_position_cmd(46.0), "R:0046000\r\n");
    }
}
