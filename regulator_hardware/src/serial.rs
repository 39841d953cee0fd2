use std::io::Write;
use std::time::Duration;

use regulator_traits::Transport;
use tracing::trace;

use crate::error::{HwError, Result};
use crate::util::{TimedRead, read_line_with_timeout};
use crate::{DataBits, Parity, SerialSettings};

/// Poll step while waiting for the rest of a response line.
const READ_POLL: Duration = Duration::from_millis(2);

impl TimedRead for Box<dyn serialport::SerialPort> {
    fn set_read_timeout(&mut self, timeout: Duration) -> std::io::Result<()> {
        self.set_timeout(timeout).map_err(std::io::Error::from)
    }
}

/// A real serial endpoint backed by the `serialport` crate.
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
    path: String,
}

impl SerialTransport {
    pub fn open(settings: &SerialSettings) -> Result<Self> {
        let parity = match settings.parity {
            Parity::None => serialport::Parity::None,
            Parity::Even => serialport::Parity::Even,
            Parity::Odd => serialport::Parity::Odd,
        };
        let data_bits = match settings.data_bits {
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        };
        let port = serialport::new(&settings.path, settings.baud_rate)
            .parity(parity)
            .data_bits(data_bits)
            .timeout(settings.timeout)
            .open()
            .map_err(|e| HwError::Serial(format!("open {}: {e}", settings.path)))?;
        tracing::info!(
            path = %settings.path,
            baud = settings.baud_rate,
            ?parity,
            ?data_bits,
            "serial port opened"
        );
        Ok(Self {
            port,
            path: settings.path.clone(),
        })
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("path", &self.path)
            .finish()
    }
}

impl Transport for SerialTransport {
    fn clear(&mut self) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.port
            .clear(serialport::ClearBuffer::All)
            .map_err(|e| HwError::Serial(format!("clear {}: {e}", self.path)))?;
        Ok(())
    }

    fn write_all(
        &mut self,
        bytes: &[u8],
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.port.write_all(bytes).map_err(HwError::Io)?;
        self.port.flush().map_err(HwError::Io)?;
        trace!(path = %self.path, len = bytes.len(), "serial write");
        Ok(())
    }

    fn read_line(
        &mut self,
        timeout: Duration,
    ) -> std::result::Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let line = read_line_with_timeout(&mut self.port, timeout, READ_POLL)?;
        trace!(path = %self.path, line = %line.trim_end(), "serial read");
        Ok(line)
    }
}
