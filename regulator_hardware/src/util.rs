use std::io::{self, ErrorKind, Read};
use std::time::{Duration, Instant};

use crate::error::{HwError, Result};

/// A byte source whose individual reads can be bounded.
///
/// Serial ports block each `read` for their configured timeout; the line
/// reader shrinks that bound to what is left of the caller's deadline.
pub trait TimedRead: Read {
    /// Cap how long the next `read` may block.
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()>;
}

/// Read bytes from `reader` until a `\n` arrives or `timeout` expires.
///
/// Before every read the reader's own timeout is set to the time left until
/// the deadline, so one blocking read cannot overrun it. Reads that report
/// `TimedOut`/`WouldBlock`, or return `Ok(0)` ("nothing yet" on some ports),
/// are retried after `poll_interval`. The returned string includes the
/// terminator.
pub fn read_line_with_timeout<R: TimedRead + ?Sized>(
    reader: &mut R,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<String> {
    let deadline = Instant::now() + timeout;
    let mut line = Vec::with_capacity(32);
    let mut byte = [0u8; 1];
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(HwError::Timeout);
        }
        reader.set_read_timeout(remaining).map_err(HwError::Io)?;
        match reader.read(&mut byte) {
            Ok(1) => {
                line.push(byte[0]);
                if byte[0] == b'\n' {
                    break;
                }
                continue;
            }
            Ok(_) => {}
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {}
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(HwError::Io(e)),
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(HwError::Timeout);
        }
        std::thread::sleep(poll_interval.min(remaining));
    }
    String::from_utf8(line).map_err(|_| HwError::Encoding)
}
