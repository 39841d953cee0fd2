pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// A line-oriented serial endpoint (ion gauge or leak valve).
///
/// Implementations own the port exclusively. Errors cross this boundary as
/// boxed trait objects so hardware crates stay free to use their own types.
pub trait Transport {
    /// Discard anything pending in the input and output buffers.
    fn clear(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Write the whole command and flush it to the device.
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// Read one response line, waiting at most `timeout`.
    ///
    /// The returned text still carries whatever the device sent, including
    /// the line terminator; callers trim it.
    fn read_line(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn clear(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).clear()
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).write_all(bytes)
    }

    fn read_line(
        &mut self,
        timeout: std::time::Duration,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read_line(timeout)
    }
}
