//! Capability traits for the physical link.
//!
//! `PortOpener` opens a port by name, `SerialPortAdapter` reads, writes and
//! closes it. Both have a real (`serialport`) and an in-memory implementation.

use super::error::PortError;
use std::io::ErrorKind;
use std::time::Duration;

/// Baud rate used by the fan controller firmware.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Per-read timeout; bounds how long a stop request can go unnoticed.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Parameters used when opening a port. The board always runs 8N1 without
/// flow control, so only speed and read timeout are configurable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortConfiguration {
    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// Upper bound for a single read call.
    pub read_timeout: Duration,
}

impl Default for PortConfiguration {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Trait for serial port I/O operations.
///
/// Implementations are used behind a mutex by the session; each method is
/// one physical I/O call.
pub trait SerialPortAdapter: Send + std::fmt::Debug {
    /// Write bytes to the serial port.
    ///
    /// Returns the number of bytes actually written.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Read bytes into `buffer`, waiting at most the configured read timeout.
    ///
    /// A timeout surfaces as an error for which [`PortError::is_timeout`] holds.
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Get the name/path of this serial port.
    fn name(&self) -> &str;

    /// Release the device. Called at most once, before the adapter is dropped.
    fn close(&mut self) -> Result<(), PortError> {
        Ok(())
    }

    /// Write the whole of `data`.
    fn write_all(&mut self, mut data: &[u8]) -> Result<(), PortError> {
        while !data.is_empty() {
            match self.write_bytes(data)? {
                0 => {
                    return Err(PortError::Io(std::io::Error::new(
                        ErrorKind::WriteZero,
                        "serial port accepted no bytes",
                    )))
                }
                n => data = &data[n..],
            }
        }
        Ok(())
    }
}

/// Opens ports by name.
pub trait PortOpener: Send + Sync {
    fn open(
        &self,
        port_name: &str,
        config: &PortConfiguration,
    ) -> Result<Box<dyn SerialPortAdapter>, PortError>;
}
