//! Errors raised by the port capability layer.

use std::io::ErrorKind;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortError {
    /// No device with this name exists.
    #[error("Serial port not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The driver refused the line settings (baud rate, framing).
    #[error("Unsupported port settings: {0}")]
    Settings(String),

    /// No data within the read timeout.
    #[error("No data within {0:?}")]
    Timeout(Duration),

    /// The port was closed, or never attached to the link.
    #[error("Port is not open")]
    NotOpen,

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    /// Whether the error only means the read timeout elapsed. Such errors are
    /// expected while polling and never end a session.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout(_) => true,
            Self::Io(e) => matches!(
                e.kind(),
                ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            PortError::not_found("/dev/ttyUSB0").to_string(),
            "Serial port not found: /dev/ttyUSB0"
        );
        assert_eq!(
            PortError::Settings("baud rate 7".into()).to_string(),
            "Unsupported port settings: baud rate 7"
        );
        assert_eq!(PortError::NotOpen.to_string(), "Port is not open");
    }

    #[test]
    fn test_timeout_classification() {
        assert!(PortError::Timeout(Duration::from_millis(100)).is_timeout());
        assert!(PortError::Io(std::io::Error::new(ErrorKind::TimedOut, "t")).is_timeout());
        assert!(PortError::Io(std::io::Error::new(ErrorKind::WouldBlock, "w")).is_timeout());
        assert!(!PortError::Io(std::io::Error::new(ErrorKind::BrokenPipe, "b")).is_timeout());
        assert!(!PortError::NotOpen.is_timeout());
    }
}
