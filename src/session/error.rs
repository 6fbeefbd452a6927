//! Session error types.

use crate::port::PortError;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by [`Session`](super::Session) operations and reported to
/// its observer.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The port could not be opened.
    #[error("Failed to open serial port '{port}': {source}")]
    Open {
        port: String,
        #[source]
        source: PortError,
    },

    /// The port opened but no status frame arrived in time.
    #[error("Couldn't get fan controller status within {0:?}")]
    HandshakeTimeout(Duration),

    /// Reading failed while waiting for the first status frame.
    #[error("Handshake read failed: {0}")]
    Handshake(#[source] PortError),

    /// Reading failed while connected.
    #[error("Serial read failed: {0}")]
    Read(#[source] PortError),

    /// A command could not be written.
    #[error("Serial write failed: {0}")]
    Write(#[source] PortError),

    #[error("Not connected to a fan controller")]
    NotConnected,

    #[error("Already connected to '{0}'")]
    AlreadyConnected(String),

    /// `stop` was called while the connection was still being set up.
    #[error("Connection to '{0}' was cancelled")]
    Cancelled(String),

    #[error("Failed to start the serial reader thread: {0}")]
    Spawn(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SessionError::Open {
            port: "COM3".to_string(),
            source: PortError::not_found("COM3"),
        };
        assert_eq!(
            err.to_string(),
            "Failed to open serial port 'COM3': Serial port not found: COM3"
        );

        let err = SessionError::HandshakeTimeout(Duration::from_secs(3));
        assert_eq!(
            err.to_string(),
            "Couldn't get fan controller status within 3s"
        );
    }
}
