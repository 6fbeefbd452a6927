use crate::config::ConfigError;
use crate::session::SessionError;
use std::fmt;

/// Unified application error type for the command-line front-end.
#[derive(Debug)]
pub enum AppError {
    /// No port given and none remembered in the configuration.
    NoPort,
    /// The controller did not answer in time.
    Timeout(&'static str),
    /// The device rejected the configuration.
    Rejected(String),
    /// The session ended before the command completed.
    Disconnected(String),
    InvalidInput(String),
    Config(ConfigError),
    Session(SessionError),
    Io(std::io::Error),
    Serde(serde_json::Error),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPort => write!(f, "No serial port given and none remembered; pass PORT."),
            Self::Timeout(what) => write!(f, "Timed out waiting for {what}."),
            Self::Rejected(message) => {
                write!(f, "The controller rejected the configuration: {message}")
            }
            Self::Disconnected(reason) => write!(f, "Connection lost: {reason}"),
            Self::InvalidInput(details) => write!(f, "Invalid input: {details}"),
            Self::Config(e) => write!(f, "{e}"),
            Self::Session(e) => write!(f, "{e}"),
            Self::Io(e) => write!(f, "An I/O error occurred: {e}"),
            Self::Serde(e) => write!(f, "A serialization error occurred: {e}"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Session(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::Serde(e) => Some(e),
            _ => None,
        }
    }
}

// Implement `From` conversions to allow the `?` operator to work seamlessly.
impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err)
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        AppError::Session(err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serde(err)
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_display() {
        assert_eq!(
            AppError::Rejected("range".into()).to_string(),
            "The controller rejected the configuration: range"
        );
        assert_eq!(
            AppError::Timeout("the controller configuration").to_string(),
            "Timed out waiting for the controller configuration."
        );
    }

    #[test]
    fn test_session_error_is_source() {
        let err: AppError = SessionError::NotConnected.into();
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "Not connected to a fan controller");
    }
}
