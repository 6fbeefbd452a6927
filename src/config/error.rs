//! Errors from reading, writing or overriding `fancontroller.toml`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read settings from '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Cannot encode settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Saving failed; the remembered port list is lost for this run only.
    #[error("Cannot save settings to '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A `FANCONTROLLER_*` override did not parse.
    #[error("{var}: {message}")]
    InvalidEnv { var: String, message: String },

    /// Neither an explicit path nor a platform config directory is available.
    #[error("No location to store settings")]
    NoConfigPath,
}

impl ConfigError {
    pub fn invalid_env(var: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEnv {
            var: var.into(),
            message: message.into(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_error_names_variable() {
        let err = ConfigError::invalid_env("FANCONTROLLER_SERIAL_BAUD_RATE", "Invalid baud rate");
        assert_eq!(
            err.to_string(),
            "FANCONTROLLER_SERIAL_BAUD_RATE: Invalid baud rate"
        );
    }
}
