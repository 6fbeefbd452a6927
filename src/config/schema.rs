//! Configuration schema definitions.
//!
//! Structure of `fancontroller.toml`. Every section has defaults, so an empty
//! or partial file is valid.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default full-scale temperature for display scaling, in degrees.
pub const DEFAULT_MAX_TEMP: i32 = 150;

/// Default full-scale fan speed for display scaling, in RPM.
pub const DEFAULT_MAX_RPM: i32 = 3000;

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Ports that connected successfully, most recent first.
    pub ports: Vec<String>,
    /// Temperature shown as 100% in the status view.
    pub max_temp: i32,
    /// Fan speed shown as 100% in the status view.
    pub max_rpm: i32,
    /// Serial link settings
    pub serial: SerialConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ports: Vec::new(),
            max_temp: DEFAULT_MAX_TEMP,
            max_rpm: DEFAULT_MAX_RPM,
            serial: SerialConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Port used most recently, if any.
    pub fn last_port(&self) -> Option<&str> {
        self.ports.first().map(String::as_str)
    }

    /// Move `port` to the front of the known-port list.
    ///
    /// Returns `true` when the list changed.
    pub fn remember_port(&mut self, port: &str) -> bool {
        if self.last_port() == Some(port) {
            return false;
        }
        self.ports.retain(|known| known != port);
        self.ports.insert(0, port.to_string());
        true
    }

    /// Temperature as a percentage of `max_temp`, capped at 100.
    pub fn temperature_percent(&self, temperature: i8) -> u8 {
        percent_of(i32::from(temperature), self.max_temp)
    }

    /// Fan speed as a percentage of `max_rpm`, capped at 100.
    pub fn rpm_percent(&self, rpm: i16) -> u8 {
        percent_of(i32::from(rpm), self.max_rpm)
    }
}

fn percent_of(value: i32, full_scale: i32) -> u8 {
    if full_scale <= 0 || value <= 0 {
        return 0;
    }
    (i64::from(value) * 100 / i64::from(full_scale)).min(100) as u8
}

/// Serial link section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Baud rate of the controller firmware
    pub baud_rate: u32,
    /// Timeout of a single read in milliseconds
    pub read_timeout_ms: u64,
    /// Time allowed for the first status frame in milliseconds
    pub handshake_timeout_ms: u64,
    /// Bytes requested per read
    pub read_buffer_size: usize,
    /// Log raw protocol traffic at debug level
    pub trace_wire: bool,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            read_timeout_ms: 100,
            handshake_timeout_ms: 3000,
            read_buffer_size: 256,
            trace_wire: false,
        }
    }
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset: "trace" .. "error"
    pub level: String,
    /// Log format: "json", "pretty", "compact"
    pub format: LogFormat,
    /// Append logs to this file instead of stderr
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            file: None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Multi-line human readable format
    Pretty,
    /// Single-line format
    #[default]
    Compact,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.max_temp, 150);
        assert_eq!(config.max_rpm, 3000);
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.serial.read_timeout(), Duration::from_millis(100));
        assert_eq!(config.serial.handshake_timeout(), Duration::from_secs(3));
        assert!(config.ports.is_empty());
    }

    #[test]
    fn test_remember_port_moves_to_front() {
        let mut config = AppConfig {
            ports: vec!["COM1".into(), "COM3".into(), "COM4".into()],
            ..AppConfig::default()
        };

        assert!(config.remember_port("COM3"));
        assert_eq!(config.ports, vec!["COM3", "COM1", "COM4"]);

        assert!(!config.remember_port("COM3"));

        assert!(config.remember_port("/dev/ttyUSB0"));
        assert_eq!(config.last_port(), Some("/dev/ttyUSB0"));
        assert_eq!(config.ports.len(), 4);
    }

    #[test]
    fn test_display_scaling() {
        let config = AppConfig::default();
        assert_eq!(config.temperature_percent(75), 50);
        assert_eq!(config.temperature_percent(-20), 0);
        assert_eq!(config.rpm_percent(1500), 50);
        assert_eq!(config.rpm_percent(4500), 100);

        let broken = AppConfig {
            max_rpm: 0,
            ..AppConfig::default()
        };
        assert_eq!(broken.rpm_percent(1000), 0);
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[serial]"));
        assert!(toml_str.contains("[logging]"));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            ports = ["COM5"]
            max_rpm = 2000

            [serial]
            trace_wire = true
        "#;

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.ports, vec!["COM5"]);
        assert_eq!(config.max_rpm, 2000);
        assert!(config.serial.trace_wire);
        // Defaults should still work
        assert_eq!(config.max_temp, 150);
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.logging.format, LogFormat::Compact);
    }
}
