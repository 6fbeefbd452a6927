//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::{AppConfig, LogFormat};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "FANCONTROLLER";

/// Config file name
pub const CONFIG_FILE_NAME: &str = "fancontroller.toml";

/// Environment variable for explicit config path
pub const CONFIG_PATH_ENV: &str = "FANCONTROLLER_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: AppConfig,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `FANCONTROLLER_CONFIG` environment variable (explicit path)
    /// 2. `./fancontroller.toml` (current directory)
    /// 3. the platform config directory (`~/.config/fancontroller/` etc.)
    /// 4. Built-in defaults (no file required)
    ///
    /// Environment variables can override any config file values.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = match config_path {
            Some(ref path) => load_from_file(path)?,
            None => AppConfig::default(),
        };

        apply_env_overrides(&mut config)?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a specific file path.
    ///
    /// A missing file yields defaults; the path is still used by `save`.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut config = if path.exists() {
            load_from_file(&path)?
        } else {
            AppConfig::default()
        };
        apply_env_overrides(&mut config)?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file).
    pub fn with_defaults() -> Self {
        let mut config = AppConfig::default();
        // Still apply env overrides even with defaults
        if let Err(e) = apply_env_overrides(&mut config) {
            tracing::warn!("Ignoring environment override: {}", e);
        }

        Self {
            config_path: None,
            config,
        }
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Get a mutable reference to the configuration.
    pub fn config_mut(&mut self) -> &mut AppConfig {
        &mut self.config
    }

    /// Where `save` writes: the loaded file, else the platform default.
    pub fn target_path(&self) -> Option<PathBuf> {
        self.config_path.clone().or_else(get_default_config_path)
    }

    /// Save the current configuration.
    pub fn save(&self) -> ConfigResult<PathBuf> {
        let path = self.target_path().ok_or(ConfigError::NoConfigPath)?;
        save_to_file(&self.config, &path)?;
        Ok(path)
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    // 1. Explicit environment variable
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. Current directory
    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    // 3. Platform config directory
    get_default_config_path().filter(|path| path.exists())
}

/// Get the default config file path for creating new config files.
pub fn get_default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "fancontroller").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(ConfigError::Parse)
}

/// Save configuration to a file.
fn save_to_file(config: &AppConfig, path: &Path) -> ConfigResult<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::Write {
        path: path.to_path_buf(),
        source: e,
    })
}

fn env_value<T: FromStr>(key: &str, what: &str) -> ConfigResult<Option<T>> {
    let var = format!("{ENV_PREFIX}_{key}");
    match std::env::var(&var) {
        Ok(val) => val
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::invalid_env(var, what)),
        Err(_) => Ok(None),
    }
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `FANCONTROLLER_<SECTION>_<KEY>`
/// For example:
/// - `FANCONTROLLER_SERIAL_BAUD_RATE=19200`
/// - `FANCONTROLLER_SERIAL_TRACE_WIRE=true`
/// - `FANCONTROLLER_LOGGING_LEVEL=debug`
fn apply_env_overrides(config: &mut AppConfig) -> ConfigResult<()> {
    if let Some(val) = env_value("SERIAL_BAUD_RATE", "Invalid baud rate")? {
        config.serial.baud_rate = val;
    }
    if let Some(val) = env_value("SERIAL_READ_TIMEOUT_MS", "Invalid timeout")? {
        config.serial.read_timeout_ms = val;
    }
    if let Some(val) = env_value("SERIAL_HANDSHAKE_TIMEOUT_MS", "Invalid timeout")? {
        config.serial.handshake_timeout_ms = val;
    }
    if let Some(val) = env_value::<String>("SERIAL_TRACE_WIRE", "Invalid flag")? {
        config.serial.trace_wire = val.eq_ignore_ascii_case("true") || val == "1";
    }

    if let Some(val) = env_value("LOGGING_LEVEL", "Invalid level")? {
        config.logging.level = val;
    }
    if let Some(val) = env_value::<String>("LOGGING_FORMAT", "Invalid format")? {
        config.logging.format = match val.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            "compact" => LogFormat::Compact,
            _ => {
                return Err(ConfigError::invalid_env(
                    format!("{ENV_PREFIX}_LOGGING_FORMAT"),
                    "Expected json, pretty or compact",
                ))
            }
        };
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    #[serial]
    fn test_default_loader() {
        let loader = ConfigLoader::with_defaults();
        assert_eq!(loader.config().serial.baud_rate, 9600);
        assert!(loader.config_path.is_none());
    }

    #[test]
    #[serial]
    fn test_env_override() {
        env::set_var("FANCONTROLLER_SERIAL_BAUD_RATE", "19200");
        env::set_var("FANCONTROLLER_LOGGING_FORMAT", "json");

        let loader = ConfigLoader::with_defaults();
        assert_eq!(loader.config().serial.baud_rate, 19200);
        assert_eq!(loader.config().logging.format, LogFormat::Json);

        env::remove_var("FANCONTROLLER_SERIAL_BAUD_RATE");
        env::remove_var("FANCONTROLLER_LOGGING_FORMAT");
    }

    #[test]
    #[serial]
    fn test_invalid_env_override_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        env::set_var("FANCONTROLLER_SERIAL_READ_TIMEOUT_MS", "soon");

        let result = ConfigLoader::load_from(dir.path().join(CONFIG_FILE_NAME));
        env::remove_var("FANCONTROLLER_SERIAL_READ_TIMEOUT_MS");

        assert!(matches!(result, Err(ConfigError::InvalidEnv { .. })));
    }

    #[test]
    #[serial]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let mut loader = ConfigLoader::load_from(&path).unwrap();
        assert_eq!(loader.config(), &AppConfig::default());

        loader.config_mut().remember_port("COM6");
        loader.config_mut().max_temp = 90;
        assert_eq!(loader.save().unwrap(), path);

        let reloaded = ConfigLoader::load_from(&path).unwrap();
        assert_eq!(reloaded.config().ports, vec!["COM6"]);
        assert_eq!(reloaded.config().max_temp, 90);
    }

    #[test]
    #[serial]
    fn test_explicit_path_env_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "max_rpm = 1234\n").unwrap();
        env::set_var(CONFIG_PATH_ENV, &path);

        let loader = ConfigLoader::load();
        env::remove_var(CONFIG_PATH_ENV);

        let loader = loader.unwrap();
        assert_eq!(loader.config_path.as_deref(), Some(path.as_path()));
        assert_eq!(loader.config().max_rpm, 1234);
    }

    #[test]
    #[serial]
    fn test_malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "max_rpm = \"fast\"\n").unwrap();

        assert!(matches!(
            ConfigLoader::load_from(&path),
            Err(ConfigError::Parse(_))
        ));
    }
}
