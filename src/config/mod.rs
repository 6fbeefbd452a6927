//! Application configuration.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! Configuration is loaded from the following locations (in order of priority):
//!
//! 1. `FANCONTROLLER_CONFIG` environment variable (explicit path)
//! 2. `./fancontroller.toml` (current directory)
//! 3. `fancontroller.toml` in the platform config directory
//! 4. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! Serial and logging values can be overridden via environment variables
//! following the pattern `FANCONTROLLER_<SECTION>_<KEY>`, e.g.
//! `FANCONTROLLER_SERIAL_HANDSHAKE_TIMEOUT_MS=5000`.
//!
//! # Example
//!
//! ```rust,no_run
//! use fancontroller::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load()?;
//! println!("Last port: {:?}", loader.config().last_port());
//! # Ok::<(), fancontroller::config::ConfigError>(())
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    get_default_config_path, resolve_config_path, ConfigLoader, CONFIG_FILE_NAME, CONFIG_PATH_ENV,
};
pub use schema::{
    AppConfig, LogFormat, LoggingConfig, SerialConfig, DEFAULT_MAX_RPM, DEFAULT_MAX_TEMP,
};
