//! Fan controller link library
//!
//! Talks to a four-channel fan-controller board over a serial port using its
//! ASCII line protocol, keeps the latest status and configuration snapshots
//! and pushes new configurations to the device.
//!
//! # Modules
//!
//! - `protocol`: data model and the line codec (`FCD`/`FCR`/`FCA`/`ERR` in, `FCQ`/`FCS` out)
//! - `port`: port capability traits with `serialport` and in-memory implementations
//! - `session`: connection state machine, handshake and background read loop
//! - `config`: application configuration with TOML support
//! - `logging`: `tracing` subscriber setup
//! - `error`: top-level error for the command-line front-end

pub mod config;
pub mod error;
pub mod logging;
pub mod port;
pub mod protocol;
pub mod session;

// Re-export commonly used types for convenience
pub use config::{AppConfig, ConfigError, ConfigLoader, ConfigResult};
pub use error::AppError;
pub use port::{
    MockPortOpener, MockSerialPort, PortConfiguration, PortError, PortOpener, SerialPortAdapter,
    SyncSerialPort, SystemPortOpener,
};
pub use protocol::{Config, FanConfig, Frame, Status};
pub use session::{
    ChannelObserver, Session, SessionError, SessionEvent, SessionObserver, SessionOptions,
    SessionState,
};
