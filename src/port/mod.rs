//! Port abstraction layer for serial communication.
//!
//! The session only sees the [`PortOpener`] and [`SerialPortAdapter`]
//! capabilities, so it runs the same against hardware and the in-memory mock.

pub mod error;
pub mod mock;
pub mod sync_port;
pub mod traits;

pub use error::PortError;
pub use mock::{MockPortOpener, MockSerialPort, PortCall};
pub use sync_port::{SyncSerialPort, SystemPortOpener};
pub use traits::*;
