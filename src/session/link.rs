//! One connection's port handle and stop flag.

use crate::port::{PortError, SerialPortAdapter};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// The I/O lock wraps exactly one physical call, so a write waits at most one
/// read timeout and `close` never races an in-flight read or write.
#[derive(Debug)]
pub(crate) struct Link {
    name: String,
    port: Mutex<Option<Box<dyn SerialPortAdapter>>>,
    stop: AtomicBool,
}

impl Link {
    /// A link reserved for `name`; the port is attached once opened.
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            port: Mutex::new(None),
            stop: AtomicBool::new(false),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Hand the opened port to the link. Returns it back if the link was
    /// stopped in the meantime.
    pub(crate) fn attach(
        &self,
        port: Box<dyn SerialPortAdapter>,
    ) -> Result<(), Box<dyn SerialPortAdapter>> {
        let mut slot = self.port.lock();
        if self.is_stopped() {
            return Err(port);
        }
        *slot = Some(port);
        Ok(())
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub(crate) fn read(&self, buffer: &mut [u8]) -> Result<usize, PortError> {
        match self.port.lock().as_mut() {
            Some(port) => port.read_bytes(buffer),
            None => Err(PortError::NotOpen),
        }
    }

    pub(crate) fn write(&self, data: &[u8]) -> Result<(), PortError> {
        match self.port.lock().as_mut() {
            Some(port) => port.write_all(data),
            None => Err(PortError::NotOpen),
        }
    }

    /// Raise the stop flag and close the port. Safe to call repeatedly; the
    /// port is closed once.
    pub(crate) fn close(&self) {
        self.stop.store(true, Ordering::SeqCst);
        let mut slot = self.port.lock();
        if let Some(mut port) = slot.take() {
            if let Err(e) = port.close() {
                tracing::warn!("Closing {} failed: {}", self.name, e);
            }
        }
    }
}
