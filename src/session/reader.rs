//! Background read loop of a connected session.

use super::link::Link;
use super::{SessionError, Shared};
use crate::port::PortError;
use crate::protocol::{self, Frame, QUERY_COMMAND};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, trace};

pub(crate) struct ReadLoop {
    pub(crate) shared: Arc<Shared>,
    pub(crate) link: Arc<Link>,
    pub(crate) buffer_size: usize,
    pub(crate) idle_backoff: Duration,
}

impl ReadLoop {
    /// Poll the port until the link is stopped or a fatal read error occurs.
    pub(crate) fn run(self) {
        let mut buffer = vec![0u8; self.buffer_size];

        while !self.link.is_stopped() {
            match self.link.read(&mut buffer) {
                Ok(0) => thread::sleep(self.idle_backoff),
                Ok(n) => {
                    if self.shared.trace_wire {
                        debug!(
                            "{} <- {:?}",
                            self.link.name(),
                            String::from_utf8_lossy(&buffer[..n])
                        );
                    }
                    for frame in protocol::parse_all(&buffer[..n]) {
                        if self.link.is_stopped() {
                            break;
                        }
                        self.dispatch(frame);
                    }
                }
                Err(e) if e.is_timeout() => {}
                // Closed underneath us by `stop`.
                Err(PortError::NotOpen) => break,
                Err(e) => {
                    if self.link.is_stopped() {
                        break;
                    }
                    let err = SessionError::Read(e);
                    error!("Reading from {} failed: {}", self.link.name(), err);
                    self.shared.observer.on_read_error(&err);
                    self.shared.release(&self.link);
                    break;
                }
            }
        }

        debug!("Reader for {} exited", self.link.name());
    }

    fn dispatch(&self, frame: Frame) {
        let observer = &self.shared.observer;
        match frame {
            Frame::Status(status) => {
                if let Some(status) = self.shared.publish_status(&self.link, status) {
                    observer.on_status_updated(status);
                }
            }
            Frame::Config(config) => {
                if let Some(config) = self.shared.publish_config(&self.link, config) {
                    observer.on_config_updated(config);
                }
            }
            Frame::ApplyAck => {
                observer.on_apply_accepted();
                // The device does not echo what it stored; ask for it once.
                let _ = self.shared.send(&self.link, QUERY_COMMAND);
            }
            Frame::Error(message) => {
                if message.trim().is_empty() {
                    trace!("Ignoring blank error from {}", self.link.name());
                } else {
                    observer.on_apply_rejected(&message);
                }
            }
        }
    }
}
