//! Notification surface between the session and its front-end.

use super::error::SessionError;
use crate::protocol::{Config, Status};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Receives session notifications.
///
/// Callbacks run on the thread that produced them (the caller of `connect`
/// or the reader thread) and must not block for long. Calling back into the
/// session from a callback is allowed.
pub trait SessionObserver: Send + Sync {
    /// A new status snapshot is available.
    fn on_status_updated(&self, _status: Arc<Status>) {}

    /// A new configuration snapshot is available.
    fn on_config_updated(&self, _config: Arc<Config>) {}

    /// The device accepted the last applied configuration.
    fn on_apply_accepted(&self) {}

    /// The device rejected a command; `message` is never blank.
    fn on_apply_rejected(&self, _message: &str) {}

    /// Connecting failed, or a command could not be written while connected.
    fn on_connection_error(&self, _error: &SessionError, _during_handshake: bool) {}

    /// The read loop hit a fatal error; the session is back to idle.
    fn on_read_error(&self, _error: &SessionError) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

/// Notifications as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    StatusUpdated(Arc<Status>),
    ConfigUpdated(Arc<Config>),
    ApplyAccepted,
    ApplyRejected(String),
    ConnectionError {
        message: String,
        during_handshake: bool,
    },
    ReadError(String),
}

/// Forwards notifications into a tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: UnboundedSender<SessionEvent>,
}

impl ChannelObserver {
    pub fn new(tx: UnboundedSender<SessionEvent>) -> Self {
        Self { tx }
    }

    /// Create an observer together with the receiving end of its channel.
    pub fn channel() -> (Self, UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    fn forward(&self, event: SessionEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("Session event dropped, receiver is gone");
        }
    }
}

impl SessionObserver for ChannelObserver {
    fn on_status_updated(&self, status: Arc<Status>) {
        self.forward(SessionEvent::StatusUpdated(status));
    }

    fn on_config_updated(&self, config: Arc<Config>) {
        self.forward(SessionEvent::ConfigUpdated(config));
    }

    fn on_apply_accepted(&self) {
        self.forward(SessionEvent::ApplyAccepted);
    }

    fn on_apply_rejected(&self, message: &str) {
        self.forward(SessionEvent::ApplyRejected(message.to_string()));
    }

    fn on_connection_error(&self, error: &SessionError, during_handshake: bool) {
        self.forward(SessionEvent::ConnectionError {
            message: error.to_string(),
            during_handshake,
        });
    }

    fn on_read_error(&self, error: &SessionError) {
        self.forward(SessionEvent::ReadError(error.to_string()));
    }
}
