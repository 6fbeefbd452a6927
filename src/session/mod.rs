//! Connection session: owns the port, performs the handshake and runs the
//! read loop.
//!
//! # Lifecycle
//!
//! ```text
//! Idle --connect--> Handshaking --status frame--> Connected
//!   ^                    |                            |
//!   +---- open error / timeout / stop ----------------+-- stop / read error
//! ```
//!
//! Nothing is retried automatically; after any failure the caller connects
//! again. Status and configuration snapshots are `Arc` values swapped whole,
//! so readers on other threads never observe a partially updated value.

mod error;
mod link;
pub mod observer;
mod reader;

pub use error::SessionError;
pub use observer::{ChannelObserver, NoopObserver, SessionEvent, SessionObserver};

use crate::config::SerialConfig;
use crate::port::{PortConfiguration, PortError, PortOpener, SystemPortOpener};
use crate::protocol::{self, Config, Frame, Status, QUERY_COMMAND};
use link::Link;
use parking_lot::{Mutex, RwLock};
use reader::ReadLoop;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default bound on the wait for the first status frame.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(3);

/// Default size of a single read.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 256;

/// Tunables fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub port: PortConfiguration,
    pub handshake_timeout: Duration,
    pub read_buffer_size: usize,
    /// Log raw inbound buffers and outbound commands at debug level.
    pub trace_wire: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            port: PortConfiguration::default(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            trace_wire: false,
        }
    }
}

impl From<&SerialConfig> for SessionOptions {
    fn from(config: &SerialConfig) -> Self {
        Self {
            port: PortConfiguration {
                baud_rate: config.baud_rate,
                read_timeout: config.read_timeout(),
            },
            handshake_timeout: config.handshake_timeout(),
            read_buffer_size: config.read_buffer_size.max(1),
            trace_wire: config.trace_wire,
        }
    }
}

/// Connection state as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Handshaking,
    Connected,
}

struct Current {
    link: Arc<Link>,
    state: SessionState,
}

/// State shared with the reader thread.
pub(crate) struct Shared {
    pub(crate) observer: Arc<dyn SessionObserver>,
    pub(crate) trace_wire: bool,
    current: Mutex<Option<Current>>,
    status: RwLock<Option<Arc<Status>>>,
    config: RwLock<Option<Arc<Config>>>,
}

impl Shared {
    fn is_current(current: &Option<Current>, link: &Arc<Link>) -> bool {
        current
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(&current.link, link))
    }

    /// Move `link` to `state` if it is still the session's link.
    fn transition(&self, link: &Arc<Link>, state: SessionState) -> bool {
        let mut current = self.current.lock();
        match current.as_mut() {
            Some(c) if Arc::ptr_eq(&c.link, link) && !link.is_stopped() => {
                c.state = state;
                true
            }
            _ => false,
        }
    }

    /// Close `link` and, if it is still current, return the session to idle
    /// and discard the snapshots.
    pub(crate) fn release(&self, link: &Arc<Link>) {
        link.close();
        let was_current = {
            let mut current = self.current.lock();
            if Self::is_current(&current, link) {
                *current = None;
                true
            } else {
                false
            }
        };
        if was_current {
            self.clear_snapshots();
            info!("Disconnected from {}", link.name());
        }
    }

    fn clear_snapshots(&self) {
        *self.status.write() = None;
        *self.config.write() = None;
    }

    /// Swap in a new status snapshot unless `link` has been superseded.
    pub(crate) fn publish_status(&self, link: &Arc<Link>, status: Status) -> Option<Arc<Status>> {
        let current = self.current.lock();
        if !Self::is_current(&current, link) || link.is_stopped() {
            return None;
        }
        let status = Arc::new(status);
        *self.status.write() = Some(Arc::clone(&status));
        Some(status)
    }

    /// Swap in a new configuration snapshot unless `link` has been superseded.
    pub(crate) fn publish_config(&self, link: &Arc<Link>, config: Config) -> Option<Arc<Config>> {
        let current = self.current.lock();
        if !Self::is_current(&current, link) || link.is_stopped() {
            return None;
        }
        let config = Arc::new(config);
        *self.config.write() = Some(Arc::clone(&config));
        Some(config)
    }

    /// Write one command; failures are reported to the observer.
    pub(crate) fn send(&self, link: &Link, command: &str) -> Result<(), SessionError> {
        if self.trace_wire {
            debug!("{} -> {:?}", link.name(), command);
        }
        link.write(command.as_bytes()).map_err(|e| {
            let err = SessionError::Write(e);
            // Closed by `stop` while the write was queued; not a link failure.
            if link.is_stopped() {
                debug!("Dropped write to {}: {}", link.name(), err);
            } else {
                warn!("Writing to {} failed: {}", link.name(), err);
                self.observer.on_connection_error(&err, false);
            }
            err
        })
    }
}

/// Session with one fan controller over one serial port.
///
/// All methods take `&self`; share the session behind an `Arc` to call
/// `apply_config`/`stop` from another thread while the reader runs.
pub struct Session {
    shared: Arc<Shared>,
    opener: Box<dyn PortOpener>,
    options: SessionOptions,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    pub fn new(
        opener: impl PortOpener + 'static,
        observer: Arc<dyn SessionObserver>,
        options: SessionOptions,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                observer,
                trace_wire: options.trace_wire,
                current: Mutex::new(None),
                status: RwLock::new(None),
                config: RwLock::new(None),
            }),
            opener: Box::new(opener),
            options,
            reader: Mutex::new(None),
        }
    }

    /// Session that opens real serial ports.
    pub fn with_system_ports(observer: Arc<dyn SessionObserver>, options: SessionOptions) -> Self {
        Self::new(SystemPortOpener, observer, options)
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn state(&self) -> SessionState {
        self.shared
            .current
            .lock()
            .as_ref()
            .map_or(SessionState::Idle, |current| current.state)
    }

    /// Name of the port the session is using, if any.
    pub fn port_name(&self) -> Option<String> {
        self.shared
            .current
            .lock()
            .as_ref()
            .map(|current| current.link.name().to_string())
    }

    /// Latest status snapshot.
    pub fn status(&self) -> Option<Arc<Status>> {
        self.shared.status.read().clone()
    }

    /// Latest configuration snapshot.
    pub fn config(&self) -> Option<Arc<Config>> {
        self.shared.config.read().clone()
    }

    /// Open `port_name`, wait for the controller's first status frame and
    /// start the read loop.
    ///
    /// Blocks for at most the handshake timeout plus one read timeout.
    /// Failures are also reported through
    /// [`SessionObserver::on_connection_error`] with `during_handshake` set.
    pub fn connect(&self, port_name: &str) -> Result<(), SessionError> {
        let link = {
            let mut current = self.shared.current.lock();
            if let Some(existing) = current.as_ref() {
                return Err(SessionError::AlreadyConnected(
                    existing.link.name().to_string(),
                ));
            }
            let link = Arc::new(Link::new(port_name));
            *current = Some(Current {
                link: Arc::clone(&link),
                state: SessionState::Handshaking,
            });
            link
        };
        self.join_reader();

        match self.establish(&link) {
            Ok(()) => {
                info!("Connected to fan controller on {}", port_name);
                Ok(())
            }
            Err(err) => {
                self.shared.release(&link);
                if matches!(err, SessionError::Cancelled(_)) {
                    debug!("{}", err);
                } else {
                    warn!("Connecting to {} failed: {}", port_name, err);
                    self.shared.observer.on_connection_error(&err, true);
                }
                Err(err)
            }
        }
    }

    fn establish(&self, link: &Arc<Link>) -> Result<(), SessionError> {
        let name = link.name().to_string();
        let port = self
            .opener
            .open(&name, &self.options.port)
            .map_err(|source| SessionError::Open {
                port: name.clone(),
                source,
            })?;
        if let Err(mut port) = link.attach(port) {
            let _ = port.close();
            return Err(SessionError::Cancelled(name));
        }
        debug!(
            "Opened {} at {} baud, waiting for status",
            name, self.options.port.baud_rate
        );

        let status = self.handshake(link)?;
        let status = self
            .shared
            .publish_status(link, status)
            .ok_or_else(|| SessionError::Cancelled(name.clone()))?;
        if !self.shared.transition(link, SessionState::Connected) {
            return Err(SessionError::Cancelled(name));
        }

        let observer = &self.shared.observer;
        observer.on_status_updated(status);
        observer.on_config_updated(self.config().unwrap_or_default());

        // A callback above, or another thread, may have stopped the session.
        if link.is_stopped() {
            return Err(SessionError::Cancelled(name));
        }

        // Failure is reported by `send`; the link stays up and the next
        // acknowledged apply asks again.
        let _ = self.shared.send(link, QUERY_COMMAND);
        if link.is_stopped() {
            return Err(SessionError::Cancelled(name));
        }

        let reader = ReadLoop {
            shared: Arc::clone(&self.shared),
            link: Arc::clone(link),
            buffer_size: self.options.read_buffer_size,
            idle_backoff: self.options.port.read_timeout,
        };
        let handle = thread::Builder::new()
            .name(format!("fan-reader-{name}"))
            .spawn(move || reader.run())
            .map_err(SessionError::Spawn)?;
        *self.reader.lock() = Some(handle);

        if link.is_stopped() {
            return Err(SessionError::Cancelled(name));
        }
        Ok(())
    }

    /// Read until a status frame arrives or the handshake budget runs out.
    fn handshake(&self, link: &Link) -> Result<Status, SessionError> {
        let budget = self.options.handshake_timeout;
        let started = Instant::now();
        let mut buffer = vec![0u8; self.options.read_buffer_size];

        while started.elapsed() <= budget {
            if link.is_stopped() {
                return Err(SessionError::Cancelled(link.name().to_string()));
            }
            match link.read(&mut buffer) {
                Ok(0) => thread::sleep(self.options.port.read_timeout),
                Ok(n) => {
                    if self.shared.trace_wire {
                        debug!(
                            "{} <- {:?}",
                            link.name(),
                            String::from_utf8_lossy(&buffer[..n])
                        );
                    }
                    let latest = protocol::parse_all(&buffer[..n])
                        .into_iter()
                        .filter_map(|frame| match frame {
                            Frame::Status(status) => Some(status),
                            _ => None,
                        })
                        .last();
                    if let Some(status) = latest {
                        return Ok(status);
                    }
                }
                Err(e) if e.is_timeout() => {}
                Err(PortError::NotOpen) => {
                    return Err(SessionError::Cancelled(link.name().to_string()))
                }
                Err(e) => return Err(SessionError::Handshake(e)),
            }
        }

        Err(SessionError::HandshakeTimeout(budget))
    }

    /// Send `config` to the device.
    ///
    /// Success means the command was written; the device answers later with
    /// an acceptance or rejection notification.
    pub fn apply_config(&self, config: &Config) -> Result<(), SessionError> {
        let link = self.connected_link()?;
        self.shared.send(&link, &protocol::encode(config))
    }

    /// Ask the device to report its configuration.
    pub fn query_config(&self) -> Result<(), SessionError> {
        let link = self.connected_link()?;
        self.shared.send(&link, QUERY_COMMAND)
    }

    /// Stop the read loop, discard snapshots and close the port.
    ///
    /// Idempotent. Waits for the reader thread unless called from it.
    pub fn stop(&self) {
        let current = self.shared.current.lock().take();
        if let Some(current) = current {
            current.link.close();
            info!("Disconnected from {}", current.link.name());
        }
        self.shared.clear_snapshots();
        self.join_reader();
    }

    fn connected_link(&self) -> Result<Arc<Link>, SessionError> {
        match self.shared.current.lock().as_ref() {
            Some(current) if current.state == SessionState::Connected => {
                Ok(Arc::clone(&current.link))
            }
            _ => Err(SessionError::NotConnected),
        }
    }

    fn join_reader(&self) {
        let handle = self.reader.lock().take();
        if let Some(handle) = handle {
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                warn!("Serial reader thread panicked");
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .field("port", &self.port_name())
            .finish()
    }
}
