//! Shared test utilities for fan controller tests.
//!
//! This module provides common test infrastructure including:
//! - Wire fixtures for status and configuration records
//! - A recording observer that captures session notifications
//! - Polling helpers for conditions reached on the reader thread

#![allow(dead_code)]

use fancontroller::port::{MockPortOpener, MockSerialPort, PortConfiguration};
use fancontroller::protocol::{Config, Status};
use fancontroller::session::{Session, SessionError, SessionEvent, SessionObserver, SessionOptions};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Status record: temperatures 30/31/0/0, outputs 40/50/60/70, some RPMs.
pub const STATUS_LINE: &[u8] = b"FCD,30,31,0,0,40,50,60,70,900,0,1000,0,1100,0,1200,0\r\n";

/// A second status record with different readings.
pub const STATUS_LINE_2: &[u8] = b"FCD,35,36,0,0,45,55,65,75,950,0,1050,0,1150,0,1250,0\r\n";

/// Configuration record: sensors A and B in Celsius, fan 1 driven by A.
pub const CONFIG_LINE: &[u8] = b"FCR,1,1,0,0,\
20,0,25,60,0,5,0,\
30,1,25,65,1,5,0,\
0,7,0,0,0,0,0,\
0,7,0,0,0,0,0\r\n";

pub const ACK_LINE: &[u8] = b"FCA\r\n";

/// Poll interval used by [`wait_until`].
const POLL: Duration = Duration::from_millis(5);

/// Options tuned for tests: short read timeout, short handshake budget.
pub fn fast_options() -> SessionOptions {
    SessionOptions {
        port: PortConfiguration {
            read_timeout: Duration::from_millis(5),
            ..PortConfiguration::default()
        },
        handshake_timeout: Duration::from_millis(300),
        ..SessionOptions::default()
    }
}

/// Create a mock serial port with pre-programmed read chunks.
///
/// # Example
/// ```ignore
/// let mock = create_mock_port_with_responses("MOCK0", vec![STATUS_LINE, ACK_LINE]);
/// ```
pub fn create_mock_port_with_responses(port_name: &str, responses: Vec<&[u8]>) -> MockSerialPort {
    let mock = MockSerialPort::new(port_name);
    mock.set_timeout(Duration::from_millis(5));
    for response in responses {
        mock.enqueue_read(response);
    }
    mock
}

/// Build a session over `port` that records its notifications.
pub fn recording_session(port: &MockSerialPort) -> (Session, Arc<RecordingObserver>) {
    let observer = Arc::new(RecordingObserver::default());
    let session = Session::new(
        MockPortOpener::new(port.clone()),
        Arc::clone(&observer) as Arc<dyn SessionObserver>,
        fast_options(),
    );
    (session, observer)
}

/// Observer that keeps every notification for later inspection.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<SessionEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self, predicate: impl Fn(&SessionEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|event| predicate(event)).count()
    }

    /// Status snapshots in notification order.
    pub fn statuses(&self) -> Vec<Arc<Status>> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                SessionEvent::StatusUpdated(status) => Some(Arc::clone(status)),
                _ => None,
            })
            .collect()
    }

    /// Configuration snapshots in notification order.
    pub fn configs(&self) -> Vec<Arc<Config>> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                SessionEvent::ConfigUpdated(config) => Some(Arc::clone(config)),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: SessionEvent) {
        self.events.lock().push(event);
    }
}

impl SessionObserver for RecordingObserver {
    fn on_status_updated(&self, status: Arc<Status>) {
        self.push(SessionEvent::StatusUpdated(status));
    }

    fn on_config_updated(&self, config: Arc<Config>) {
        self.push(SessionEvent::ConfigUpdated(config));
    }

    fn on_apply_accepted(&self) {
        self.push(SessionEvent::ApplyAccepted);
    }

    fn on_apply_rejected(&self, message: &str) {
        self.push(SessionEvent::ApplyRejected(message.to_string()));
    }

    fn on_connection_error(&self, error: &SessionError, during_handshake: bool) {
        self.push(SessionEvent::ConnectionError {
            message: error.to_string(),
            during_handshake,
        });
    }

    fn on_read_error(&self, error: &SessionError) {
        self.push(SessionEvent::ReadError(error.to_string()));
    }
}

/// Poll `condition` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(POLL);
    }
}
