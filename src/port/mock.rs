//! Mock serial port implementation for testing.
//!
//! `MockSerialPort` replays scripted read chunks, records every physical call
//! in order and counts calls that overlapped another call in flight, which
//! lets tests prove the session never interleaves reads and writes.

use super::error::PortError;
use super::traits::{PortConfiguration, PortOpener, SerialPortAdapter};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// One physical call observed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortCall {
    /// A read that returned data (timeouts are not recorded).
    Read(Vec<u8>),
    Write(Vec<u8>),
    Close,
}

/// Inner state of the mock port, shared between clones.
#[derive(Debug)]
struct MockPortState {
    /// Chunks returned by successive reads, one chunk per call.
    read_queue: VecDeque<Vec<u8>>,
    calls: Vec<PortCall>,
    /// Error kind returned by the next read instead of data.
    read_failure: Option<ErrorKind>,
    /// Error kind returned by every write while set.
    write_failure: Option<ErrorKind>,
    /// How long an empty read blocks before timing out.
    timeout: Duration,
    close_count: usize,
}

/// Mock serial port implementation for testing.
///
/// Clones share state, so a test can keep one handle to script and inspect
/// the port while the session owns another.
///
/// # Example
/// ```
/// use fancontroller::port::{MockSerialPort, SerialPortAdapter};
///
/// let mut port = MockSerialPort::new("MOCK0");
/// port.enqueue_read(b"FCA\r\n");
///
/// let mut buffer = [0u8; 16];
/// let n = port.read_bytes(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], b"FCA\r\n");
///
/// port.write_bytes(b"FCQ\r\n").unwrap();
/// assert_eq!(port.written(), vec![b"FCQ\r\n".to_vec()]);
/// ```
#[derive(Clone)]
pub struct MockSerialPort {
    name: String,
    state: Arc<Mutex<MockPortState>>,
    in_flight: Arc<AtomicBool>,
    overlaps: Arc<AtomicUsize>,
}

impl MockSerialPort {
    /// Create a new mock serial port with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockPortState {
                read_queue: VecDeque::new(),
                calls: Vec::new(),
                read_failure: None,
                write_failure: None,
                timeout: Duration::from_millis(10),
                close_count: 0,
            })),
            in_flight: Arc::new(AtomicBool::new(false)),
            overlaps: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queue a chunk to be returned by one future read.
    pub fn enqueue_read(&self, data: &[u8]) {
        self.state.lock().read_queue.push_back(data.to_vec());
    }

    /// Make the next read fail with an I/O error of `kind`.
    pub fn fail_next_read(&self, kind: ErrorKind) {
        self.state.lock().read_failure = Some(kind);
    }

    /// Make writes fail with `kind` until cleared with `None`.
    pub fn set_write_failure(&self, kind: Option<ErrorKind>) {
        self.state.lock().write_failure = kind;
    }

    /// Set how long an empty read blocks before reporting a timeout.
    pub fn set_timeout(&self, timeout: Duration) {
        self.state.lock().timeout = timeout;
    }

    /// Every recorded call, in order.
    pub fn calls(&self) -> Vec<PortCall> {
        self.state.lock().calls.clone()
    }

    /// Payloads of all writes, in order.
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                PortCall::Write(data) => Some(data.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of `close` calls received.
    pub fn close_count(&self) -> usize {
        self.state.lock().close_count
    }

    /// Number of calls that started while another call was still running.
    pub fn overlap_count(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }

    /// Number of scripted chunks not yet read.
    pub fn pending_reads(&self) -> usize {
        self.state.lock().read_queue.len()
    }

    fn enter(&self) -> InFlight<'_> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        InFlight(&self.in_flight)
    }
}

struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SerialPortAdapter for MockSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let _call = self.enter();
        let mut state = self.state.lock();

        if let Some(kind) = state.write_failure {
            return Err(PortError::Io(std::io::Error::new(kind, "mock write failure")));
        }

        state.calls.push(PortCall::Write(data.to_vec()));
        Ok(data.len())
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let _call = self.enter();
        let (chunk, timeout) = {
            let mut state = self.state.lock();
            if let Some(kind) = state.read_failure.take() {
                return Err(PortError::Io(std::io::Error::new(kind, "mock read failure")));
            }
            (state.read_queue.pop_front(), state.timeout)
        };

        let Some(chunk) = chunk else {
            // Block like a real port would, outside the state lock.
            thread::sleep(timeout);
            return Err(PortError::Io(std::io::Error::new(
                ErrorKind::TimedOut,
                "No data available",
            )));
        };

        let n = chunk.len().min(buffer.len());
        buffer[..n].copy_from_slice(&chunk[..n]);

        let mut state = self.state.lock();
        if n < chunk.len() {
            state.read_queue.push_front(chunk[n..].to_vec());
        }
        state.calls.push(PortCall::Read(chunk[..n].to_vec()));
        Ok(n)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn close(&mut self) -> Result<(), PortError> {
        let _call = self.enter();
        let mut state = self.state.lock();
        state.close_count += 1;
        state.calls.push(PortCall::Close);
        Ok(())
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("pending_reads", &self.pending_reads())
            .finish()
    }
}

/// `PortOpener` handing out clones of one shared [`MockSerialPort`].
#[derive(Debug, Clone)]
pub struct MockPortOpener {
    port: MockSerialPort,
    fail_open: Arc<AtomicBool>,
    requests: Arc<Mutex<Vec<(String, PortConfiguration)>>>,
}

impl MockPortOpener {
    pub fn new(port: MockSerialPort) -> Self {
        Self {
            port,
            fail_open: Arc::new(AtomicBool::new(false)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Make subsequent opens fail as if the port did not exist.
    pub fn set_fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::SeqCst);
    }

    /// Names and configurations of all open attempts.
    pub fn requests(&self) -> Vec<(String, PortConfiguration)> {
        self.requests.lock().clone()
    }
}

impl PortOpener for MockPortOpener {
    fn open(
        &self,
        port_name: &str,
        config: &PortConfiguration,
    ) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        self.requests
            .lock()
            .push((port_name.to_string(), config.clone()));

        if self.fail_open.load(Ordering::SeqCst) {
            return Err(PortError::not_found(port_name));
        }

        let port = MockSerialPort {
            name: port_name.to_string(),
            ..self.port.clone()
        };
        port.set_timeout(config.read_timeout);
        Ok(Box::new(port))
    }
}
