//! Mock serial port implementation for testing.
//!
//! Provides a [`MockSerialPort`] that simulates a ZNP dongle without
//! hardware, and a [`MockPortProvider`] that hands it out by name. Every
//! call the transport makes is recorded as a [`PortEvent`] so tests can
//! assert ordering, and individual steps can be made to fail with
//! [`MockFailure`].

use super::error::PortError;
use super::reader::{PolledReader, ReadControl};
use super::traits::{
    DataListener, HardwarePort, LinkSettings, PortProvider, PortReader, PortWriter, TimedRead,
};
use super::watcher::DataWatcher;
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, HashSet, VecDeque};
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Something the transport did to the port, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortEvent {
    Acquired,
    Configured(LinkSettings),
    ReceiveThreshold(usize),
    ReceiveTimeout(Duration),
    ListenerRegistered,
    ReaderAcquired,
    WriterAcquired,
    Write(Vec<u8>),
    Flush,
    ReaderDropped,
    WriterDropped,
    Closed,
}

/// A step that can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockFailure {
    /// Another process holds the port.
    Busy,
    /// `configure_link` rejects the parameters.
    RejectLink,
    /// `set_receive_threshold` rejects the threshold.
    RejectThreshold,
    /// `set_receive_timeout` rejects the timeout.
    RejectTimeout,
    /// `register_listener` fails.
    Listener,
    /// `reader` fails.
    Reader,
    /// `writer` fails.
    Writer,
    /// Writes to the output stream fail.
    Write,
    /// Flushing the output stream fails.
    Flush,
    /// Reads from the input stream fail.
    Read,
    /// `close` fails.
    Close,
}

#[derive(Debug, Default)]
struct MockPortState {
    /// Queue of bytes to be returned by read operations.
    read_queue: VecDeque<u8>,
    /// Every write, one entry per call.
    write_log: Vec<Vec<u8>>,
    events: Vec<PortEvent>,
    failures: HashSet<MockFailure>,
    link: Option<LinkSettings>,
    watcher: Option<DataWatcher>,
    listener_registered: bool,
    /// Acquired and not yet closed.
    held: bool,
    acquire_count: usize,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<MockPortState>,
    data: Condvar,
    control: Arc<ReadControl>,
}

/// Mock serial port implementation for testing.
///
/// Clones share state: keep one clone in the test and register another with
/// a [`MockPortProvider`].
///
/// # Example
/// ```
/// use znp_transport::port::{MockSerialPort, MockPortProvider, PortProvider, HardwarePort};
/// use std::io::{Read, Write};
/// use std::time::Duration;
///
/// let mock = MockSerialPort::new("/dev/ttyMOCK0");
/// let provider = MockPortProvider::new();
/// provider.insert(mock.clone());
///
/// let mut port = provider.open("/dev/ttyMOCK0", Duration::from_millis(10)).unwrap();
/// port.writer().unwrap().write_all(&[0xEF]).unwrap();
/// assert_eq!(mock.written(), vec![0xEF]);
///
/// mock.enqueue_read(&[0xFE, 0x00]);
/// let mut buf = [0u8; 8];
/// let n = port.reader().unwrap().read(&mut buf).unwrap();
/// assert_eq!(&buf[..n], &[0xFE, 0x00]);
/// ```
#[derive(Clone)]
pub struct MockSerialPort {
    /// The port name/identifier.
    name: String,
    shared: Arc<Shared>,
    poll_interval: Duration,
}

impl MockSerialPort {
    /// Create a new mock serial port with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shared: Arc::new(Shared {
                state: Mutex::new(MockPortState::default()),
                data: Condvar::new(),
                control: Arc::new(ReadControl::default()),
            }),
            poll_interval: Duration::from_millis(5),
        }
    }

    /// Interval at which the mock's watcher checks for queued input.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn port_name(&self) -> &str {
        &self.name
    }

    /// Enqueue bytes to be returned by subsequent reads, waking any reader
    /// blocked on the port.
    pub fn enqueue_read(&self, data: &[u8]) {
        let mut state = self.shared.state.lock();
        state.read_queue.extend(data);
        self.shared.data.notify_all();
    }

    /// Make `failure` happen from now on.
    pub fn fail(&self, failure: MockFailure) {
        self.shared.state.lock().failures.insert(failure);
    }

    /// Stop `failure` from happening.
    pub fn heal(&self, failure: MockFailure) {
        self.shared.state.lock().failures.remove(&failure);
    }

    /// All bytes written so far, concatenated.
    pub fn written(&self) -> Vec<u8> {
        self.shared.state.lock().write_log.concat()
    }

    /// Get a copy of all data written to the port, one entry per write.
    pub fn get_write_log(&self) -> Vec<Vec<u8>> {
        self.shared.state.lock().write_log.clone()
    }

    /// Everything the transport did to the port, in order.
    pub fn events(&self) -> Vec<PortEvent> {
        self.shared.state.lock().events.clone()
    }

    /// Forget recorded events and writes.
    pub fn clear_history(&self) {
        let mut state = self.shared.state.lock();
        state.events.clear();
        state.write_log.clear();
    }

    /// Link settings applied by the last `configure_link`.
    pub fn link_settings(&self) -> Option<LinkSettings> {
        self.shared.state.lock().link
    }

    pub fn receive_timeout(&self) -> Duration {
        self.shared.control.timeout()
    }

    pub fn receive_threshold(&self) -> usize {
        self.shared.control.threshold()
    }

    /// Whether the port is acquired and not yet closed.
    pub fn is_held(&self) -> bool {
        self.shared.state.lock().held
    }

    /// Number of successful acquisitions.
    pub fn acquire_count(&self) -> usize {
        self.shared.state.lock().acquire_count
    }

    pub fn listener_registered(&self) -> bool {
        self.shared.state.lock().listener_registered
    }

    /// Get the number of bytes available to read.
    pub fn available_bytes(&self) -> usize {
        self.shared.state.lock().read_queue.len()
    }

    fn fails(&self, failure: MockFailure) -> bool {
        self.shared.state.lock().failures.contains(&failure)
    }

    fn record(&self, event: PortEvent) {
        self.shared.state.lock().events.push(event);
    }

    /// Attempt to take exclusive hold of the port.
    fn acquire(&self) -> Result<(), PortError> {
        let mut state = self.shared.state.lock();
        if state.held || state.failures.contains(&MockFailure::Busy) {
            return Err(PortError::busy(&self.name));
        }
        state.held = true;
        state.acquire_count += 1;
        state.listener_registered = false;
        state.events.push(PortEvent::Acquired);
        Ok(())
    }
}

impl HardwarePort for MockSerialPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn configure_link(&mut self, link: &LinkSettings) -> Result<(), PortError> {
        if self.fails(MockFailure::RejectLink) {
            return Err(PortError::unsupported(format!(
                "{} baud rejected by mock driver",
                link.baud_rate
            )));
        }
        let mut state = self.shared.state.lock();
        state.link = Some(*link);
        state.events.push(PortEvent::Configured(*link));
        Ok(())
    }

    fn set_receive_threshold(&mut self, bytes: usize) -> Result<(), PortError> {
        if self.fails(MockFailure::RejectThreshold) {
            return Err(PortError::unsupported("receive threshold rejected"));
        }
        self.shared.control.set_threshold(bytes);
        self.record(PortEvent::ReceiveThreshold(bytes));
        Ok(())
    }

    fn set_receive_timeout(&mut self, timeout: Duration) -> Result<(), PortError> {
        if self.fails(MockFailure::RejectTimeout) {
            return Err(PortError::unsupported("receive timeout rejected"));
        }
        self.shared.control.set_timeout(timeout);
        self.record(PortEvent::ReceiveTimeout(timeout));
        // Wake blocked readers so they observe the new timeout at once.
        self.shared.data.notify_all();
        Ok(())
    }

    fn register_listener(&mut self, listener: Arc<dyn DataListener>) -> Result<(), PortError> {
        {
            let state = self.shared.state.lock();
            if state.failures.contains(&MockFailure::Listener) {
                return Err(PortError::listener("too many listeners"));
            }
            if state.listener_registered {
                return Err(PortError::listener("a data listener is already registered"));
            }
        }

        let shared = Arc::clone(&self.shared);
        let watcher = DataWatcher::spawn(
            &self.name,
            move || Ok(shared.state.lock().read_queue.len()),
            listener,
            self.poll_interval,
        )?;

        let mut state = self.shared.state.lock();
        state.watcher = Some(watcher);
        state.listener_registered = true;
        state.events.push(PortEvent::ListenerRegistered);
        Ok(())
    }

    fn reader(&mut self) -> Result<PortReader, PortError> {
        if self.fails(MockFailure::Reader) {
            return Err(PortError::stream("mock reader unavailable"));
        }
        self.record(PortEvent::ReaderAcquired);
        Ok(Box::new(PolledReader::new(
            MockReader {
                shared: Arc::clone(&self.shared),
            },
            Arc::clone(&self.shared.control),
        )))
    }

    fn writer(&mut self) -> Result<PortWriter, PortError> {
        if self.fails(MockFailure::Writer) {
            return Err(PortError::stream("mock writer unavailable"));
        }
        self.record(PortEvent::WriterAcquired);
        Ok(Box::new(MockWriter {
            shared: Arc::clone(&self.shared),
        }))
    }

    fn close(&mut self) -> Result<(), PortError> {
        // Joining the watcher must happen without the state lock: its probe
        // takes the same lock.
        let watcher = {
            let mut state = self.shared.state.lock();
            state.held = false;
            state.listener_registered = false;
            state.events.push(PortEvent::Closed);
            state.watcher.take()
        };
        if let Some(mut watcher) = watcher {
            watcher.stop()?;
        }
        if self.fails(MockFailure::Close) {
            return Err(PortError::Io(io::Error::other("mock close failed")));
        }
        Ok(())
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .finish()
    }
}

struct MockReader {
    shared: Arc<Shared>,
}

impl TimedRead for MockReader {
    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        if state.failures.contains(&MockFailure::Read) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock read failed"));
        }
        while state.read_queue.is_empty() {
            if self
                .shared
                .data
                .wait_until(&mut state, deadline)
                .timed_out()
            {
                break;
            }
        }
        let n = buf.len().min(state.read_queue.len());
        for (slot, byte) in buf.iter_mut().zip(state.read_queue.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Drop for MockReader {
    fn drop(&mut self) {
        self.shared.state.lock().events.push(PortEvent::ReaderDropped);
    }
}

struct MockWriter {
    shared: Arc<Shared>,
}

impl io::Write for MockWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut state = self.shared.state.lock();
        if state.failures.contains(&MockFailure::Write) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock write failed"));
        }
        state.write_log.push(data.to_vec());
        state.events.push(PortEvent::Write(data.to_vec()));
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut state = self.shared.state.lock();
        if state.failures.contains(&MockFailure::Flush) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock flush failed"));
        }
        state.events.push(PortEvent::Flush);
        Ok(())
    }
}

impl Drop for MockWriter {
    fn drop(&mut self) {
        self.shared.state.lock().events.push(PortEvent::WriterDropped);
    }
}

/// Hands out registered [`MockSerialPort`]s by name.
#[derive(Debug, Default)]
pub struct MockPortProvider {
    ports: Mutex<HashMap<String, MockSerialPort>>,
}

impl MockPortProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `port` available under its name.
    pub fn insert(&self, port: MockSerialPort) {
        self.ports.lock().insert(port.name.clone(), port);
    }

    /// Unplug the port with the given name.
    pub fn remove(&self, port_name: &str) -> Option<MockSerialPort> {
        self.ports.lock().remove(port_name)
    }
}

impl PortProvider for MockPortProvider {
    fn open(
        &self,
        port_name: &str,
        acquire_timeout: Duration,
    ) -> Result<Box<dyn HardwarePort>, PortError> {
        let port = self
            .ports
            .lock()
            .get(port_name)
            .cloned()
            .ok_or_else(|| PortError::not_found(port_name))?;

        let deadline = Instant::now() + acquire_timeout;
        loop {
            match port.acquire() {
                Ok(()) => return Ok(Box::new(port)),
                Err(e) if Instant::now() >= deadline => return Err(e),
                Err(_) => thread::sleep(Duration::from_millis(5)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    fn open(provider: &MockPortProvider, name: &str) -> Box<dyn HardwarePort> {
        provider.open(name, Duration::from_millis(20)).unwrap()
    }

    #[test]
    fn test_enqueue_and_read() {
        let mock = MockSerialPort::new("MOCK0");
        let provider = MockPortProvider::new();
        provider.insert(mock.clone());
        let mut port = open(&provider, "MOCK0");

        mock.enqueue_read(b"Hello");

        let mut reader = port.reader().unwrap();
        let mut buffer = [0u8; 10];
        let n = reader.read(&mut buffer).unwrap();
        assert_eq!(&buffer[..n], b"Hello");
        assert_eq!(mock.available_bytes(), 0);
    }

    #[test]
    fn test_write_logging() {
        let mock = MockSerialPort::new("MOCK0");
        let provider = MockPortProvider::new();
        provider.insert(mock.clone());
        let mut port = open(&provider, "MOCK0");

        let mut writer = port.writer().unwrap();
        writer.write_all(b"Test1").unwrap();
        writer.write_all(b"Test2").unwrap();

        let log = mock.get_write_log();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0], b"Test1");
        assert_eq!(log[1], b"Test2");
        assert_eq!(mock.written(), b"Test1Test2");
    }

    #[test]
    fn test_unknown_port_is_not_found() {
        let provider = MockPortProvider::new();
        let err = provider
            .open("/dev/ttyNOPE", Duration::from_millis(10))
            .unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }

    #[test]
    fn test_held_port_is_busy() {
        let mock = MockSerialPort::new("MOCK0");
        let provider = MockPortProvider::new();
        provider.insert(mock.clone());
        let mut first = open(&provider, "MOCK0");

        let err = provider.open("MOCK0", Duration::from_millis(20)).unwrap_err();
        assert!(err.is_busy());

        first.close().unwrap();
        assert!(!mock.is_held());
        assert!(provider.open("MOCK0", Duration::from_millis(20)).is_ok());
    }

    #[test]
    fn test_busy_port_acquired_when_released_within_timeout() {
        let mock = MockSerialPort::new("MOCK0");
        mock.fail(MockFailure::Busy);
        let provider = MockPortProvider::new();
        provider.insert(mock.clone());

        let releaser = mock.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            releaser.heal(MockFailure::Busy);
        });

        assert!(provider.open("MOCK0", Duration::from_secs(2)).is_ok());
        handle.join().unwrap();
    }

    #[test]
    fn test_second_listener_rejected() {
        struct Noop;
        impl DataListener for Noop {
            fn data_available(&self) {}
        }

        let mock = MockSerialPort::new("MOCK0");
        let provider = MockPortProvider::new();
        provider.insert(mock.clone());
        let mut port = open(&provider, "MOCK0");

        port.register_listener(Arc::new(Noop)).unwrap();
        let err = port.register_listener(Arc::new(Noop)).unwrap_err();
        assert!(matches!(err, PortError::ListenerRegistration(_)));
        port.close().unwrap();
    }

    #[test]
    fn test_dropping_streams_is_recorded() {
        let mock = MockSerialPort::new("MOCK0");
        let provider = MockPortProvider::new();
        provider.insert(mock.clone());
        let mut port = open(&provider, "MOCK0");

        drop(port.reader().unwrap());
        drop(port.writer().unwrap());

        assert_eq!(
            mock.events(),
            vec![
                PortEvent::Acquired,
                PortEvent::ReaderAcquired,
                PortEvent::ReaderDropped,
                PortEvent::WriterAcquired,
                PortEvent::WriterDropped,
            ]
        );
    }
}
