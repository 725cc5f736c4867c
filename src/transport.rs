//! Serial transport adapter for ZNP dongles.
//!
//! [`ZnpTransport`] owns a single serial port: it acquires and configures
//! it, writes the firmware's wake-up ("magic") byte, and hands the protocol
//! stack an [`InputStream`], an [`OutputStream`] and a [`DataSignal`].
//!
//! # Lifecycle
//!
//! ```text
//! Closed ──open()──> Opening ──(all steps ok)──> Open ──close()──> Closed
//!                       └───────(any step fails)──────────────────┘
//! ```
//!
//! `open()` runs: acquire (bounded wait) → link 8N1 → receive threshold and
//! timeout → data listener → streams → magic byte. A failure at any step
//! releases whatever was acquired and returns that step's error.
//!
//! `close()` first shrinks the receive timeout so a reader blocked in
//! [`InputStream::read`] returns within one poll slice, then releases the
//! input stream, flushes and releases the output stream and closes the
//! port. Every step runs even if an earlier one failed.
//!
//! # Threads
//!
//! `open`/`close` take `&mut self`, so lifecycle control is single-threaded.
//! Stream handles are `Send` clones and may be used from a reader thread;
//! the data listener runs on the port's event thread.

use crate::diagnostics::{DiagnosticSink, TracingSink};
use crate::error::{TeardownStep, TransportError, TransportResult};
use crate::port::{
    DataListener, HardwarePort, LinkSettings, PortError, PortProvider, PortReader, PortWriter,
    SystemPortProvider, ZNP_BAUD_RATE,
};
use crate::signal::{DataSignal, StopSignal};
use parking_lot::Mutex;
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

/// Wake-up byte expected by TI Z-Stack ZNP firmware.
pub const DEFAULT_MAGIC_NUMBER: u8 = 0xEF;

/// How long `open()` waits for a port held by another process.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_millis(2000);

/// How long a read waits for data before returning empty-handed.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_millis(2000);

/// Receive timeout applied at the start of `close()`.
pub const CLOSE_RECEIVE_TIMEOUT: Duration = Duration::from_millis(1);

/// Reads return as soon as this many bytes have arrived.
pub const DEFAULT_RECEIVE_THRESHOLD: usize = 1;

/// Whether the port's data-available events reach the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationMode {
    /// Register a listener that raises the transport's [`DataSignal`].
    Signal,
    /// Do not register a listener; consumers rely on blocking reads.
    Disabled,
}

/// Tuning for the data-available path. Platform specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationSettings {
    pub mode: NotificationMode,
    /// How long the event thread is held after each notification.
    pub idle_backoff: Duration,
    /// How often the system port polls for pending input.
    pub poll_interval: Duration,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            mode: NotificationMode::Signal,
            idle_backoff: Duration::from_millis(100),
            poll_interval: Duration::from_millis(10),
        }
    }
}

/// Immutable configuration of one transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportSettings {
    /// System device name, e.g. `/dev/ttyACM0` or `COM3`.
    pub port: String,
    /// Byte written right after the link is configured.
    pub magic_number: u8,
    pub link: LinkSettings,
    pub acquire_timeout: Duration,
    pub receive_threshold: usize,
    pub receive_timeout: Duration,
    pub close_receive_timeout: Duration,
    pub notification: NotificationSettings,
}

impl TransportSettings {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            magic_number: DEFAULT_MAGIC_NUMBER,
            link: LinkSettings::eight_n_one(ZNP_BAUD_RATE),
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            receive_threshold: DEFAULT_RECEIVE_THRESHOLD,
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            close_receive_timeout: CLOSE_RECEIVE_TIMEOUT,
            notification: NotificationSettings::default(),
        }
    }

    pub fn with_magic_number(mut self, magic_number: u8) -> Self {
        self.magic_number = magic_number;
        self
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.link.baud_rate = baud_rate;
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    pub fn with_notification(mut self, notification: NotificationSettings) -> Self {
        self.notification = notification;
        self
    }
}

/// Lifecycle state of a [`ZnpTransport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Closed,
    Opening,
    Open,
}

/// Byte-stream lifecycle capability consumed by the protocol stack.
pub trait ByteStreamPort: Send {
    /// Identifier of the underlying device, for diagnostics.
    fn port_name(&self) -> &str;

    /// Open the link. Returns `false` (after reporting why) on failure.
    fn open(&mut self) -> bool;

    /// Release the link. Idempotent and infallible.
    fn close(&mut self);

    /// Readable stream, `None` unless open.
    fn input_stream(&self) -> Option<InputStream>;

    /// Writable stream, `None` unless open.
    fn output_stream(&self) -> Option<OutputStream>;

    /// Raised whenever the port reports pending input.
    fn data_signal(&self) -> DataSignal;
}

fn closed_stream() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "serial port closed")
}

/// Readable half of an open transport.
///
/// `read` blocks until at least the receive threshold has arrived or the
/// receive timeout elapses; `Ok(0)` means the timeout elapsed. Once the
/// transport closes, every clone fails with `NotConnected`.
#[derive(Clone)]
pub struct InputStream {
    slot: Arc<Mutex<Option<PortReader>>>,
}

impl InputStream {
    fn new(reader: PortReader) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(reader))),
        }
    }

    /// Drop the reader. Waits for an in-flight read to return.
    fn release(&self) {
        self.slot.lock().take();
    }

    pub fn is_closed(&self) -> bool {
        self.slot.lock().is_none()
    }
}

impl Read for InputStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.slot.lock().as_mut() {
            Some(reader) => reader.read(buf),
            None => Err(closed_stream()),
        }
    }
}

impl std::fmt::Debug for InputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputStream")
            .field("closed", &self.slot.try_lock().map(|slot| slot.is_none()))
            .finish()
    }
}

/// Writable half of an open transport. Fails with `NotConnected` once the
/// transport closes.
#[derive(Clone)]
pub struct OutputStream {
    slot: Arc<Mutex<Option<PortWriter>>>,
}

impl OutputStream {
    fn new(writer: PortWriter) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(writer))),
        }
    }

    /// Flush and drop the writer. The writer is dropped even if the flush
    /// fails.
    fn release(&self) -> io::Result<()> {
        match self.slot.lock().take() {
            Some(mut writer) => writer.flush(),
            None => Ok(()),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.slot.lock().is_none()
    }
}

impl Write for OutputStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.slot.lock().as_mut() {
            Some(writer) => writer.write(buf),
            None => Err(closed_stream()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.slot.lock().as_mut() {
            Some(writer) => writer.flush(),
            None => Err(closed_stream()),
        }
    }
}

impl std::fmt::Debug for OutputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputStream")
            .field("closed", &self.slot.try_lock().map(|slot| slot.is_none()))
            .finish()
    }
}

/// Listener registered on the port's event thread.
///
/// Raises the data signal, then holds the event thread for `idle_backoff`
/// so a level that stays high until the consumer reads does not spin it.
/// `close()` cuts the hold short through `shutdown`.
struct NotificationHandler {
    signal: DataSignal,
    shutdown: StopSignal,
    idle_backoff: Duration,
}

impl DataListener for NotificationHandler {
    fn data_available(&self) {
        self.signal.raise();
        self.shutdown.wait_timeout(self.idle_backoff);
    }
}

/// Resources held while the transport is open.
struct Session {
    port: Box<dyn HardwarePort>,
    input: InputStream,
    output: OutputStream,
    shutdown: StopSignal,
}

/// Serial transport for a ZNP network coprocessor.
pub struct ZnpTransport {
    settings: TransportSettings,
    provider: Arc<dyn PortProvider>,
    diagnostics: Arc<dyn DiagnosticSink>,
    signal: DataSignal,
    state: TransportState,
    session: Option<Session>,
}

impl ZnpTransport {
    pub fn new(
        settings: TransportSettings,
        provider: Arc<dyn PortProvider>,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            settings,
            provider,
            diagnostics,
            signal: DataSignal::new(),
            state: TransportState::Closed,
            session: None,
        }
    }

    /// Transport over the operating system's serial ports, logging
    /// failures through `tracing`.
    pub fn system(settings: TransportSettings) -> Self {
        let provider =
            SystemPortProvider::new().with_poll_interval(settings.notification.poll_interval);
        Self::new(settings, Arc::new(provider), Arc::new(TracingSink))
    }

    pub fn settings(&self) -> &TransportSettings {
        &self.settings
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == TransportState::Open
    }

    /// Open the port, returning `false` and reporting the error on failure.
    pub fn open(&mut self) -> bool {
        match self.try_open() {
            Ok(()) => true,
            Err(e) => {
                self.diagnostics.report(&e);
                false
            }
        }
    }

    /// Open the port, returning the failing step's error.
    ///
    /// Calling this while open fails with [`TransportError::AlreadyOpen`]
    /// and leaves the open port untouched.
    pub fn try_open(&mut self) -> TransportResult<()> {
        if self.session.is_some() {
            return Err(TransportError::AlreadyOpen {
                port: self.settings.port.clone(),
            });
        }

        debug!("Opening ZigBee ZNP serial port {}", self.settings.port);
        self.state = TransportState::Opening;

        match self.open_session() {
            Ok(session) => {
                self.session = Some(session);
                self.state = TransportState::Open;
                info!("Serial port [{}] is initialized.", self.settings.port);
                Ok(())
            }
            Err(e) => {
                self.state = TransportState::Closed;
                Err(e)
            }
        }
    }

    fn open_session(&self) -> TransportResult<Session> {
        let name = self.settings.port.as_str();
        debug!("Connecting to serial port [{}]", name);

        let started = Instant::now();
        let mut port = self
            .provider
            .open(name, self.settings.acquire_timeout)
            .map_err(|e| TransportError::from_acquire(name, started.elapsed(), e))?;

        let shutdown = StopSignal::new();
        match self.prepare(port.as_mut(), &shutdown) {
            Ok((input, output)) => Ok(Session {
                port,
                input,
                output,
                shutdown,
            }),
            Err(e) => {
                // Streams from the failed attempt are already dropped.
                shutdown.stop();
                if let Err(source) = port.close() {
                    self.report_teardown(TeardownStep::ClosePort, source);
                }
                Err(e)
            }
        }
    }

    /// Steps 3 to 7 of `open()` on an acquired port.
    fn prepare(
        &self,
        port: &mut dyn HardwarePort,
        shutdown: &StopSignal,
    ) -> TransportResult<(InputStream, OutputStream)> {
        let name = self.settings.port.as_str();
        let unsupported = |source| TransportError::UnsupportedConfiguration {
            port: name.to_string(),
            source,
        };
        let unavailable = |source| TransportError::StreamAcquisition {
            port: name.to_string(),
            source,
        };

        port.configure_link(&self.settings.link)
            .map_err(unsupported)?;
        port.set_receive_threshold(self.settings.receive_threshold)
            .map_err(unsupported)?;
        port.set_receive_timeout(self.settings.receive_timeout)
            .map_err(unsupported)?;

        match self.settings.notification.mode {
            NotificationMode::Signal => {
                let handler = NotificationHandler {
                    signal: self.signal.clone(),
                    shutdown: shutdown.clone(),
                    idle_backoff: self.settings.notification.idle_backoff,
                };
                port.register_listener(Arc::new(handler))
                    .map_err(|source| TransportError::ListenerRegistration {
                        port: name.to_string(),
                        source,
                    })?;
            }
            NotificationMode::Disabled => trace!("Data notifications disabled for {}", name),
        }

        let input = InputStream::new(port.reader().map_err(unavailable)?);
        let mut output = OutputStream::new(port.writer().map_err(unavailable)?);

        let magic = self.settings.magic_number;
        output
            .write_all(&[magic])
            .and_then(|()| output.flush())
            .map_err(|source| TransportError::HandshakeWrite {
                port: name.to_string(),
                magic,
                source,
            })?;
        trace!("Wrote magic byte {:#04x} to {}", magic, name);

        Ok((input, output))
    }

    /// Release the port. A no-op when already closed; failures are
    /// reported, never returned.
    pub fn close(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let Session {
            mut port,
            input,
            output,
            shutdown,
        } = session;

        debug!("Closing ZigBee ZNP serial port {}", self.settings.port);

        if let Err(source) = port.set_receive_timeout(self.settings.close_receive_timeout) {
            self.report_teardown(TeardownStep::ReceiveTimeout, source);
        }
        shutdown.stop();

        input.release();
        if let Err(e) = output.release() {
            self.report_teardown(TeardownStep::FlushOutput, PortError::Io(e));
        }
        if let Err(source) = port.close() {
            self.report_teardown(TeardownStep::ClosePort, source);
        }
        drop(port);

        self.signal.take();
        self.state = TransportState::Closed;
        info!("Serial port [{}] is closed.", self.settings.port);
    }

    pub fn input_stream(&self) -> Option<InputStream> {
        self.session.as_ref().map(|s| s.input.clone())
    }

    pub fn output_stream(&self) -> Option<OutputStream> {
        self.session.as_ref().map(|s| s.output.clone())
    }

    pub fn data_signal(&self) -> DataSignal {
        self.signal.clone()
    }

    fn report_teardown(&self, step: TeardownStep, source: PortError) {
        self.diagnostics.report(&TransportError::Teardown {
            port: self.settings.port.clone(),
            step,
            source,
        });
    }
}

impl ByteStreamPort for ZnpTransport {
    fn port_name(&self) -> &str {
        &self.settings.port
    }

    fn open(&mut self) -> bool {
        ZnpTransport::open(self)
    }

    fn close(&mut self) {
        ZnpTransport::close(self)
    }

    fn input_stream(&self) -> Option<InputStream> {
        ZnpTransport::input_stream(self)
    }

    fn output_stream(&self) -> Option<OutputStream> {
        ZnpTransport::output_stream(self)
    }

    fn data_signal(&self) -> DataSignal {
        ZnpTransport::data_signal(self)
    }
}

impl Drop for ZnpTransport {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ZnpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZnpTransport")
            .field("port", &self.settings.port)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use crate::error::TransportErrorKind;
    use crate::port::{MockFailure, MockPortProvider, MockSerialPort, PortEvent};
    use std::thread;

    const PORT: &str = "/dev/ttyMOCK0";

    fn fixture(settings: TransportSettings) -> (ZnpTransport, MockSerialPort, Arc<MemorySink>) {
        let mock = MockSerialPort::new(PORT);
        let provider = MockPortProvider::new();
        provider.insert(mock.clone());
        let sink = Arc::new(MemorySink::new());
        let transport = ZnpTransport::new(settings, Arc::new(provider), sink.clone());
        (transport, mock, sink)
    }

    fn settings() -> TransportSettings {
        TransportSettings::new(PORT).with_acquire_timeout(Duration::from_millis(50))
    }

    #[test]
    fn test_open_configures_before_handshake() {
        let (mut transport, mock, sink) = fixture(settings());

        assert!(transport.open());
        assert_eq!(transport.state(), TransportState::Open);
        assert!(sink.is_empty());

        assert_eq!(
            mock.events(),
            vec![
                PortEvent::Acquired,
                PortEvent::Configured(LinkSettings::eight_n_one(230_400)),
                PortEvent::ReceiveThreshold(1),
                PortEvent::ReceiveTimeout(Duration::from_millis(2000)),
                PortEvent::ListenerRegistered,
                PortEvent::ReaderAcquired,
                PortEvent::WriterAcquired,
                PortEvent::Write(vec![0xEF]),
                PortEvent::Flush,
            ]
        );
    }

    #[test]
    fn test_close_order() {
        let (mut transport, mock, _sink) = fixture(settings());
        assert!(transport.open());
        mock.clear_history();

        transport.close();

        assert_eq!(
            mock.events(),
            vec![
                PortEvent::ReceiveTimeout(CLOSE_RECEIVE_TIMEOUT),
                PortEvent::ReaderDropped,
                PortEvent::Flush,
                PortEvent::WriterDropped,
                PortEvent::Closed,
            ]
        );
        assert_eq!(transport.state(), TransportState::Closed);
        assert!(!mock.is_held());
    }

    #[test]
    fn test_second_open_is_rejected_and_keeps_port() {
        let (mut transport, mock, sink) = fixture(settings());
        assert!(transport.open());

        let err = transport.try_open().unwrap_err();
        assert_eq!(err.kind(), TransportErrorKind::AlreadyOpen);
        assert!(!transport.open());
        assert_eq!(sink.kinds(), vec![TransportErrorKind::AlreadyOpen]);

        assert!(transport.is_open());
        assert_eq!(mock.acquire_count(), 1);
        assert_eq!(mock.written(), vec![0xEF]);
    }

    #[test]
    fn test_listener_failure_releases_port() {
        let (mut transport, mock, _sink) = fixture(settings());
        mock.fail(MockFailure::Listener);

        let err = transport.try_open().unwrap_err();
        assert_eq!(err.kind(), TransportErrorKind::ListenerRegistration);
        assert_eq!(transport.state(), TransportState::Closed);
        assert!(!mock.is_held());
        assert!(transport.input_stream().is_none());
    }

    #[test]
    fn test_disabled_notifications_skip_listener() {
        let notification = NotificationSettings {
            mode: NotificationMode::Disabled,
            ..NotificationSettings::default()
        };
        let (mut transport, mock, _sink) = fixture(settings().with_notification(notification));
        mock.fail(MockFailure::Listener);

        assert!(transport.open());
        assert!(!mock.listener_registered());
    }

    #[test]
    fn test_handshake_failure_releases_streams_and_port() {
        let (mut transport, mock, _sink) = fixture(settings());
        mock.fail(MockFailure::Write);

        let err = transport.try_open().unwrap_err();
        assert_eq!(err.kind(), TransportErrorKind::HandshakeWrite);

        let events = mock.events();
        let reader_dropped = events.iter().position(|e| *e == PortEvent::ReaderDropped);
        let writer_dropped = events.iter().position(|e| *e == PortEvent::WriterDropped);
        let closed = events.iter().position(|e| *e == PortEvent::Closed);
        assert!(reader_dropped.is_some() && writer_dropped.is_some());
        assert!(closed > reader_dropped && closed > writer_dropped);
        assert!(transport.output_stream().is_none());
    }

    #[test]
    fn test_rejected_link_is_unsupported_configuration() {
        let (mut transport, mock, _sink) = fixture(settings());
        mock.fail(MockFailure::RejectLink);

        let err = transport.try_open().unwrap_err();
        assert_eq!(err.kind(), TransportErrorKind::UnsupportedConfiguration);
        assert!(!mock.is_held());
    }

    #[test]
    fn test_rejected_read_timeout_is_unsupported_configuration() {
        let (mut transport, mock, _sink) = fixture(settings());
        mock.fail(MockFailure::RejectTimeout);

        let err = transport.try_open().unwrap_err();
        assert_eq!(err.kind(), TransportErrorKind::UnsupportedConfiguration);
    }

    #[test]
    fn test_stream_failure_is_stream_acquisition() {
        let (mut transport, mock, _sink) = fixture(settings());
        mock.fail(MockFailure::Writer);

        let err = transport.try_open().unwrap_err();
        assert_eq!(err.kind(), TransportErrorKind::StreamAcquisition);
        assert!(mock.events().contains(&PortEvent::ReaderDropped));
    }

    #[test]
    fn test_teardown_failures_are_reported_and_cleanup_continues() {
        let (mut transport, mock, sink) = fixture(settings());
        assert!(transport.open());

        mock.fail(MockFailure::RejectTimeout);
        mock.fail(MockFailure::Flush);
        mock.fail(MockFailure::Close);
        transport.close();

        assert_eq!(
            sink.kinds(),
            vec![
                TransportErrorKind::Teardown,
                TransportErrorKind::Teardown,
                TransportErrorKind::Teardown
            ]
        );
        assert!(transport.input_stream().is_none());
        assert!(transport.output_stream().is_none());
        assert_eq!(transport.state(), TransportState::Closed);
        assert!(mock.events().contains(&PortEvent::Closed));
    }

    #[test]
    fn test_streams_held_by_consumer_fail_after_close() {
        let (mut transport, _mock, _sink) = fixture(settings());
        assert!(transport.open());
        let mut input = transport.input_stream().unwrap();
        let mut output = transport.output_stream().unwrap();

        transport.close();

        let mut buf = [0u8; 4];
        assert_eq!(
            input.read(&mut buf).unwrap_err().kind(),
            io::ErrorKind::NotConnected
        );
        assert_eq!(
            output.write(&[0x01]).unwrap_err().kind(),
            io::ErrorKind::NotConnected
        );
        assert!(input.is_closed() && output.is_closed());
    }

    #[test]
    fn test_close_wakes_blocked_reader() {
        let settings = settings().with_receive_timeout(Duration::from_secs(30));
        let (mut transport, _mock, _sink) = fixture(settings);
        assert!(transport.open());
        let mut input = transport.input_stream().unwrap();

        let reader = thread::spawn(move || {
            let mut buf = [0u8; 16];
            input.read(&mut buf)
        });
        thread::sleep(Duration::from_millis(50));

        let started = Instant::now();
        transport.close();
        assert!(started.elapsed() < Duration::from_secs(5));

        // The read either returned empty before release or hit the closed slot.
        match reader.join().unwrap() {
            Ok(n) => assert_eq!(n, 0),
            Err(e) => assert_eq!(e.kind(), io::ErrorKind::NotConnected),
        }
    }

    #[test]
    fn test_incoming_data_raises_signal() {
        let (mut transport, mock, _sink) = fixture(settings());
        let signal = transport.data_signal();
        assert!(transport.open());

        mock.enqueue_read(&[0xFE, 0x00, 0x61, 0x01]);
        assert!(signal.wait_timeout(Duration::from_secs(2)));

        let mut input = transport.input_stream().unwrap();
        let mut buf = [0u8; 16];
        let n = input.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], &[0xFE, 0x00, 0x61, 0x01]);

        let started = Instant::now();
        transport.close();
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_reopen_after_close_sends_handshake_again() {
        let (mut transport, mock, _sink) = fixture(settings().with_magic_number(0x55));
        assert!(transport.open());
        transport.close();
        assert!(transport.open());

        assert_eq!(mock.acquire_count(), 2);
        assert_eq!(mock.get_write_log(), vec![vec![0x55], vec![0x55]]);
    }

    #[test]
    fn test_drop_closes_port() {
        let (mut transport, mock, _sink) = fixture(settings());
        assert!(transport.open());
        drop(transport);
        assert!(!mock.is_held());
    }
}
