//! System serial port implementation.
//!
//! Wraps the `serialport` crate's `SerialPort` trait with our own
//! [`HardwarePort`] trait for dependency injection and testing.

use super::error::PortError;
use super::reader::{PolledReader, ReadControl, POLL_SLICE};
use super::traits::{
    DataListener, HardwarePort, LinkSettings, PortProvider, PortReader, PortWriter, TimedRead,
    ZNP_BAUD_RATE,
};
use super::watcher::DataWatcher;
use serde::Serialize;
use std::io::{self, Read};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Pause between acquisition attempts while the port is busy.
const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// How often the watcher checks for pending input.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Upper bound on a single blocking write.
const WRITE_TIMEOUT: Duration = Duration::from_secs(2);

/// Pending-input check interval for reads that leave the port timeout alone.
const PENDING_POLL: Duration = Duration::from_millis(2);

/// Opens operating-system serial devices.
#[derive(Debug, Clone)]
pub struct SystemPortProvider {
    retry_interval: Duration,
    poll_interval: Duration,
}

impl SystemPortProvider {
    pub fn new() -> Self {
        Self {
            retry_interval: DEFAULT_RETRY_INTERVAL,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Interval at which opened ports poll for pending input.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Interval between acquisition attempts on a busy port.
    pub fn with_retry_interval(mut self, retry_interval: Duration) -> Self {
        self.retry_interval = retry_interval;
        self
    }
}

impl Default for SystemPortProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl PortProvider for SystemPortProvider {
    fn open(
        &self,
        port_name: &str,
        acquire_timeout: Duration,
    ) -> Result<Box<dyn HardwarePort>, PortError> {
        let deadline = Instant::now() + acquire_timeout;

        loop {
            let attempt = serialport::new(port_name, ZNP_BAUD_RATE)
                .timeout(POLL_SLICE)
                .open();

            match attempt {
                Ok(port) => {
                    return Ok(Box::new(SystemPort::new(
                        port_name,
                        port,
                        self.poll_interval,
                    )))
                }
                Err(e) => {
                    let err = classify_open_error(port_name, e);
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if !err.is_busy() || remaining.is_zero() {
                        return Err(err);
                    }
                    debug!("Port {} busy, retrying for another {:?}", port_name, remaining);
                    thread::sleep(self.retry_interval.min(remaining));
                }
            }
        }
    }
}

/// Map an open failure onto the port error taxonomy.
///
/// On Unix `serialport` reports a port held by another process as
/// `NoDevice` when its exclusive lock fails, and a missing path as
/// `Io(NotFound)`. Windows uses `NoDevice` for a missing COM port.
fn classify_open_error(port_name: &str, err: serialport::Error) -> PortError {
    match err.kind() {
        serialport::ErrorKind::Io(io::ErrorKind::NotFound) => PortError::not_found(port_name),
        serialport::ErrorKind::NoDevice if cfg!(unix) && Path::new(port_name).exists() => {
            PortError::busy(port_name)
        }
        serialport::ErrorKind::NoDevice => PortError::not_found(port_name),
        serialport::ErrorKind::InvalidInput => PortError::unsupported(err.to_string()),
        _ if is_busy(&err) => PortError::busy(port_name),
        _ => PortError::Serial(err),
    }
}

/// EBUSY surfaces as an unknown error carrying the errno text, and Windows
/// reports a port held elsewhere as access denied.
fn is_busy(err: &serialport::Error) -> bool {
    if err.description.to_ascii_lowercase().contains("busy") {
        return true;
    }
    cfg!(windows)
        && matches!(
            err.kind(),
            serialport::ErrorKind::Io(io::ErrorKind::PermissionDenied)
        )
}

/// Map a parameter change failure.
fn setting_error(err: serialport::Error) -> PortError {
    match err.kind() {
        serialport::ErrorKind::InvalidInput => PortError::unsupported(err.to_string()),
        _ => PortError::Serial(err),
    }
}

/// A serial device opened through [`SystemPortProvider`].
pub struct SystemPort {
    /// `None` once closed.
    port: Option<Box<dyn serialport::SerialPort>>,
    /// The port name/path for identification.
    name: String,
    control: Arc<ReadControl>,
    watcher: Option<DataWatcher>,
    poll_interval: Duration,
}

impl SystemPort {
    fn new(
        port_name: &str,
        port: Box<dyn serialport::SerialPort>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            port: Some(port),
            name: port_name.to_string(),
            control: Arc::new(ReadControl::default()),
            watcher: None,
            poll_interval,
        }
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn serialport::SerialPort>, PortError> {
        self.port.as_mut().ok_or(PortError::Closed)
    }
}

impl HardwarePort for SystemPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn configure_link(&mut self, link: &LinkSettings) -> Result<(), PortError> {
        let port = self.port_mut()?;
        port.set_baud_rate(link.baud_rate).map_err(setting_error)?;
        port.set_data_bits(link.data_bits.into())
            .map_err(setting_error)?;
        port.set_stop_bits(link.stop_bits.into())
            .map_err(setting_error)?;
        port.set_parity(link.parity.into()).map_err(setting_error)?;
        port.set_flow_control(link.flow_control.into())
            .map_err(setting_error)?;
        Ok(())
    }

    fn set_receive_threshold(&mut self, bytes: usize) -> Result<(), PortError> {
        if bytes == 0 {
            return Err(PortError::unsupported(
                "receive threshold must be at least one byte",
            ));
        }
        self.control.set_threshold(bytes);
        Ok(())
    }

    fn set_receive_timeout(&mut self, timeout: Duration) -> Result<(), PortError> {
        if timeout.is_zero() {
            return Err(PortError::unsupported("receive timeout must be non-zero"));
        }
        self.port_mut()?;
        self.control.set_timeout(timeout);
        Ok(())
    }

    fn register_listener(&mut self, listener: Arc<dyn DataListener>) -> Result<(), PortError> {
        if self.watcher.is_some() {
            return Err(PortError::listener("a data listener is already registered"));
        }
        let probe = self
            .port_mut()?
            .try_clone()
            .map_err(|e| PortError::listener(format!("port cannot be watched concurrently: {e}")))?;

        let watcher = DataWatcher::spawn(
            &self.name,
            move || {
                probe
                    .bytes_to_read()
                    .map(|n| n as usize)
                    .map_err(io::Error::from)
            },
            listener,
            self.poll_interval,
        )?;
        self.watcher = Some(watcher);
        Ok(())
    }

    fn reader(&mut self) -> Result<PortReader, PortError> {
        let clone = self
            .port_mut()?
            .try_clone()
            .map_err(|e| PortError::stream(format!("cannot clone port for reading: {e}")))?;
        Ok(Box::new(PolledReader::new(
            SystemReader(clone),
            Arc::clone(&self.control),
        )))
    }

    fn writer(&mut self) -> Result<PortWriter, PortError> {
        let mut clone = self
            .port_mut()?
            .try_clone()
            .map_err(|e| PortError::stream(format!("cannot clone port for writing: {e}")))?;
        clone.set_timeout(WRITE_TIMEOUT).map_err(PortError::Serial)?;
        Ok(Box::new(clone))
    }

    fn close(&mut self) -> Result<(), PortError> {
        let stopped = match self.watcher.take() {
            Some(mut watcher) => watcher.stop(),
            None => Ok(()),
        };
        if self.port.take().is_some() {
            trace!("Released OS handle for {}", self.name);
        }
        stopped
    }
}

impl std::fmt::Debug for SystemPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemPort")
            .field("name", &self.name)
            .field(
                "baud_rate",
                &self.port.as_ref().and_then(|p| p.baud_rate().ok()),
            )
            .field("receive_timeout", &self.control.timeout())
            .field("watching", &self.watcher.is_some())
            .finish()
    }
}

/// Readable clone of a system port.
struct SystemReader(Box<dyn serialport::SerialPort>);

impl SystemReader {
    /// Wait for pending input and read only what has arrived, leaving the
    /// port's timeouts as they are.
    ///
    /// Windows comm timeouts are per device and shared by every cloned
    /// handle, so the writer's timeout must survive the read loop.
    fn read_pending(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        let deadline = Instant::now() + timeout;
        loop {
            let pending = self.0.bytes_to_read().map_err(io::Error::from)?;
            if pending > 0 {
                let len = buf.len().min(usize::try_from(pending).unwrap_or(usize::MAX));
                return quiet_timeout(self.0.read(&mut buf[..len]));
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(0);
            }
            thread::sleep(PENDING_POLL.min(remaining));
        }
    }
}

impl TimedRead for SystemReader {
    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        if cfg!(windows) {
            return self.read_pending(buf, timeout);
        }
        self.0.set_timeout(timeout)?;
        quiet_timeout(self.0.read(buf))
    }
}

/// An expired or interrupted read is an empty one.
fn quiet_timeout(result: io::Result<usize>) -> io::Result<usize> {
    match result {
        Err(e)
            if matches!(
                e.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
            ) =>
        {
            Ok(0)
        }
        other => other,
    }
}

/// A serial device visible to the operating system.
#[derive(Debug, Clone, Serialize)]
pub struct PortSummary {
    pub name: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vid: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
}

/// Enumerate serial devices present on the system.
pub fn available_ports() -> Result<Vec<PortSummary>, PortError> {
    let ports = serialport::available_ports()?;
    Ok(ports
        .into_iter()
        .map(|info| match info.port_type {
            serialport::SerialPortType::UsbPort(usb) => PortSummary {
                name: info.port_name,
                kind: "usb",
                vid: Some(usb.vid),
                pid: Some(usb.pid),
                manufacturer: usb.manufacturer,
                product: usb.product,
            },
            other => PortSummary {
                name: info.port_name,
                kind: match other {
                    serialport::SerialPortType::PciPort => "pci",
                    serialport::SerialPortType::BluetoothPort => "bluetooth",
                    _ => "unknown",
                },
                vid: None,
                pid: None,
                manufacturer: None,
                product: None,
            },
        })
        .collect())
}
