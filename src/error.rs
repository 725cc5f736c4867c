//! Errors surfaced at the transport boundary.
//!
//! Each variant names the lifecycle step that failed. `open()` failures are
//! returned (or reported and turned into `false`); `close()` failures are
//! only ever reported.

use crate::port::PortError;
use std::fmt;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Convenient Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors produced by the ZNP serial transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No device exists under the configured port identifier.
    #[error("Serial port {port} does not exist")]
    PortNotFound { port: String },

    /// Another process held the port for the whole acquisition window.
    #[error("Serial port {port} in use (waited {waited:?})")]
    PortBusy { port: String, waited: Duration },

    /// Any other failure while acquiring the port.
    #[error("Cannot access serial port {port}: {source}")]
    PortAccess {
        port: String,
        #[source]
        source: PortError,
    },

    /// The driver rejected the link or read parameters.
    #[error("Unsupported comm operation on port {port}: {source}")]
    UnsupportedConfiguration {
        port: String,
        #[source]
        source: PortError,
    },

    /// The data-available listener could not be registered.
    #[error("Cannot register data listener on {port}: {source}")]
    ListenerRegistration {
        port: String,
        #[source]
        source: PortError,
    },

    /// The port would not hand out its input or output stream.
    #[error("Cannot acquire streams for {port}: {source}")]
    StreamAcquisition {
        port: String,
        #[source]
        source: PortError,
    },

    /// The magic byte could not be written after configuring the link.
    #[error("Handshake byte {magic:#04x} not written to {port}: {source}")]
    HandshakeWrite {
        port: String,
        magic: u8,
        #[source]
        source: io::Error,
    },

    /// `open()` was called while a port is already open.
    #[error("Serial port {port} is already open")]
    AlreadyOpen { port: String },

    /// A release step failed during `close()`.
    #[error("Error closing serial port {port} ({step}): {source}")]
    Teardown {
        port: String,
        step: TeardownStep,
        #[source]
        source: PortError,
    },
}

/// Discriminant of [`TransportError`], for matching without payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    PortNotFound,
    PortBusy,
    PortAccess,
    UnsupportedConfiguration,
    ListenerRegistration,
    StreamAcquisition,
    HandshakeWrite,
    AlreadyOpen,
    Teardown,
}

/// Release steps performed by `close()`, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TeardownStep {
    /// Shrinking the receive timeout to wake blocked readers.
    ReceiveTimeout,
    /// Flushing pending output.
    FlushOutput,
    /// Releasing the OS port handle.
    ClosePort,
}

impl fmt::Display for TeardownStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReceiveTimeout => write!(f, "shrinking receive timeout"),
            Self::FlushOutput => write!(f, "flushing output stream"),
            Self::ClosePort => write!(f, "closing port handle"),
        }
    }
}

impl TransportError {
    pub fn kind(&self) -> TransportErrorKind {
        match self {
            Self::PortNotFound { .. } => TransportErrorKind::PortNotFound,
            Self::PortBusy { .. } => TransportErrorKind::PortBusy,
            Self::PortAccess { .. } => TransportErrorKind::PortAccess,
            Self::UnsupportedConfiguration { .. } => TransportErrorKind::UnsupportedConfiguration,
            Self::ListenerRegistration { .. } => TransportErrorKind::ListenerRegistration,
            Self::StreamAcquisition { .. } => TransportErrorKind::StreamAcquisition,
            Self::HandshakeWrite { .. } => TransportErrorKind::HandshakeWrite,
            Self::AlreadyOpen { .. } => TransportErrorKind::AlreadyOpen,
            Self::Teardown { .. } => TransportErrorKind::Teardown,
        }
    }

    /// The port identifier the error concerns.
    pub fn port(&self) -> &str {
        match self {
            Self::PortNotFound { port }
            | Self::PortBusy { port, .. }
            | Self::PortAccess { port, .. }
            | Self::UnsupportedConfiguration { port, .. }
            | Self::ListenerRegistration { port, .. }
            | Self::StreamAcquisition { port, .. }
            | Self::HandshakeWrite { port, .. }
            | Self::AlreadyOpen { port }
            | Self::Teardown { port, .. } => port,
        }
    }

    /// Map a provider failure during steps 1 and 2 of `open()`.
    pub(crate) fn from_acquire(port: &str, waited: Duration, err: PortError) -> Self {
        let port = port.to_string();
        match err {
            PortError::NotFound(_) => Self::PortNotFound { port },
            PortError::Busy(_) => Self::PortBusy { port, waited },
            PortError::UnsupportedConfiguration(_) => Self::UnsupportedConfiguration {
                port,
                source: err,
            },
            source => Self::PortAccess { port, source },
        }
    }
}
