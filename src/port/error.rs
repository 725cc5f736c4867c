//! Port-specific error types.
//!
//! These describe what the hardware port provider reported. The transport
//! adapter maps them onto its own [`TransportError`](crate::TransportError)
//! according to the open step that failed.

use thiserror::Error;

/// Errors that can occur during serial port operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// The specified serial port was not found on the system.
    #[error("Serial port not found: {0}")]
    NotFound(String),

    /// Another process holds the port.
    #[error("Serial port {0} is in use")]
    Busy(String),

    /// The driver rejected a link or read parameter.
    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    /// A data listener could not be registered on the port.
    #[error("Listener registration failed: {0}")]
    ListenerRegistration(String),

    /// The port could not hand out a reader or writer.
    #[error("Stream unavailable: {0}")]
    StreamUnavailable(String),

    /// The port has already been closed.
    #[error("Port is closed")]
    Closed,

    /// An I/O error occurred during port operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    /// Create a NotFound error from a port name.
    pub fn not_found(port_name: impl Into<String>) -> Self {
        Self::NotFound(port_name.into())
    }

    /// Create a Busy error from a port name.
    pub fn busy(port_name: impl Into<String>) -> Self {
        Self::Busy(port_name.into())
    }

    /// Create an UnsupportedConfiguration error from a message.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedConfiguration(message.into())
    }

    /// Create a ListenerRegistration error from a message.
    pub fn listener(message: impl Into<String>) -> Self {
        Self::ListenerRegistration(message.into())
    }

    /// Create a StreamUnavailable error from a message.
    pub fn stream(message: impl Into<String>) -> Self {
        Self::StreamUnavailable(message.into())
    }

    /// Whether a retry after a short wait could succeed.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PortError::not_found("/dev/ttyACM0");
        assert_eq!(err.to_string(), "Serial port not found: /dev/ttyACM0");

        let err = PortError::busy("/dev/ttyACM0");
        assert_eq!(err.to_string(), "Serial port /dev/ttyACM0 is in use");

        let err = PortError::unsupported("baud rate 230400");
        assert_eq!(
            err.to_string(),
            "Unsupported configuration: baud rate 230400"
        );
    }

    #[test]
    fn test_is_busy() {
        assert!(PortError::busy("COM3").is_busy());
        assert!(!PortError::not_found("COM3").is_busy());
        assert!(!PortError::Closed.is_busy());
    }
}
