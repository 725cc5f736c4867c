//! Core traits for the hardware port seam.
//!
//! [`PortProvider`] resolves and acquires a port by name; [`HardwarePort`]
//! is the live, exclusively owned handle the transport configures, reads,
//! writes and finally closes. Both the `serialport`-backed system port and
//! the in-memory mock implement these traits so the transport can be tested
//! without hardware.

use super::error::PortError;
use serde::{Deserialize, Serialize};
use std::io;
use std::sync::Arc;
use std::time::Duration;

/// Link parameters applied after the port has been acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSettings {
    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// Number of data bits.
    pub data_bits: DataBits,

    /// Flow control mode.
    pub flow_control: FlowControl,

    /// Parity checking mode.
    pub parity: Parity,

    /// Number of stop bits.
    pub stop_bits: StopBits,
}

/// Nominal baud rate of the ZNP firmware's UART/USB-CDC link.
pub const ZNP_BAUD_RATE: u32 = 230_400;

impl LinkSettings {
    /// 8 data bits, 1 stop bit, no parity, no flow control.
    pub fn eight_n_one(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            data_bits: DataBits::Eight,
            flow_control: FlowControl::None,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self::eight_n_one(ZNP_BAUD_RATE)
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl From<DataBits> for serialport::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => serialport::DataBits::Five,
            DataBits::Six => serialport::DataBits::Six,
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

/// Flow control modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

impl From<FlowControl> for serialport::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => serialport::FlowControl::None,
            FlowControl::Software => serialport::FlowControl::Software,
            FlowControl::Hardware => serialport::FlowControl::Hardware,
        }
    }
}

/// Parity checking modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        }
    }
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopBits {
    One,
    Two,
}

impl From<StopBits> for serialport::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        }
    }
}

/// A read that waits at most `timeout` for data.
///
/// Returns `Ok(0)` when the timeout elapses with nothing received. This is
/// the primitive [`PolledReader`](super::PolledReader) slices reads into.
pub trait TimedRead: Send {
    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize>;
}

/// Callback invoked from the port's event thread when bytes are waiting.
///
/// Runs on a thread the transport does not control; implementations must
/// return in bounded time and must not touch the transport's lifecycle.
pub trait DataListener: Send + Sync {
    fn data_available(&self);
}

/// Readable half handed out by a port.
pub type PortReader = Box<dyn io::Read + Send>;

/// Writable half handed out by a port.
pub type PortWriter = Box<dyn io::Write + Send>;

/// A live, exclusively owned serial port.
pub trait HardwarePort: Send + std::fmt::Debug {
    /// Get the name/path of this serial port.
    fn name(&self) -> &str;

    /// Apply baud rate, framing and flow control.
    fn configure_link(&mut self, link: &LinkSettings) -> Result<(), PortError>;

    /// Minimum number of bytes a blocking read waits for before returning.
    fn set_receive_threshold(&mut self, bytes: usize) -> Result<(), PortError>;

    /// Maximum time a blocking read waits before returning empty-handed.
    ///
    /// Must take effect for readers already blocked in a read, not only
    /// for subsequent reads.
    fn set_receive_timeout(&mut self, timeout: Duration) -> Result<(), PortError>;

    /// Register the single data-availability listener.
    ///
    /// Fails with [`PortError::ListenerRegistration`] if one is already
    /// registered or the platform cannot watch the port concurrently.
    fn register_listener(&mut self, listener: Arc<dyn DataListener>) -> Result<(), PortError>;

    /// Obtain the readable half of the port.
    fn reader(&mut self) -> Result<PortReader, PortError>;

    /// Obtain the writable half of the port.
    fn writer(&mut self) -> Result<PortWriter, PortError>;

    /// Stop event delivery and release the OS handle.
    ///
    /// Called once; readers and writers handed out earlier must already
    /// have been dropped by the caller.
    fn close(&mut self) -> Result<(), PortError>;
}

/// Resolves port names and acquires exclusive access to them.
pub trait PortProvider: Send + Sync + std::fmt::Debug {
    /// Open `port_name`, waiting up to `acquire_timeout` while another
    /// process holds it.
    fn open(
        &self,
        port_name: &str,
        acquire_timeout: Duration,
    ) -> Result<Box<dyn HardwarePort>, PortError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_link_is_znp_8n1() {
        let link = LinkSettings::default();
        assert_eq!(link.baud_rate, 230_400);
        assert_eq!(link.data_bits, DataBits::Eight);
        assert_eq!(link.flow_control, FlowControl::None);
        assert_eq!(link.parity, Parity::None);
        assert_eq!(link.stop_bits, StopBits::One);
    }

    #[test]
    fn test_data_bits_conversion() {
        let serialport_bits: serialport::DataBits = DataBits::Eight.into();
        assert_eq!(serialport_bits, serialport::DataBits::Eight);
    }

    #[test]
    fn test_flow_control_conversion() {
        let serialport_flow: serialport::FlowControl = FlowControl::Hardware.into();
        assert_eq!(serialport_flow, serialport::FlowControl::Hardware);
    }

    #[test]
    fn test_parity_conversion() {
        let serialport_parity: serialport::Parity = Parity::Even.into();
        assert_eq!(serialport_parity, serialport::Parity::Even);
    }

    #[test]
    fn test_stop_bits_conversion() {
        let serialport_stop_bits: serialport::StopBits = StopBits::Two.into();
        assert_eq!(serialport_stop_bits, serialport::StopBits::Two);
    }
}
