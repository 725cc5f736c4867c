//! Serial transport for ZigBee coordinators running TI Z-Stack ZNP firmware
//! (CC2531 USB dongle and friends).
//!
//! The transport opens the dongle's serial port at 230400 8N1, writes the
//! one-byte handshake that wakes the firmware, and hands the protocol layer
//! an input stream, an output stream and a "data available" signal.
//!
//! # Modules
//!
//! - `transport`: [`ZnpTransport`], the open/close state machine and streams
//! - `port`: hardware port abstraction, the `serialport` backend and a mock
//! - `coordinator`: coordinator lifecycle on top of any [`ByteStreamPort`]
//! - `diagnostics`: where swallowed open/close failures are reported
//! - `signal`: the data-available and stop signals
//! - `error`: transport error taxonomy
//! - `config`: TOML configuration with environment overrides
//! - `logging`: `tracing` subscriber setup
//!
//! # Example
//!
//! ```no_run
//! use std::io::Read;
//! use znp_transport::{TransportSettings, ZnpTransport};
//!
//! let mut transport = ZnpTransport::system(TransportSettings::new("/dev/ttyACM0"));
//! if transport.open() {
//!     let mut input = transport.input_stream().expect("open transport has input");
//!     let mut frame = [0u8; 64];
//!     let n = input.read(&mut frame)?;
//!     println!("{n} bytes");
//! }
//! transport.close();
//! # Ok::<(), std::io::Error>(())
//! ```

pub mod config;
pub mod coordinator;
pub mod diagnostics;
pub mod error;
pub mod logging;
pub mod port;
pub mod signal;
pub mod transport;

pub use coordinator::{Coordinator, CoordinatorStatus, NetworkIdentity};
pub use diagnostics::{DiagnosticSink, MemorySink, TracingSink};
pub use error::{TeardownStep, TransportError, TransportErrorKind, TransportResult};
pub use port::{
    HardwarePort, LinkSettings, MockPortProvider, MockSerialPort, PortError, PortProvider,
    SystemPortProvider, ZNP_BAUD_RATE,
};
pub use signal::{DataSignal, StopSignal};
pub use transport::{
    ByteStreamPort, InputStream, NotificationMode, NotificationSettings, OutputStream,
    TransportSettings, TransportState, ZnpTransport, DEFAULT_MAGIC_NUMBER,
};

pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
