//! Port abstraction layer for serial communication.
//!
//! Provides the hardware port seam the transport is written against, the
//! `serialport`-backed system implementation and an in-memory mock for
//! tests.

pub mod error;
pub mod mock;
pub mod reader;
pub mod system_port;
pub mod traits;
pub mod watcher;

pub use error::PortError;
pub use mock::{MockFailure, MockPortProvider, MockSerialPort, PortEvent};
pub use reader::{PolledReader, ReadControl, POLL_SLICE};
pub use system_port::{available_ports, PortSummary, SystemPort, SystemPortProvider};
pub use traits::*;
pub use watcher::DataWatcher;
