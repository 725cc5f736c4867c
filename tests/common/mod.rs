//! Shared fixtures for the integration tests.
//!
//! A [`Rig`] wires a [`ZnpTransport`] to a [`MockSerialPort`] through a
//! [`MockPortProvider`] and collects diagnostics in a [`MemorySink`].

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;
use znp_transport::port::{MockPortProvider, MockSerialPort};
use znp_transport::{MemorySink, TransportSettings, ZnpTransport};

/// Device name the mock dongle is registered under.
pub const DONGLE: &str = "/dev/ttyZNP0";

pub struct Rig {
    pub transport: ZnpTransport,
    pub mock: MockSerialPort,
    pub provider: Arc<MockPortProvider>,
    pub sink: Arc<MemorySink>,
}

/// Settings for [`DONGLE`] with a short acquire timeout.
pub fn settings() -> TransportSettings {
    TransportSettings::new(DONGLE).with_acquire_timeout(Duration::from_millis(100))
}

/// Transport with a plugged-in mock dongle.
pub fn rig(settings: TransportSettings) -> Rig {
    let mock = MockSerialPort::new(DONGLE);
    let provider = Arc::new(MockPortProvider::new());
    provider.insert(mock.clone());
    let sink = Arc::new(MemorySink::new());
    let transport = ZnpTransport::new(settings, provider.clone(), sink.clone());
    Rig {
        transport,
        mock,
        provider,
        sink,
    }
}

/// Transport whose configured port does not exist.
pub fn unplugged(settings: TransportSettings) -> (ZnpTransport, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let transport = ZnpTransport::new(settings, Arc::new(MockPortProvider::new()), sink.clone());
    (transport, sink)
}
