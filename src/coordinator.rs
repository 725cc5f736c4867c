//! Coordinator lifecycle.
//!
//! Composes a [`ByteStreamPort`] with the network identity it serves and
//! tracks whether the coordinator is reachable. The protocol stack pulls
//! streams from [`Coordinator::port`] once the coordinator is online.

use crate::transport::ByteStreamPort;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// PAN and radio channel the coordinator is expected to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkIdentity {
    pub pan_id: u16,
    pub channel: u8,
}

/// Reachability of the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorStatus {
    Uninitialized,
    Online,
    Offline { reason: String },
}

/// Reason reported when the transport cannot be opened.
pub const COORDINATOR_UNAVAILABLE: &str = "coordinator unavailable";

#[derive(Debug)]
pub struct Coordinator<P> {
    port: P,
    network: NetworkIdentity,
    status: CoordinatorStatus,
}

impl<P: ByteStreamPort> Coordinator<P> {
    pub fn new(port: P, network: NetworkIdentity) -> Self {
        Self {
            port,
            network,
            status: CoordinatorStatus::Uninitialized,
        }
    }

    /// Open the transport. On failure the coordinator goes offline; no
    /// partial functionality is assumed.
    pub fn initialize(&mut self) -> &CoordinatorStatus {
        if self.status == CoordinatorStatus::Online {
            return &self.status;
        }
        debug!("Initializing ZigBee ZNP serial bridge handler.");

        info!(
            "ZigBee Coordinator ZNP opening Port:'{}' PAN:{:x}, Channel:{}",
            self.port.port_name(),
            self.network.pan_id,
            self.network.channel
        );

        self.status = if self.port.open() {
            CoordinatorStatus::Online
        } else {
            warn!("ZigBee coordinator on {} unavailable", self.port.port_name());
            CoordinatorStatus::Offline {
                reason: COORDINATOR_UNAVAILABLE.to_string(),
            }
        };
        &self.status
    }

    /// Close the transport.
    pub fn dispose(&mut self) {
        self.port.close();
        self.status = CoordinatorStatus::Offline {
            reason: "disposed".to_string(),
        };
    }

    pub fn status(&self) -> &CoordinatorStatus {
        &self.status
    }

    pub fn network(&self) -> NetworkIdentity {
        self.network
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use crate::port::{MockPortProvider, MockSerialPort};
    use crate::transport::{TransportSettings, ZnpTransport};
    use std::sync::Arc;
    use std::time::Duration;

    const NETWORK: NetworkIdentity = NetworkIdentity {
        pan_id: 0x1A62,
        channel: 11,
    };

    fn coordinator(provider: MockPortProvider) -> Coordinator<ZnpTransport> {
        let settings = TransportSettings::new("/dev/ttyACM0")
            .with_acquire_timeout(Duration::from_millis(20));
        let transport =
            ZnpTransport::new(settings, Arc::new(provider), Arc::new(MemorySink::new()));
        Coordinator::new(transport, NETWORK)
    }

    #[test]
    fn test_initialize_brings_coordinator_online() {
        let mock = MockSerialPort::new("/dev/ttyACM0");
        let provider = MockPortProvider::new();
        provider.insert(mock.clone());
        let mut coordinator = coordinator(provider);

        assert_eq!(coordinator.initialize(), &CoordinatorStatus::Online);
        assert!(coordinator.port().input_stream().is_some());
        assert_eq!(mock.written(), vec![0xEF]);

        // Idempotent while online.
        assert_eq!(coordinator.initialize(), &CoordinatorStatus::Online);
        assert_eq!(mock.acquire_count(), 1);
    }

    #[test]
    fn test_reinitialize_while_online_logs_nothing() {
        let provider = MockPortProvider::new();
        provider.insert(MockSerialPort::new("/dev/ttyACM0"));
        let mut coordinator = coordinator(provider);

        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || CapturedLog(Arc::clone(&sink)))
            .finish();

        let status = tracing::subscriber::with_default(subscriber, || {
            coordinator.initialize();
            log.lock().clear();
            coordinator.initialize().clone()
        });

        assert_eq!(status, CoordinatorStatus::Online);
        assert_eq!(String::from_utf8_lossy(&log.lock()), "");
    }

    struct CapturedLog(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_missing_dongle_leaves_coordinator_offline() {
        let mut coordinator = coordinator(MockPortProvider::new());

        assert_eq!(
            coordinator.initialize(),
            &CoordinatorStatus::Offline {
                reason: COORDINATOR_UNAVAILABLE.to_string()
            }
        );
        assert!(coordinator.port().output_stream().is_none());
    }

    #[test]
    fn test_dispose_closes_transport() {
        let mock = MockSerialPort::new("/dev/ttyACM0");
        let provider = MockPortProvider::new();
        provider.insert(mock.clone());
        let mut coordinator = coordinator(provider);
        coordinator.initialize();

        coordinator.dispose();

        assert!(!mock.is_held());
        assert!(coordinator.port().input_stream().is_none());
        assert!(matches!(
            coordinator.status(),
            CoordinatorStatus::Offline { .. }
        ));
    }
}
