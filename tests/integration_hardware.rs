//! Tests against a real ZNP dongle.
//!
//! ```bash
//! export TEST_PORT=/dev/ttyACM0        # or COM3
//! cargo test --features hardware-tests -- --ignored
//! ```
//!
//! The dongle must be flashed with Z-Stack ZNP firmware and not held by
//! another process.

#![cfg(feature = "hardware-tests")]

use std::env;
use std::io::{Read, Write};
use std::time::{Duration, Instant};
use znp_transport::port::available_ports;
use znp_transport::{TransportErrorKind, TransportSettings, ZnpTransport};

fn test_port() -> Option<String> {
    let port = env::var("TEST_PORT").ok();
    if port.is_none() {
        println!("Skipping hardware test: TEST_PORT not set");
    }
    port
}

#[test]
#[ignore]
fn dongle_is_listed() {
    let Some(port) = test_port() else { return };

    let ports = available_ports().unwrap();
    assert!(
        ports.iter().any(|p| p.name == port),
        "{port} not among {:?}",
        ports.iter().map(|p| &p.name).collect::<Vec<_>>()
    );
}

#[test]
#[ignore]
fn open_handshake_close() {
    let Some(port) = test_port() else { return };
    let mut transport = ZnpTransport::system(TransportSettings::new(&port));

    transport.try_open().unwrap();
    assert!(transport.input_stream().is_some());

    transport.close();
    assert!(transport.output_stream().is_none());

    // The OS handle is really gone: a second open succeeds at once.
    transport.try_open().unwrap();
    transport.close();
}

#[test]
#[ignore]
fn sys_ping_gets_answer() {
    let Some(port) = test_port() else { return };
    let mut transport = ZnpTransport::system(TransportSettings::new(&port));
    transport.try_open().unwrap();

    // SYS_PING request: SOF, len 0, cmd 0x21 0x01, FCS.
    let mut output = transport.output_stream().unwrap();
    output.write_all(&[0xFE, 0x00, 0x21, 0x01, 0x20]).unwrap();
    output.flush().unwrap();

    let mut input = transport.input_stream().unwrap();
    let mut buf = [0u8; 64];
    let deadline = Instant::now() + Duration::from_secs(3);
    let mut received = Vec::new();
    while Instant::now() < deadline && received.len() < 7 {
        let n = input.read(&mut buf).unwrap();
        received.extend_from_slice(&buf[..n]);
    }
    transport.close();

    // SRSP header for SYS_PING: SOF, len 2, cmd 0x61 0x01.
    assert!(received.len() >= 4, "no response: {received:02X?}");
    let start = received.iter().position(|b| *b == 0xFE).unwrap();
    assert_eq!(&received[start + 2..start + 4], &[0x61, 0x01]);
}

#[test]
#[ignore]
fn second_transport_sees_busy_port() {
    let Some(port) = test_port() else { return };
    let mut first = ZnpTransport::system(TransportSettings::new(&port));
    first.try_open().unwrap();

    let mut second = ZnpTransport::system(
        TransportSettings::new(&port).with_acquire_timeout(Duration::from_millis(300)),
    );
    let err = second.try_open().unwrap_err();
    first.close();

    // Exclusive access is enforced by the OS driver; some report it as a
    // generic access error instead of busy.
    assert!(matches!(
        err.kind(),
        TransportErrorKind::PortBusy | TransportErrorKind::PortAccess
    ));
}

#[test]
#[ignore]
fn missing_device_fails_fast() {
    let mut transport = ZnpTransport::system(TransportSettings::new(if cfg!(windows) {
        "COM250"
    } else {
        "/dev/ttyZNP-does-not-exist"
    }));

    let err = transport.try_open().unwrap_err();
    assert_eq!(err.kind(), TransportErrorKind::PortNotFound);
}
