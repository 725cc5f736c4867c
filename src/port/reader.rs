//! Timeout-sliced blocking reader.
//!
//! A blocking read must honour the receive timeout *currently* configured on
//! the port, not the one in force when the read started: `close()` shrinks
//! the timeout so a reader parked in a 2 s read wakes promptly. Drivers
//! usually capture the timeout at call time, so [`PolledReader`] waits in
//! short slices and re-reads the shared [`ReadControl`] between them.

use super::traits::TimedRead;
use std::io::{self, Read};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Longest single wait handed to the underlying driver.
pub const POLL_SLICE: Duration = Duration::from_millis(20);

/// Receive threshold and timeout shared between a port and its readers.
#[derive(Debug)]
pub struct ReadControl {
    threshold: AtomicUsize,
    timeout_us: AtomicU64,
}

impl ReadControl {
    pub fn new(threshold: usize, timeout: Duration) -> Self {
        Self {
            threshold: AtomicUsize::new(threshold),
            timeout_us: AtomicU64::new(duration_to_us(timeout)),
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold.load(Ordering::Acquire)
    }

    pub fn set_threshold(&self, bytes: usize) {
        self.threshold.store(bytes, Ordering::Release);
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_micros(self.timeout_us.load(Ordering::Acquire))
    }

    pub fn set_timeout(&self, timeout: Duration) {
        self.timeout_us
            .store(duration_to_us(timeout), Ordering::Release);
    }
}

impl Default for ReadControl {
    fn default() -> Self {
        Self::new(1, Duration::from_secs(2))
    }
}

fn duration_to_us(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

/// Blocking reader that returns once `threshold` bytes have arrived or the
/// receive timeout has elapsed, whichever comes first.
///
/// `Ok(0)` means the timeout elapsed with nothing received; it is not EOF.
pub struct PolledReader<R> {
    inner: R,
    control: Arc<ReadControl>,
}

impl<R: TimedRead> PolledReader<R> {
    pub fn new(inner: R, control: Arc<ReadControl>) -> Self {
        Self { inner, control }
    }
}

impl<R: TimedRead> Read for PolledReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let started = Instant::now();
        let mut filled = 0;

        loop {
            let threshold = self.control.threshold().clamp(1, buf.len());
            if filled >= threshold {
                return Ok(filled);
            }

            let elapsed = started.elapsed();
            let timeout = self.control.timeout();
            if elapsed >= timeout {
                return Ok(filled);
            }

            let slice = (timeout - elapsed).min(POLL_SLICE);
            filled += self.inner.read_timeout(&mut buf[filled..], slice)?;
        }
    }
}
