//! Notification primitives shared between the port's event thread and the
//! consumer.
//!
//! [`DataSignal`] is the "data available" channel handed to the protocol
//! stack. It is a level flag, not a queue: raising it twice before anyone
//! waits produces a single wake-up. [`StopSignal`] is a latch used to cut
//! idle waits short when the port is being closed.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Flag {
    set: Mutex<bool>,
    cond: Condvar,
}

impl Flag {
    fn set(&self) {
        let mut set = self.set.lock();
        *set = true;
        self.cond.notify_all();
    }

    fn get(&self) -> bool {
        *self.set.lock()
    }

    /// Waits until the flag is set or the timeout elapses. When `consume`
    /// is true the flag is reset before returning.
    fn wait(&self, timeout: Duration, consume: bool) -> bool {
        let deadline = Instant::now() + timeout;
        let mut set = self.set.lock();
        while !*set {
            if self.cond.wait_until(&mut set, deadline).timed_out() {
                break;
            }
        }
        if consume {
            std::mem::replace(&mut *set, false)
        } else {
            *set
        }
    }
}

/// Level-triggered notification that the hardware has bytes ready to read.
#[derive(Debug, Clone, Default)]
pub struct DataSignal {
    inner: Arc<Flag>,
}

impl DataSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark data as available and wake every waiter.
    pub fn raise(&self) {
        self.inner.set();
    }

    /// Whether the signal is currently raised.
    pub fn is_raised(&self) -> bool {
        self.inner.get()
    }

    /// Consume the signal without waiting.
    pub fn take(&self) -> bool {
        std::mem::replace(&mut *self.inner.set.lock(), false)
    }

    /// Block until the signal is raised or `timeout` elapses, consuming it.
    ///
    /// Returns `true` if the signal was raised.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.inner.wait(timeout, true)
    }
}

/// One-way latch: once stopped it stays stopped.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    inner: Arc<Flag>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.inner.set();
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.get()
    }

    /// Sleep for up to `timeout`, returning early with `true` once stopped.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.inner.wait(timeout, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_raise_before_wait_returns_immediately() {
        let signal = DataSignal::new();
        signal.raise();

        let started = Instant::now();
        assert!(signal.wait_timeout(Duration::from_secs(5)));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(!signal.is_raised());
    }

    #[test]
    fn test_wait_times_out_without_raise() {
        let signal = DataSignal::new();

        let started = Instant::now();
        assert!(!signal.wait_timeout(Duration::from_millis(50)));
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_repeated_raises_collapse() {
        let signal = DataSignal::new();
        signal.raise();
        signal.raise();
        signal.raise();

        assert!(signal.take());
        assert!(!signal.take());
    }

    #[test]
    fn test_raise_from_other_thread_wakes_waiter() {
        let signal = DataSignal::new();
        let remote = signal.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.raise();
        });

        assert!(signal.wait_timeout(Duration::from_secs(5)));
        handle.join().unwrap();
    }

    #[test]
    fn test_stop_interrupts_idle_wait() {
        let stop = StopSignal::new();
        let remote = stop.clone();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.stop();
        });

        let started = Instant::now();
        assert!(stop.wait_timeout(Duration::from_secs(30)));
        assert!(started.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();

        // Latched: later waits return at once.
        assert!(stop.wait_timeout(Duration::from_secs(30)));
        assert!(stop.is_stopped());
    }
}
