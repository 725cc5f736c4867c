//! Data-availability watcher.
//!
//! The `serialport` crate has no event callbacks, so notifications come
//! from a dedicated thread that polls the number of pending input bytes and
//! invokes the registered [`DataListener`] while any are waiting. That
//! thread is the "driver-owned" context listeners run on.

use super::error::PortError;
use super::traits::DataListener;
use crate::signal::StopSignal;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, trace};

/// Background thread delivering data-available events to one listener.
#[derive(Debug)]
pub struct DataWatcher {
    stop: StopSignal,
    handle: Option<JoinHandle<()>>,
}

impl DataWatcher {
    /// Spawn the watcher. `pending` reports how many input bytes are queued.
    pub fn spawn<F>(
        port_name: &str,
        mut pending: F,
        listener: Arc<dyn DataListener>,
        poll_interval: Duration,
    ) -> Result<Self, PortError>
    where
        F: FnMut() -> io::Result<usize> + Send + 'static,
    {
        let stop = StopSignal::new();
        let thread_stop = stop.clone();
        let name = port_name.to_string();

        let handle = thread::Builder::new()
            .name(format!("znp-watch {name}"))
            .spawn(move || {
                let mut failing = false;
                while !thread_stop.is_stopped() {
                    match pending() {
                        Ok(0) => failing = false,
                        Ok(n) => {
                            failing = false;
                            trace!(port = %name, pending = n, "data available");
                            listener.data_available();
                        }
                        Err(e) => {
                            if !failing {
                                debug!(port = %name, "input probe failed: {}", e);
                            }
                            failing = true;
                        }
                    }
                    thread_stop.wait_timeout(poll_interval);
                }
                trace!(port = %name, "watcher stopped");
            })
            .map_err(|e| PortError::listener(format!("cannot start watcher thread: {e}")))?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Stop the thread and wait for it to exit.
    ///
    /// A listener in the middle of a callback delays this by however long
    /// the callback takes.
    pub fn stop(&mut self) -> Result<(), PortError> {
        self.stop.stop();
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| PortError::listener("watcher thread panicked")),
            None => Ok(()),
        }
    }
}

impl Drop for DataWatcher {
    fn drop(&mut self) {
        self.stop.stop();
    }
}
