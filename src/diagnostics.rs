//! Diagnostic reporting for failures the transport swallows.
//!
//! The transport never propagates `close()` errors and turns `open()`
//! errors into `false`; what went wrong is handed to a [`DiagnosticSink`]
//! supplied at construction.

use crate::error::{TransportError, TransportErrorKind};
use parking_lot::Mutex;
use tracing::{error, warn};

/// Receives transport failures that are not returned to the caller.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, error: &TransportError);
}

/// Default sink: logs through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, err: &TransportError) {
        match err.kind() {
            TransportErrorKind::Teardown => warn!(port = %err.port(), "{}", err),
            _ => error!(port = %err.port(), "Serial Error: {}", err),
        }
    }
}

/// Keeps reports in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    reports: Mutex<Vec<(TransportErrorKind, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kinds of every report received, oldest first.
    pub fn kinds(&self) -> Vec<TransportErrorKind> {
        self.reports.lock().iter().map(|(kind, _)| *kind).collect()
    }

    /// Rendered messages of every report received, oldest first.
    pub fn messages(&self) -> Vec<String> {
        self.reports.lock().iter().map(|(_, msg)| msg.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.lock().is_empty()
    }

    pub fn clear(&self) {
        self.reports.lock().clear();
    }
}

impl DiagnosticSink for MemorySink {
    fn report(&self, err: &TransportError) {
        self.reports.lock().push((err.kind(), err.to_string()));
    }
}
