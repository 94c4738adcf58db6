// src/monitor.rs

//! Progress reporting sink.
//!
//! The scheduler calls the monitor at fixed points only:
//! - `open(batch, N)` when a run starts, `close(batch)` when it ends, and
//!   `progressed(batch, 1)` each time a job finishes or is abandoned;
//! - `open(label, 1)` right before a job executes and `close(label)` right
//!   after, whatever the outcome.

use tracing::info;

pub trait Monitor: Send + Sync {
    fn open(&self, label: &str, units: u64);

    fn progressed(&self, label: &str, units: u64) {
        let _ = (label, units);
    }

    fn close(&self, label: &str);
}

/// Monitor that logs every call through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMonitor;

impl Monitor for TracingMonitor {
    fn open(&self, label: &str, units: u64) {
        info!(target: "parajob::monitor", label, units, "opened");
    }

    fn progressed(&self, label: &str, units: u64) {
        tracing::debug!(target: "parajob::monitor", label, units, "progressed");
    }

    fn close(&self, label: &str) {
        info!(target: "parajob::monitor", label, "closed");
    }
}

/// Monitor that ignores every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMonitor;

impl Monitor for NullMonitor {
    fn open(&self, _label: &str, _units: u64) {}

    fn close(&self, _label: &str) {}
}
