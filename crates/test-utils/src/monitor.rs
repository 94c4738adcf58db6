use std::sync::Mutex;

use parajob::Monitor;

/// One call made on a [`RecordingMonitor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorCall {
    Open { label: String, units: u64 },
    Progressed { label: String, units: u64 },
    Close { label: String },
}

/// Monitor that records every call in order.
#[derive(Debug, Default)]
pub struct RecordingMonitor {
    calls: Mutex<Vec<MonitorCall>>,
}

impl RecordingMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<MonitorCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn opens(&self, label: &str) -> Vec<u64> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MonitorCall::Open { label: l, units } if l == label => Some(units),
                _ => None,
            })
            .collect()
    }

    pub fn close_count(&self, label: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, MonitorCall::Close { label: l } if l == label))
            .count()
    }

    /// Sum of `progressed` units reported for `label`.
    pub fn progress(&self, label: &str) -> u64 {
        self.calls()
            .iter()
            .filter_map(|c| match c {
                MonitorCall::Progressed { label: l, units } if l == label => Some(*units),
                _ => None,
            })
            .sum()
    }

    /// Position of the first call matching `pred`.
    pub fn position(&self, pred: impl Fn(&MonitorCall) -> bool) -> Option<usize> {
        self.calls().iter().position(pred)
    }

    fn push(&self, call: MonitorCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Monitor for RecordingMonitor {
    fn open(&self, label: &str, units: u64) {
        self.push(MonitorCall::Open {
            label: label.to_string(),
            units,
        });
    }

    fn progressed(&self, label: &str, units: u64) {
        self.push(MonitorCall::Progressed {
            label: label.to_string(),
            units,
        });
    }

    fn close(&self, label: &str) {
        self.push(MonitorCall::Close {
            label: label.to_string(),
        });
    }
}
