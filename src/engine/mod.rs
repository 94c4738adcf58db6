// src/engine/mod.rs

//! Orchestration engine for one scheduling run.
//!
//! The pure dispatch state machine lives in [`core`]: it owns the
//! [`ExecutionState`](crate::dag::ExecutionState), applies the failure policy
//! and decides which jobs to hand out. The async shell in [`runtime`] spawns
//! workers, reads their completion events from a channel, and handles
//! interruption and draining. [`report`] holds the run's outcome.

use std::time::Duration;

use crate::types::JobId;

/// Outcome of one dispatched job, as reported by its worker.
#[derive(Debug)]
pub enum JobOutcome {
    Succeeded,
    /// `execute` returned an error, panicked, or was aborted.
    Failed(anyhow::Error),
    /// The worker gave up before calling `execute` because the run was
    /// interrupted while it waited for a resource slot.
    Withdrawn,
}

/// Events flowing from workers to the coordinator.
#[derive(Debug)]
pub enum WorkerEvent {
    /// The worker holds a resource slot and is about to call `execute`.
    Started { job: JobId },
    /// The worker is done with the job and has released its slot.
    Finished { job: JobId, outcome: JobOutcome },
}

/// Knobs for the coordinator.
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    /// How long running jobs get to react to an interrupt before their tasks
    /// are aborted.
    pub interrupt_grace: Duration,
    /// Label of the batch-level monitor bracket.
    pub batch_label: String,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            interrupt_grace: Duration::from_secs(10),
            batch_label: "batch".to_string(),
        }
    }
}

pub mod core;
pub mod report;
pub mod runtime;

pub use core::DispatchCore;
pub use report::{JobFailure, RunReport};
pub use runtime::Runtime;
