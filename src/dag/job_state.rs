// src/dag/job_state.rs

//! Per-job and per-run states.

use std::fmt;

/// State of a single job within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    /// Waiting for blockers (or for dispatch).
    Pending,
    /// Handed to a worker. The worker may still be waiting for a resource slot.
    Running,
    /// Finished successfully.
    Done,
    /// `execute` returned an error, panicked, or was interrupted.
    Failed,
    /// Will never run: a blocker failed or was abandoned, the run is failing
    /// fast, the job sits on a dependency cycle, or the run was interrupted.
    Abandoned,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Done | JobState::Failed | JobState::Abandoned)
    }

    /// Pending or running.
    pub fn is_outstanding(self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Pending => "PENDING",
            JobState::Running => "RUNNING",
            JobState::Done => "DONE",
            JobState::Failed => "FAILED",
            JobState::Abandoned => "ABANDONED",
        };
        f.write_str(s)
    }
}

/// Phase of a whole scheduling run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Initializing,
    /// New jobs are being dispatched as their blockers complete.
    Dispatching,
    /// No new dispatch; waiting for running jobs to report back.
    Draining,
    Completed,
    Failed,
}

impl RunPhase {
    pub fn is_finished(self) -> bool {
        matches!(self, RunPhase::Completed | RunPhase::Failed)
    }
}
