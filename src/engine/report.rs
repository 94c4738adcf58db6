// src/engine/report.rs

//! Outcome of a scheduling run.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::dag::{JobState, RunPhase};
use crate::types::{FailurePolicy, JobId};

/// Cause of a single job failure.
#[derive(Debug)]
pub struct JobFailure {
    pub job: JobId,
    pub error: anyhow::Error,
}

/// Final per-job states of a run, plus the failure causes.
#[derive(Debug)]
pub struct RunReport {
    pub(crate) policy: FailurePolicy,
    pub(crate) phase: RunPhase,
    pub(crate) states: BTreeMap<JobId, JobState>,
    pub(crate) failures: Vec<JobFailure>,
    pub(crate) cycle: Option<Vec<JobId>>,
    pub(crate) interrupted: bool,
    pub(crate) elapsed: Duration,
}

impl RunReport {
    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Every job reached `Done`.
    pub fn is_success(&self) -> bool {
        self.states.values().all(|s| *s == JobState::Done)
    }

    pub fn state_of(&self, job: &str) -> Option<JobState> {
        self.states.get(job).copied()
    }

    pub fn states(&self) -> &BTreeMap<JobId, JobState> {
        &self.states
    }

    /// Jobs that finished successfully.
    pub fn completed(&self) -> Vec<JobId> {
        self.ids_in(|s| s == JobState::Done)
    }

    /// Jobs that ran and failed.
    pub fn failed(&self) -> Vec<JobId> {
        self.ids_in(|s| s == JobState::Failed)
    }

    /// Jobs that never ran: abandoned, or still pending when the run ended.
    pub fn incomplete(&self) -> Vec<JobId> {
        self.ids_in(|s| matches!(s, JobState::Abandoned | JobState::Pending))
    }

    /// Every job that did not reach `Done`, failed ones included.
    pub fn not_done(&self) -> Vec<JobId> {
        self.ids_in(|s| s != JobState::Done)
    }

    /// Failure causes in the order they were reported.
    pub fn failures(&self) -> &[JobFailure] {
        &self.failures
    }

    pub fn first_failure(&self) -> Option<&JobFailure> {
        self.failures.first()
    }

    /// A dependency cycle found before dispatch, if any.
    pub fn cycle(&self) -> Option<&[JobId]> {
        self.cycle.as_deref()
    }

    pub fn was_interrupted(&self) -> bool {
        self.interrupted
    }

    /// Wall-clock time from first dispatch to the end of draining.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    fn ids_in(&self, pred: impl Fn(JobState) -> bool) -> Vec<JobId> {
        self.states
            .iter()
            .filter(|(_, s)| pred(**s))
            .map(|(id, _)| id.clone())
            .collect()
    }
}
