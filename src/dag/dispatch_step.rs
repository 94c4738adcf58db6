// src/dag/dispatch_step.rs

//! Result type of a single dispatch decision.

use crate::types::JobId;

/// What changed as a result of one core "step" (start, completion, interrupt).
///
/// Tests use this to drive the core by hand and assert on each transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchStep {
    /// Jobs that were marked `Running` and must be handed to workers now.
    pub dispatch: Vec<JobId>,
    /// Jobs newly marked `Abandoned` in this step.
    pub newly_abandoned: Vec<JobId>,
    /// Whether this step ended the run (nothing pending or running remains).
    pub run_just_finished: bool,
}
