// src/dag/mod.rs

//! Job graph representation and per-run state.
//!
//! - [`graph`] holds the immutable blocker relationships of one run.
//! - [`cycle`] finds dependency cycles before anything is dispatched.
//! - [`job_state`] defines per-job and per-run states.
//! - [`state`] tracks job states for a run and drives abandonment.
//! - [`dispatch_step`] defines the result type of one dispatch decision.

pub mod cycle;
pub mod dispatch_step;
pub mod graph;
pub mod job_state;
pub mod state;

pub use dispatch_step::DispatchStep;
pub use graph::DependencyGraph;
pub use job_state::{JobState, RunPhase};
pub use state::ExecutionState;
