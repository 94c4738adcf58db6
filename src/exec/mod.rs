// src/exec/mod.rs

//! Job execution layer.
//!
//! - [`job`] defines the [`Job`] trait the scheduler consumes, the
//!   per-run [`ExecutionContext`] and the per-job [`JobContext`].
//! - [`interrupt`] provides the run-wide interrupt signal.
//! - [`worker`] runs one dispatched job: wait for a resource slot, bracket
//!   the execution with monitor calls, run it, report back.
//! - [`command`] provides [`CommandJob`], a job that runs a shell command.

pub mod command;
pub mod interrupt;
pub mod job;
pub mod worker;

pub use command::CommandJob;
pub use interrupt::{InterruptHandle, InterruptSignal};
pub use job::{ExecutionContext, Job, JobContext, JobFuture};
pub use worker::Worker;
