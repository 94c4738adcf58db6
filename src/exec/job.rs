// src/exec/job.rs

//! The unit of work the scheduler runs, and the context it runs in.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::exec::interrupt::{InterruptHandle, InterruptSignal};
use crate::types::{JobId, DEFAULT_RESOURCE};

/// Future returned by [`Job::execute`].
pub type JobFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

/// A unit of work with an id, blockers and a resource affinity.
///
/// The scheduler does not care what a job does. It only guarantees that
/// `execute` is called at most once per run, after every blocker has
/// completed, while holding a slot of the job's resource.
pub trait Job: Send + Sync {
    /// Identifier, unique within a batch.
    fn id(&self) -> &str;

    /// Ids of jobs that must complete before this one starts.
    fn blocker_ids(&self) -> &[String];

    /// Resource pool this job competes for.
    fn resource_id(&self) -> &str {
        DEFAULT_RESOURCE
    }

    /// Human readable name for progress reporting.
    fn label(&self) -> &str {
        self.id()
    }

    /// Run the job. An `Err` (or a panic) marks the job failed.
    ///
    /// Long-running jobs should watch [`JobContext::interrupted`] and stop
    /// early when the run is interrupted.
    fn execute<'a>(&'a self, ctx: &'a JobContext) -> JobFuture<'a>;
}

/// Context shared by every job of one run.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    batch_id: String,
    flow_id: String,
    execution_id: String,
    arguments: BTreeMap<String, String>,
    environment: BTreeMap<String, String>,
    interrupt: InterruptHandle,
}

impl ExecutionContext {
    pub fn new(
        batch_id: impl Into<String>,
        flow_id: impl Into<String>,
        execution_id: impl Into<String>,
    ) -> Self {
        Self {
            batch_id: batch_id.into(),
            flow_id: flow_id.into(),
            execution_id: execution_id.into(),
            ..Self::default()
        }
    }

    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    pub fn flow_id(&self) -> &str {
        &self.flow_id
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    pub fn arguments(&self) -> &BTreeMap<String, String> {
        &self.arguments
    }

    pub fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }

    /// Handle that interrupts the run this context is used for.
    pub fn interrupt_handle(&self) -> &InterruptHandle {
        &self.interrupt
    }
}

/// What a single job sees while it executes.
#[derive(Debug, Clone)]
pub struct JobContext {
    execution: Arc<ExecutionContext>,
    job_id: JobId,
    signal: InterruptSignal,
}

impl JobContext {
    pub fn new(execution: Arc<ExecutionContext>, job_id: JobId) -> Self {
        let signal = execution.interrupt_handle().subscribe();
        Self {
            execution,
            job_id,
            signal,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn execution(&self) -> &ExecutionContext {
        &self.execution
    }

    pub fn argument(&self, key: &str) -> Option<&str> {
        self.execution.arguments.get(key).map(String::as_str)
    }

    pub fn env(&self, key: &str) -> Option<&str> {
        self.execution.environment.get(key).map(String::as_str)
    }

    pub fn is_interrupted(&self) -> bool {
        self.signal.is_interrupted()
    }

    /// Resolve once the run is interrupted.
    pub async fn interrupted(&self) {
        let mut signal = self.signal.clone();
        signal.wait().await;
    }

    pub(crate) fn signal(&self) -> InterruptSignal {
        self.signal.clone()
    }
}
