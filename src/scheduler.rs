// src/scheduler.rs

//! Public entry point: run a batch of interdependent jobs in parallel.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::SchedulerConfig;
use crate::dag::DependencyGraph;
use crate::engine::{DispatchCore, RunReport, Runtime, RuntimeOptions};
use crate::errors::{ConfigError, ScheduleError};
use crate::exec::{ExecutionContext, Job};
use crate::monitor::Monitor;
use crate::resource::ResourcePool;
use crate::types::FailurePolicy;

/// Runs job batches across per-resource slot pools.
///
/// The scheduler itself is stateless between calls: every [`execute`]
/// builds a fresh graph, state table and resource pool.
///
/// [`execute`]: ParallelJobScheduler::execute
#[derive(Debug, Clone)]
pub struct ParallelJobScheduler {
    config: SchedulerConfig,
    options: RuntimeOptions,
}

impl ParallelJobScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            options: RuntimeOptions::default(),
        }
    }

    /// Build from `parallel.<resource> = <N>` properties.
    ///
    /// Fails if `parallel.default` is missing or any multiplexity is not a
    /// positive integer.
    pub fn from_properties<I, K, V>(props: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Ok(Self::new(SchedulerConfig::from_properties(props)?))
    }

    pub fn with_options(mut self, options: RuntimeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Run `jobs` to completion.
    ///
    /// Returns the report when every job reached `Done`. Otherwise returns an
    /// error that still carries the report, so callers can see exactly which
    /// jobs failed and which never ran. A malformed job set (duplicate ids,
    /// unknown blockers) is rejected before any job runs.
    pub async fn execute(
        &self,
        monitor: Arc<dyn Monitor>,
        context: ExecutionContext,
        jobs: Vec<Arc<dyn Job>>,
        policy: FailurePolicy,
    ) -> Result<RunReport, ScheduleError> {
        let graph = DependencyGraph::build(
            jobs.iter()
                .map(|job| (job.id(), job.blocker_ids().iter().map(String::as_str))),
        )?;
        let graph = Arc::new(graph);

        let pool = Arc::new(ResourcePool::new(&self.config));
        for job in &jobs {
            let resource = job.resource_id();
            let serving = pool.resolve(resource);
            if serving != resource {
                info!(
                    job = %job.id(),
                    resource = %resource,
                    pool = %serving,
                    slots = pool.multiplexity(resource),
                    "resource not configured; sharing the default pool"
                );
            }
        }

        let core = DispatchCore::new(Arc::clone(&graph), policy);
        let runtime = Runtime::new(
            core,
            jobs,
            pool,
            monitor,
            Arc::new(context),
            self.options.clone(),
        );

        let report = runtime.run().await;
        into_result(report)
    }
}

fn into_result(report: RunReport) -> Result<RunReport, ScheduleError> {
    if report.is_success() {
        return Ok(report);
    }

    warn!(
        failed = ?report.failed(),
        incomplete = ?report.incomplete(),
        "run did not complete every job"
    );

    let report = Box::new(report);
    if let Some(cycle) = report.cycle().map(<[String]>::to_vec) {
        Err(ScheduleError::DependencyCycle { cycle, report })
    } else if report.was_interrupted() {
        Err(ScheduleError::Interrupted { report })
    } else {
        Err(ScheduleError::JobsFailed { report })
    }
}
