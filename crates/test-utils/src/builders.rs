#![allow(dead_code)]

use std::sync::Arc;

use parajob::{Job, ParallelJobScheduler};

use crate::scripted::ScriptedJob;

/// Scheduler with the given `parallel.<resource>` multiplexities.
///
/// `scheduler(&[("default", 2), ("io", 1)])`
pub fn scheduler(resources: &[(&str, usize)]) -> ParallelJobScheduler {
    let props = resources
        .iter()
        .map(|(name, n)| (format!("parallel.{name}"), n.to_string()));
    ParallelJobScheduler::from_properties(props).expect("Failed to build scheduler from test properties")
}

/// Upcast scripted jobs into the submission type the scheduler takes.
pub fn as_jobs(jobs: &[Arc<ScriptedJob>]) -> Vec<Arc<dyn Job>> {
    jobs.iter()
        .map(|job| Arc::clone(job) as Arc<dyn Job>)
        .collect()
}
