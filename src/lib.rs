// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod monitor;
pub mod resource;
pub mod scheduler;
pub mod types;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use tracing::{debug, error, info};

pub use crate::config::SchedulerConfig;
pub use crate::engine::{JobFailure, RunReport, RuntimeOptions};
pub use crate::errors::{ConfigError, GraphError, ParajobError, ScheduleError};
pub use crate::exec::{CommandJob, ExecutionContext, InterruptHandle, Job, JobContext, JobFuture};
pub use crate::monitor::{Monitor, NullMonitor, TracingMonitor};
pub use crate::scheduler::ParallelJobScheduler;
pub use crate::types::{FailurePolicy, JobId, DEFAULT_RESOURCE};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, load_and_validate};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - one `CommandJob` per `[job.<id>]` table
/// - the scheduler with a tracing monitor
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.clone();
    let cfg = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let policy = args.policy.map(FailurePolicy::from).unwrap_or(cfg.failure_policy);

    let jobs: Vec<Arc<dyn Job>> = cfg
        .job
        .iter()
        .map(|(id, job)| {
            let job = CommandJob::from_config(id, job);
            debug!(job = %id, cmd = %job.cmd(), resource = %job.resource_id(), "configured job");
            Arc::new(job) as Arc<dyn Job>
        })
        .collect();

    let flow_id = config_path.display().to_string();
    let context = args.args.iter().fold(
        ExecutionContext::new(&args.batch_id, flow_id, execution_id()),
        |ctx, (key, value)| ctx.with_argument(key, value),
    );

    // Ctrl-C → interrupt the run.
    {
        let handle = context.interrupt_handle().clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            handle.interrupt();
        });
    }

    info!(
        jobs = jobs.len(),
        %policy,
        execution_id = %context.execution_id(),
        "starting batch"
    );

    let scheduler = ParallelJobScheduler::new(cfg.scheduler.clone());
    match scheduler
        .execute(Arc::new(TracingMonitor), context, jobs, policy)
        .await
    {
        Ok(report) => {
            info!(
                completed = report.completed().len(),
                elapsed_ms = report.elapsed().as_millis() as u64,
                "batch completed"
            );
            Ok(())
        }
        Err(err) => {
            if let Some(report) = err.report() {
                for failure in report.failures() {
                    let cause = format!("{:#}", failure.error);
                    error!(job = %failure.job, error = %cause, "job failed");
                }
                eprintln!("jobs not done: {}", report.not_done().join(", "));
            }
            Err(ParajobError::from(err).into())
        }
    }
}

/// Unique enough to tell runs apart in job logs.
fn execution_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("{}-{}", std::process::id(), millis)
}

/// Simple dry-run output: print resources, jobs, blockers and commands.
fn print_dry_run(cfg: &ConfigFile) {
    println!("parajob dry-run");
    println!("  failure_policy = {}", cfg.failure_policy);
    println!();

    println!("resources:");
    for (resource, multiplexity) in cfg.scheduler.resources() {
        println!("  - {resource} = {multiplexity}");
    }
    println!();

    println!("jobs ({}):", cfg.job.len());
    for (id, job) in cfg.job.iter() {
        println!("  - {id}");
        println!("      cmd: {}", job.cmd);
        println!("      resource: {}", job.effective_resource());
        if !job.blockers.is_empty() {
            println!("      blockers: {:?}", job.blockers);
        }
        if let Some(label) = &job.label {
            println!("      label: {label}");
        }
    }
}
