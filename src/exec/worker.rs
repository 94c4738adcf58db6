// src/exec/worker.rs

//! Runs a single dispatched job.

use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::engine::{JobOutcome, WorkerEvent};
use crate::exec::job::{Job, JobContext};
use crate::monitor::Monitor;
use crate::resource::ResourcePool;

/// One dispatched job on its way through a resource slot.
///
/// The worker:
/// 1. waits for a slot of the job's resource (or gives up if the run is
///    interrupted first),
/// 2. opens the job's monitor bracket,
/// 3. runs `execute` in its own task so that a panic is caught as a failure,
/// 4. closes the bracket, releases the slot and reports the outcome.
pub struct Worker {
    job: Arc<dyn Job>,
    pool: Arc<ResourcePool>,
    monitor: Arc<dyn Monitor>,
    ctx: JobContext,
    events: mpsc::Sender<WorkerEvent>,
    kill: watch::Receiver<bool>,
}

impl Worker {
    pub fn new(
        job: Arc<dyn Job>,
        pool: Arc<ResourcePool>,
        monitor: Arc<dyn Monitor>,
        ctx: JobContext,
        events: mpsc::Sender<WorkerEvent>,
        kill: watch::Receiver<bool>,
    ) -> Self {
        Self {
            job,
            pool,
            monitor,
            ctx,
            events,
            kill,
        }
    }

    pub async fn run(mut self) {
        let job = self.ctx.job_id().to_string();
        let outcome = self.run_inner().await;

        if self
            .events
            .send(WorkerEvent::Finished { job: job.clone(), outcome })
            .await
            .is_err()
        {
            warn!(job = %job, "coordinator went away before the job reported back");
        }
    }

    async fn run_inner(&mut self) -> JobOutcome {
        let id = self.ctx.job_id().to_string();
        let requested = self.job.resource_id().to_string();
        let mut signal = self.ctx.signal();

        // Waiting for a slot is the only place a dispatched job can still be
        // withdrawn without running.
        let permit = tokio::select! {
            acquired = self.pool.acquire(&requested) => match acquired {
                Ok(permit) => permit,
                Err(closed) => {
                    debug!(job = %id, error = %closed, "gave up waiting for a resource slot");
                    return JobOutcome::Withdrawn;
                }
            },
            _ = signal.wait() => {
                debug!(job = %id, "interrupted while waiting for a resource slot");
                return JobOutcome::Withdrawn;
            }
        };
        if self.ctx.is_interrupted() || *self.kill.borrow() {
            return JobOutcome::Withdrawn;
        }

        let label = self.job.label().to_string();
        self.monitor.open(&label, 1);
        info!(
            job = %id,
            resource = %permit.resource(),
            free_slots = self.pool.available(&requested),
            "starting job"
        );
        if self
            .events
            .send(WorkerEvent::Started { job: id.clone() })
            .await
            .is_err()
        {
            warn!(job = %id, "coordinator went away before the job started");
        }

        let job = Arc::clone(&self.job);
        let ctx = self.ctx.clone();
        let handle = tokio::spawn(async move { job.execute(&ctx).await });
        let abort = handle.abort_handle();

        let outcome = tokio::select! {
            joined = handle => match joined {
                Ok(Ok(())) => {
                    info!(job = %id, "job succeeded");
                    JobOutcome::Succeeded
                }
                Ok(Err(err)) => JobOutcome::Failed(err),
                Err(join_err) if join_err.is_panic() => {
                    error!(job = %id, "job panicked");
                    JobOutcome::Failed(anyhow!("job '{id}' panicked: {}", panic_message(join_err)))
                }
                Err(join_err) => JobOutcome::Failed(anyhow!("job '{id}' was cancelled: {join_err}")),
            },
            _ = wait_for_kill(&mut self.kill) => {
                abort.abort();
                JobOutcome::Failed(anyhow!(
                    "job '{id}' did not stop within the interrupt grace period and was aborted"
                ))
            }
        };

        self.monitor.close(&label);
        self.pool.release(permit);
        outcome
    }
}

/// Resolves on an explicit kill, or once the coordinator is gone.
async fn wait_for_kill(kill: &mut watch::Receiver<bool>) {
    let _ = kill.wait_for(|k| *k).await;
}

fn panic_message(err: tokio::task::JoinError) -> String {
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
