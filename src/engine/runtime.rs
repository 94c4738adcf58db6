// src/engine/runtime.rs

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::dag::DispatchStep;
use crate::exec::{ExecutionContext, Job, JobContext, Worker};
use crate::monitor::Monitor;
use crate::resource::ResourcePool;
use crate::types::JobId;

use super::core::DispatchCore;
use super::report::RunReport;
use super::{JobOutcome, RuntimeOptions, WorkerEvent};

/// Coordinator of one scheduling run.
///
/// This is the async IO shell around [`DispatchCore`]: it owns the core (and
/// with it every job state), spawns a [`Worker`] per dispatched job, and
/// feeds worker completion events back into the core until the run is over.
/// Workers never touch job state directly; they only send events.
pub struct Runtime {
    core: DispatchCore,
    jobs: HashMap<JobId, Arc<dyn Job>>,
    monitor: Arc<dyn Monitor>,
    context: Arc<ExecutionContext>,
    options: RuntimeOptions,
    event_tx: mpsc::Sender<WorkerEvent>,
    event_rx: mpsc::Receiver<WorkerEvent>,
    workers: WorkerControl,
    active: HashSet<JobId>,
}

/// Levers over every worker of a run.
///
/// Dropped together with the [`Runtime`], which also happens when the future
/// returned by [`Runtime::run`] is dropped before completion. At that point
/// nobody is left to collect results, so queued workers are turned away and
/// running jobs are aborted.
struct WorkerControl {
    pool: Arc<ResourcePool>,
    kill_tx: watch::Sender<bool>,
}

impl WorkerControl {
    fn kill(&self) {
        self.kill_tx.send_replace(true);
    }
}

impl Drop for WorkerControl {
    fn drop(&mut self) {
        if self.kill_tx.receiver_count() > 0 && !*self.kill_tx.borrow() {
            debug!("runtime dropped with workers attached; stopping them");
        }
        self.pool.close();
        self.kill();
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(
        core: DispatchCore,
        jobs: Vec<Arc<dyn Job>>,
        pool: Arc<ResourcePool>,
        monitor: Arc<dyn Monitor>,
        context: Arc<ExecutionContext>,
        options: RuntimeOptions,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::channel::<WorkerEvent>(64);
        let (kill_tx, _) = watch::channel(false);
        let jobs = jobs
            .into_iter()
            .map(|job| (job.id().to_string(), job))
            .collect();

        Self {
            core,
            jobs,
            monitor,
            context,
            options,
            event_tx,
            event_rx,
            workers: WorkerControl { pool, kill_tx },
            active: HashSet::new(),
        }
    }

    /// Main coordinator loop.
    ///
    /// - Dispatches every initially runnable job.
    /// - Waits (without spinning) for worker events or an interrupt.
    /// - On interrupt: stops dispatch, closes the resource pools so queued
    ///   workers give up, and gives running jobs `interrupt_grace` to stop
    ///   before their tasks are aborted.
    pub async fn run(mut self) -> RunReport {
        let started = Instant::now();
        let batch = self.options.batch_label.clone();
        self.monitor.open(&batch, self.jobs.len() as u64);
        info!(batch = %batch, jobs = self.jobs.len(), policy = %self.core.policy(), "run started");

        let mut interrupt = self.context.interrupt_handle().subscribe();
        let mut grace_deadline: Option<Instant> = None;
        let mut killed = false;

        if interrupt.is_interrupted() {
            grace_deadline = Some(self.interrupt());
        } else {
            let step = self.core.start();
            self.apply(step);
        }

        while !self.core.is_finished() {
            let deadline = grace_deadline.unwrap_or_else(Instant::now);

            tokio::select! {
                event = self.event_rx.recv() => match event {
                    Some(event) => {
                        // A job may report back before the interrupt branch
                        // gets polled; the run still counts as interrupted.
                        if grace_deadline.is_none() && interrupt.is_interrupted() {
                            grace_deadline = Some(self.interrupt());
                        }
                        self.handle_event(event);
                    }
                    None => {
                        error!("worker event channel closed with jobs outstanding");
                        break;
                    }
                },
                _ = interrupt.wait(), if grace_deadline.is_none() => {
                    grace_deadline = Some(self.interrupt());
                }
                _ = tokio::time::sleep_until(deadline), if grace_deadline.is_some() && !killed => {
                    warn!(
                        running = ?self.active,
                        grace = ?self.options.interrupt_grace,
                        "running jobs ignored the interrupt; aborting them"
                    );
                    killed = true;
                    self.workers.kill();
                }
            }
        }

        self.monitor.close(&batch);
        let report = self.core.into_report(started.elapsed());
        info!(
            batch = %batch,
            phase = ?report.phase(),
            elapsed = ?report.elapsed(),
            "run ended"
        );
        report
    }

    fn handle_event(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Started { job } => {
                debug!(job = %job, "worker started job");
            }
            WorkerEvent::Finished { job, outcome } => {
                self.active.remove(&job);
                // A withdrawn job comes back as newly abandoned and is counted there.
                if !matches!(outcome, JobOutcome::Withdrawn) {
                    self.monitor.progressed(&self.options.batch_label, 1);
                }
                let step = self.core.handle_completion(&job, outcome);
                self.apply(step);
            }
        }
    }

    /// Returns the deadline after which running jobs are aborted.
    fn interrupt(&mut self) -> Instant {
        warn!(running = ?self.active, "interrupt received; stopping dispatch");
        self.workers.pool.close();
        let step = self.core.handle_interrupt();
        self.apply(step);
        Instant::now() + self.options.interrupt_grace
    }

    fn apply(&mut self, step: DispatchStep) {
        for _ in &step.newly_abandoned {
            self.monitor.progressed(&self.options.batch_label, 1);
        }
        for job in step.dispatch {
            self.spawn_worker(job);
        }
    }

    fn spawn_worker(&mut self, id: JobId) {
        let Some(job) = self.jobs.get(&id).map(Arc::clone) else {
            // The graph and the job map come from the same submission, so
            // this only happens if they were built from different sets.
            error!(job = %id, "dispatched job has no implementation");
            let tx = self.event_tx.clone();
            tokio::spawn(async move {
                let outcome = JobOutcome::Failed(anyhow!("job '{id}' has no implementation"));
                let _ = tx.send(WorkerEvent::Finished { job: id, outcome }).await;
            });
            return;
        };

        let ctx = JobContext::new(Arc::clone(&self.context), id.clone());
        let worker = Worker::new(
            job,
            Arc::clone(&self.workers.pool),
            Arc::clone(&self.monitor),
            ctx,
            self.event_tx.clone(),
            self.workers.kill_tx.subscribe(),
        );

        debug!(job = %id, "spawning worker");
        self.active.insert(id);
        tokio::spawn(worker.run());
    }
}
