// src/engine/core.rs

//! Pure dispatch state machine.
//!
//! [`DispatchCore`] consumes "the run starts", "job X finished with outcome
//! Y" and "the run was interrupted" and answers with a [`DispatchStep`]:
//! which jobs to hand to workers now, which were abandoned, and whether the
//! run is over. It has no channels, no Tokio types and performs no IO, so the
//! whole scheduling policy can be unit tested by stepping it by hand.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::dag::{DependencyGraph, DispatchStep, ExecutionState, JobState, RunPhase};
use crate::engine::JobOutcome;
use crate::engine::report::{JobFailure, RunReport};
use crate::types::{FailurePolicy, JobId};

#[derive(Debug)]
pub struct DispatchCore {
    state: ExecutionState,
    policy: FailurePolicy,
    phase: RunPhase,
    failures: Vec<JobFailure>,
    cycle: Option<Vec<JobId>>,
    interrupted: bool,
    /// Cycle casualties not yet reported through a [`DispatchStep`].
    abandoned_up_front: Vec<JobId>,
}

impl DispatchCore {
    /// Prepare a run over `graph`.
    ///
    /// Jobs on a dependency cycle, and everything downstream of them, can
    /// never start; they are abandoned here, before anything is dispatched.
    pub fn new(graph: Arc<DependencyGraph>, policy: FailurePolicy) -> Self {
        let mut state = ExecutionState::new(Arc::clone(&graph));

        let cycle = graph.find_cycle();
        if let Some(path) = &cycle {
            let members = graph.cyclic_jobs();
            let doomed = graph.downstream_of(members.iter().map(String::as_str));
            warn!(
                cycle = ?path,
                abandoned = ?doomed,
                "dependency cycle detected; abandoning cyclic jobs and their dependents"
            );
            for id in &doomed {
                state.mark_abandoned(id);
            }
        }
        let abandoned_up_front = match &cycle {
            Some(_) => graph
                .job_ids()
                .filter(|id| state.state_of(id) == Some(JobState::Abandoned))
                .map(str::to_string)
                .collect(),
            None => Vec::new(),
        };

        Self {
            state,
            policy,
            phase: RunPhase::Initializing,
            failures: Vec::new(),
            cycle,
            interrupted: false,
            abandoned_up_front,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    pub fn is_finished(&self) -> bool {
        self.phase.is_finished()
    }

    /// Enter `Dispatching` and hand out every initially runnable job.
    pub fn start(&mut self) -> DispatchStep {
        if self.phase != RunPhase::Initializing {
            warn!(phase = ?self.phase, "start called twice; ignoring");
            return DispatchStep::default();
        }

        self.phase = RunPhase::Dispatching;
        info!(
            jobs = self.state.graph().len(),
            policy = %self.policy,
            "dispatch started"
        );

        let dispatch = self.collect_dispatchable();
        self.finish_step(dispatch, Vec::new())
    }

    /// React to a worker reporting back for `job`.
    pub fn handle_completion(&mut self, job: &str, outcome: JobOutcome) -> DispatchStep {
        let mut newly_abandoned = Vec::new();

        match outcome {
            JobOutcome::Succeeded => {
                if self.state.mark_done(job) {
                    debug!(job = %job, "job completed");
                }
            }
            JobOutcome::Failed(error) => {
                if self.state.state_of(job) == Some(JobState::Running) {
                    warn!(job = %job, error = %error, "job failed");
                    newly_abandoned = self.state.mark_failed(job);
                    self.failures.push(JobFailure {
                        job: job.to_string(),
                        error,
                    });

                    if self.policy == FailurePolicy::Strict && self.phase == RunPhase::Dispatching {
                        info!(job = %job, "fail-fast: no further jobs will be dispatched");
                        self.phase = RunPhase::Draining;
                        newly_abandoned.extend(self.state.abandon_all_pending());
                    }
                } else {
                    warn!(job = %job, error = %error, "failure reported for job that is not running; ignoring");
                }
            }
            JobOutcome::Withdrawn => {
                debug!(job = %job, "job withdrawn before it started");
                newly_abandoned = self.state.mark_withdrawn(job);
            }
        }

        let dispatch = if self.phase == RunPhase::Dispatching {
            self.collect_dispatchable()
        } else {
            Vec::new()
        };

        self.finish_step(dispatch, newly_abandoned)
    }

    /// Stop dispatching and abandon everything that has not started.
    ///
    /// Running jobs are left to finish; their completions are still accepted.
    pub fn handle_interrupt(&mut self) -> DispatchStep {
        if self.interrupted || self.is_finished() {
            return DispatchStep::default();
        }

        self.interrupted = true;
        self.phase = RunPhase::Draining;
        info!(
            running = self.state.count(JobState::Running),
            "interrupted: draining running jobs"
        );

        let newly_abandoned = self.state.abandon_all_pending();
        self.finish_step(Vec::new(), newly_abandoned)
    }

    /// Consume the core and produce the run's report.
    pub fn into_report(self, elapsed: Duration) -> RunReport {
        RunReport {
            policy: self.policy,
            phase: self.phase,
            states: self.state.snapshot(),
            failures: self.failures,
            cycle: self.cycle,
            interrupted: self.interrupted,
            elapsed,
        }
    }

    /// Mark every runnable pending job `Running` and return it.
    fn collect_dispatchable(&mut self) -> Vec<JobId> {
        let ready = self.state.runnable();
        let dispatch: Vec<JobId> = ready
            .into_iter()
            .filter(|id| self.state.mark_running(id))
            .collect();

        if !dispatch.is_empty() {
            debug!(jobs = ?dispatch, "blockers satisfied; dispatching");
        }
        dispatch
    }

    fn finish_step(&mut self, dispatch: Vec<JobId>, mut newly_abandoned: Vec<JobId>) -> DispatchStep {
        if !self.abandoned_up_front.is_empty() {
            let mut all = std::mem::take(&mut self.abandoned_up_front);
            all.append(&mut newly_abandoned);
            newly_abandoned = all;
        }

        if !newly_abandoned.is_empty() {
            warn!(jobs = ?newly_abandoned, "jobs abandoned");
        }

        // Nothing running and nothing startable means the rest can never run.
        if dispatch.is_empty()
            && self.state.count(JobState::Running) == 0
            && self.state.count(JobState::Pending) > 0
        {
            let stuck = self.state.abandon_all_pending();
            warn!(jobs = ?stuck, "no further progress possible; abandoning remaining jobs");
            newly_abandoned.extend(stuck);
        }

        let run_just_finished = !self.is_finished() && !self.state.has_outstanding();
        if run_just_finished {
            let all_done = self.state.count(JobState::Done) == self.state.graph().len();
            self.phase = if all_done {
                RunPhase::Completed
            } else {
                RunPhase::Failed
            };
            info!(
                phase = ?self.phase,
                done = self.state.count(JobState::Done),
                failed = self.state.count(JobState::Failed),
                abandoned = self.state.count(JobState::Abandoned),
                "run finished"
            );
        }

        DispatchStep {
            dispatch,
            newly_abandoned,
            run_just_finished,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn core(edges: &[(&'static str, Vec<&'static str>)], policy: FailurePolicy) -> DispatchCore {
        let graph = DependencyGraph::build(edges.iter().map(|(id, b)| (*id, b.iter().copied()))).unwrap();
        DispatchCore::new(Arc::new(graph), policy)
    }

    fn sorted(mut ids: Vec<JobId>) -> Vec<JobId> {
        ids.sort();
        ids
    }

    #[test]
    fn chain_dispatches_in_blocker_order() {
        let mut core = core(&[("a", vec![]), ("b", vec!["a"]), ("c", vec!["b"])], FailurePolicy::Strict);

        assert_eq!(core.start().dispatch, vec!["a"]);
        assert_eq!(core.handle_completion("a", JobOutcome::Succeeded).dispatch, vec!["b"]);
        assert_eq!(core.handle_completion("b", JobOutcome::Succeeded).dispatch, vec!["c"]);

        let last = core.handle_completion("c", JobOutcome::Succeeded);
        assert!(last.run_just_finished);
        assert_eq!(core.phase(), RunPhase::Completed);

        let report = core.into_report(Duration::ZERO);
        assert!(report.is_success());
        assert!(report.incomplete().is_empty());
    }

    #[test]
    fn strict_stops_dispatch_but_lets_running_jobs_finish() {
        let mut core = core(
            &[("a", vec![]), ("b", vec![]), ("c", vec![]), ("d", vec!["b"])],
            FailurePolicy::Strict,
        );
        assert_eq!(sorted(core.start().dispatch), vec!["a", "b", "c"]);

        let step = core.handle_completion("a", JobOutcome::Failed(anyhow!("boom")));
        assert!(step.dispatch.is_empty());
        assert_eq!(step.newly_abandoned, vec!["d"]);
        assert_eq!(core.phase(), RunPhase::Draining);

        // Already dispatched jobs still complete.
        assert!(core.handle_completion("b", JobOutcome::Succeeded).dispatch.is_empty());
        let last = core.handle_completion("c", JobOutcome::Succeeded);
        assert!(last.run_just_finished);

        let report = core.into_report(Duration::ZERO);
        assert_eq!(report.phase(), RunPhase::Failed);
        assert_eq!(report.failed(), vec!["a"]);
        assert_eq!(report.completed(), vec!["b", "c"]);
        assert_eq!(report.incomplete(), vec!["d"]);
        assert_eq!(report.first_failure().map(|f| f.job.as_str()), Some("a"));
    }

    #[test]
    fn best_effort_keeps_dispatching_unaffected_jobs() {
        let mut core = core(
            &[("a", vec![]), ("b", vec![]), ("c", vec!["a", "b"]), ("d", vec!["b"])],
            FailurePolicy::BestEffort,
        );
        assert_eq!(sorted(core.start().dispatch), vec!["a", "b"]);

        let step = core.handle_completion("a", JobOutcome::Failed(anyhow!("boom")));
        assert_eq!(step.newly_abandoned, vec!["c"]);
        assert_eq!(core.phase(), RunPhase::Dispatching);

        let step = core.handle_completion("b", JobOutcome::Succeeded);
        assert_eq!(step.dispatch, vec!["d"]);

        assert!(core.handle_completion("d", JobOutcome::Succeeded).run_just_finished);
        let report = core.into_report(Duration::ZERO);
        assert_eq!(report.incomplete(), vec!["c"]);
        assert_eq!(report.not_done(), vec!["a", "c"]);
    }

    #[test]
    fn cycle_is_abandoned_up_front() {
        let mut core = core(
            &[
                ("a", vec![]),
                ("b", vec!["a", "d"]),
                ("c", vec!["b"]),
                ("d", vec!["c"]),
                ("e", vec!["d"]),
            ],
            FailurePolicy::Strict,
        );
        assert_eq!(core.state().count(JobState::Abandoned), 4);
        let step = core.start();
        assert_eq!(step.dispatch, vec!["a"]);
        assert_eq!(step.newly_abandoned, vec!["b", "c", "d", "e"]);
        assert!(core.handle_completion("a", JobOutcome::Succeeded).run_just_finished);

        let report = core.into_report(Duration::ZERO);
        assert_eq!(report.incomplete(), vec!["b", "c", "d", "e"]);
        assert_eq!(report.completed(), vec!["a"]);
        assert!(report.cycle().is_some());
        assert_eq!(report.phase(), RunPhase::Failed);
    }

    #[test]
    fn interrupt_abandons_pending_and_drains() {
        let mut core = core(&[("a", vec![]), ("b", vec!["a"])], FailurePolicy::BestEffort);
        core.start();

        let step = core.handle_interrupt();
        assert_eq!(step.newly_abandoned, vec!["b"]);
        assert!(!step.run_just_finished);

        assert!(core.handle_completion("a", JobOutcome::Succeeded).run_just_finished);
        let report = core.into_report(Duration::ZERO);
        assert!(report.was_interrupted());
        assert_eq!(report.completed(), vec!["a"]);
        assert_eq!(report.incomplete(), vec!["b"]);
    }

    #[test]
    fn withdrawn_job_counts_as_never_run() {
        let mut core = core(&[("a", vec![]), ("b", vec!["a"])], FailurePolicy::Strict);
        core.start();
        core.handle_interrupt();

        let step = core.handle_completion("a", JobOutcome::Withdrawn);
        assert!(step.run_just_finished);
        let report = core.into_report(Duration::ZERO);
        assert_eq!(report.incomplete(), vec!["a", "b"]);
        assert!(report.failed().is_empty());
    }

    #[test]
    fn empty_run_completes_immediately() {
        let mut core = core(&[], FailurePolicy::Strict);
        let step = core.start();
        assert!(step.run_just_finished);
        assert_eq!(core.phase(), RunPhase::Completed);
    }

    #[test]
    fn late_events_do_not_resurrect_terminal_jobs() {
        let mut core = core(&[("a", vec![]), ("b", vec![])], FailurePolicy::BestEffort);
        core.start();
        core.handle_completion("a", JobOutcome::Succeeded);
        core.handle_completion("a", JobOutcome::Failed(anyhow!("late")));
        assert_eq!(core.state().state_of("a"), Some(JobState::Done));
        assert!(core.into_report(Duration::ZERO).failures().is_empty());
    }
}
