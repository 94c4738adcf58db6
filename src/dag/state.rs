// src/dag/state.rs

//! Per-run job state and the abandonment cascade.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::dag::graph::DependencyGraph;
use crate::dag::job_state::JobState;
use crate::types::JobId;

/// Job states for a single run.
///
/// Owned by exactly one coordinator, which is what makes every transition
/// (including a whole abandonment cascade) atomic with respect to the
/// runnability scan. Terminal states (`Done`, `Failed`, `Abandoned`) never
/// change again; re-marking them is a logged no-op.
#[derive(Debug, Clone)]
pub struct ExecutionState {
    graph: Arc<DependencyGraph>,
    states: HashMap<JobId, JobState>,
}

impl ExecutionState {
    /// Every job of `graph` starts `Pending`.
    pub fn new(graph: Arc<DependencyGraph>) -> Self {
        let states = graph
            .job_ids()
            .map(|id| (id.to_string(), JobState::Pending))
            .collect();
        Self { graph, states }
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn state_of(&self, id: &str) -> Option<JobState> {
        self.states.get(id).copied()
    }

    /// Pending jobs whose blockers are all `Done`, in submission order.
    pub fn runnable(&self) -> Vec<JobId> {
        self.graph
            .job_ids()
            .filter(|id| self.state_of(id) == Some(JobState::Pending))
            .filter(|id| self.graph.is_runnable(id, self))
            .map(str::to_string)
            .collect()
    }

    /// `Pending` -> `Running`, only if every blocker is `Done`.
    pub fn mark_running(&mut self, id: &str) -> bool {
        if !self.graph.is_runnable(id, self) {
            warn!(job = %id, "refusing to start job with unfinished blockers");
            return false;
        }
        self.transition(id, JobState::Pending, JobState::Running)
    }

    /// `Running` -> `Done`.
    pub fn mark_done(&mut self, id: &str) -> bool {
        self.transition(id, JobState::Running, JobState::Done)
    }

    /// `Running` -> `Failed`, then abandon every transitive dependent that is
    /// still `Pending`.
    ///
    /// Returns the newly abandoned jobs.
    pub fn mark_failed(&mut self, id: &str) -> Vec<JobId> {
        if !self.transition(id, JobState::Running, JobState::Failed) {
            return Vec::new();
        }
        self.abandon_dependents_of(id)
    }

    /// `Pending` -> `Abandoned`, cascading to transitive dependents.
    ///
    /// Returns every newly abandoned job, `id` included.
    pub fn mark_abandoned(&mut self, id: &str) -> Vec<JobId> {
        if !self.transition(id, JobState::Pending, JobState::Abandoned) {
            return Vec::new();
        }
        let mut abandoned = vec![id.to_string()];
        abandoned.extend(self.abandon_dependents_of(id));
        abandoned
    }

    /// `Running` -> `Abandoned` for a dispatched job whose worker gave up
    /// before calling `execute` (the run was interrupted while it waited for
    /// a resource slot). Dependents are abandoned as well.
    pub fn mark_withdrawn(&mut self, id: &str) -> Vec<JobId> {
        if !self.transition(id, JobState::Running, JobState::Abandoned) {
            return Vec::new();
        }
        let mut abandoned = vec![id.to_string()];
        abandoned.extend(self.abandon_dependents_of(id));
        abandoned
    }

    /// Abandon every job that is still `Pending`.
    pub fn abandon_all_pending(&mut self) -> Vec<JobId> {
        let pending: Vec<JobId> = self
            .graph
            .job_ids()
            .filter(|id| self.state_of(id) == Some(JobState::Pending))
            .map(str::to_string)
            .collect();

        for id in &pending {
            self.states.insert(id.clone(), JobState::Abandoned);
            debug!(job = %id, "abandoned pending job");
        }
        pending
    }

    /// Some job is still `Pending` or `Running`.
    pub fn has_outstanding(&self) -> bool {
        self.states.values().any(|s| s.is_outstanding())
    }

    pub fn count(&self, state: JobState) -> usize {
        self.states.values().filter(|s| **s == state).count()
    }

    /// Copy of every job's current state.
    pub fn snapshot(&self) -> BTreeMap<JobId, JobState> {
        self.states.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }

    fn transition(&mut self, id: &str, from: JobState, to: JobState) -> bool {
        match self.states.get_mut(id) {
            Some(state) if *state == from => {
                debug!(job = %id, %from, %to, "job state transition");
                *state = to;
                true
            }
            Some(state) => {
                debug!(job = %id, current = %state, requested = %to, "ignoring state transition");
                false
            }
            None => {
                warn!(job = %id, "state transition for unknown job; ignoring");
                false
            }
        }
    }

    fn abandon_dependents_of(&mut self, root: &str) -> Vec<JobId> {
        let mut stack: Vec<JobId> = self
            .graph
            .direct_dependents(root)
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut visited: HashSet<JobId> = HashSet::new();
        let mut newly_abandoned = Vec::new();

        while let Some(name) = stack.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }
            if let Some(state) = self.states.get_mut(&name) {
                if *state == JobState::Pending {
                    *state = JobState::Abandoned;
                    debug!(job = %name, upstream = %root, "abandoning dependent of failed job");
                    newly_abandoned.push(name.clone());
                }
            }
            // Keep walking: dependents of an already-abandoned job are
            // abandoned too.
            stack.extend(self.graph.direct_dependents(&name).into_iter().map(str::to_string));
        }

        newly_abandoned
    }
}
