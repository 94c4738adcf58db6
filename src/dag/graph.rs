// src/dag/graph.rs

use std::collections::{BTreeSet, HashMap};

use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::dag::cycle::find_cycle;
use crate::dag::job_state::JobState;
use crate::dag::state::ExecutionState;
use crate::errors::GraphError;
use crate::types::JobId;

/// Blocker relationships among the jobs of one run.
///
/// Edge direction: blocker -> dependent. For a job `b` blocked by `a` there is
/// an edge `a -> b`.
///
/// Built once per run and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: DiGraph<JobId, ()>,
    index: HashMap<JobId, NodeIndex>,
}

impl DependencyGraph {
    /// Build a graph from `(id, blockers)` pairs, in submission order.
    ///
    /// Fails on empty or duplicate ids and on blockers that name a job that
    /// was not submitted. Cycles are *not* rejected here; see
    /// [`DependencyGraph::find_cycle`].
    pub fn build<'a, I, B>(jobs: I) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = (&'a str, B)>,
        B: IntoIterator<Item = &'a str>,
    {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();
        let mut edges: Vec<(&'a str, Vec<&'a str>)> = Vec::new();

        // First pass: one node per job.
        for (id, blockers) in jobs {
            if id.is_empty() {
                return Err(GraphError::EmptyJobId);
            }
            if index.contains_key(id) {
                return Err(GraphError::DuplicateJob(id.to_string()));
            }
            let node = graph.add_node(id.to_string());
            index.insert(id.to_string(), node);
            edges.push((id, blockers.into_iter().collect()));
        }

        // Second pass: blocker -> dependent edges, now that every id is known.
        for (id, blockers) in edges {
            let dependent = index[id];
            for blocker in blockers {
                let Some(&source) = index.get(blocker) else {
                    return Err(GraphError::DanglingBlocker {
                        job: id.to_string(),
                        blocker: blocker.to_string(),
                    });
                };
                graph.update_edge(source, dependent, ());
            }
        }

        Ok(Self { graph, index })
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// All job ids, in submission order.
    pub fn job_ids(&self) -> impl Iterator<Item = &str> {
        self.graph.node_indices().map(|n| self.graph[n].as_str())
    }

    /// Jobs that must be `Done` before `id` may start.
    pub fn blockers_of(&self, id: &str) -> Vec<&str> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Jobs that name `id` as a blocker.
    pub fn direct_dependents(&self, id: &str) -> Vec<&str> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// `true` iff every blocker of `id` is `Done` in `state`.
    pub fn is_runnable(&self, id: &str, state: &ExecutionState) -> bool {
        self.contains(id)
            && self
                .blockers_of(id)
                .into_iter()
                .all(|b| state.state_of(b) == Some(JobState::Done))
    }

    /// One dependency cycle, as job ids along the cycle, if any exists.
    pub fn find_cycle(&self) -> Option<Vec<JobId>> {
        find_cycle(&self.graph).map(|path| path.into_iter().map(|n| self.graph[n].clone()).collect())
    }

    /// Every job that sits on some dependency cycle.
    pub fn cyclic_jobs(&self) -> BTreeSet<JobId> {
        tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]))
            .flatten()
            .map(|n| self.graph[n].clone())
            .collect()
    }

    /// `seeds` plus everything transitively blocked by them.
    pub fn downstream_of<'a>(&self, seeds: impl IntoIterator<Item = &'a str>) -> BTreeSet<JobId> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<NodeIndex> = seeds
            .into_iter()
            .filter_map(|id| self.index.get(id).copied())
            .collect();

        while let Some(node) = stack.pop() {
            if !seen.insert(self.graph[node].clone()) {
                continue;
            }
            stack.extend(self.graph.neighbors_directed(node, Direction::Outgoing));
        }

        seen
    }

    fn neighbors(&self, id: &str, dir: Direction) -> Vec<&str> {
        match self.index.get(id) {
            Some(&node) => self
                .graph
                .neighbors_directed(node, dir)
                .map(|n| self.graph[n].as_str())
                .collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&'static str, Vec<&'static str>)]) -> Result<DependencyGraph, GraphError> {
        DependencyGraph::build(edges.iter().map(|(id, b)| (*id, b.iter().copied())))
    }

    #[test]
    fn dependents_and_blockers_are_mirrored() {
        let g = graph(&[("a", vec![]), ("b", vec!["a"]), ("c", vec!["a", "b"])]).unwrap();

        let mut deps = g.direct_dependents("a");
        deps.sort();
        assert_eq!(deps, vec!["b", "c"]);

        let mut blockers = g.blockers_of("c");
        blockers.sort();
        assert_eq!(blockers, vec!["a", "b"]);

        assert_eq!(g.job_ids().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert!(g.find_cycle().is_none());
        assert!(g.cyclic_jobs().is_empty());
    }

    #[test]
    fn dangling_blocker_is_an_error() {
        let err = graph(&[("a", vec![]), ("b", vec!["missing"])]).unwrap_err();
        assert_eq!(
            err,
            GraphError::DanglingBlocker {
                job: "b".to_string(),
                blocker: "missing".to_string()
            }
        );
    }

    #[test]
    fn forward_references_resolve() {
        let g = graph(&[("b", vec!["a"]), ("a", vec![])]).unwrap();
        assert_eq!(g.blockers_of("b"), vec!["a"]);
    }

    #[test]
    fn duplicate_and_empty_ids_are_errors() {
        assert_eq!(
            graph(&[("a", vec![]), ("a", vec![])]).unwrap_err(),
            GraphError::DuplicateJob("a".to_string())
        );
        assert_eq!(graph(&[("", vec![])]).unwrap_err(), GraphError::EmptyJobId);
    }

    #[test]
    fn repeated_blocker_adds_one_edge() {
        let g = graph(&[("a", vec![]), ("b", vec!["a", "a"])]).unwrap();
        assert_eq!(g.blockers_of("b"), vec!["a"]);
    }

    #[test]
    fn cycle_members_and_downstream() {
        let g = graph(&[
            ("a", vec![]),
            ("b", vec!["a", "d"]),
            ("c", vec!["b"]),
            ("d", vec!["c"]),
            ("e", vec!["d"]),
        ])
        .unwrap();

        let cycle = g.find_cycle().unwrap();
        let mut sorted = cycle.clone();
        sorted.sort();
        assert_eq!(sorted, vec!["b", "c", "d"]);

        let members = g.cyclic_jobs();
        assert_eq!(members.iter().map(String::as_str).collect::<Vec<_>>(), vec!["b", "c", "d"]);

        let downstream = g.downstream_of(members.iter().map(String::as_str));
        assert_eq!(
            downstream.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["b", "c", "d", "e"]
        );
    }

    #[test]
    fn self_blocker_is_a_cycle() {
        let g = graph(&[("a", vec!["a"]), ("b", vec![])]).unwrap();
        assert_eq!(g.find_cycle(), Some(vec!["a".to_string()]));
        assert_eq!(g.cyclic_jobs().into_iter().collect::<Vec<_>>(), vec!["a".to_string()]);
    }
}
