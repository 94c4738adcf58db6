// src/dag/cycle.rs

//! Three-colour depth-first cycle detection.
//!
//! White nodes are unvisited, gray nodes are on the current DFS path, black
//! nodes are fully explored. An edge into a gray node closes a cycle. The
//! traversal keeps its own stack so deep graphs cannot overflow the call stack.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Return the nodes of one cycle, in edge order, or `None` if the graph is
/// acyclic.
pub fn find_cycle<N, E>(graph: &DiGraph<N, E>) -> Option<Vec<NodeIndex>> {
    let mut color = vec![Color::White; graph.node_count()];

    for start in graph.node_indices() {
        if color[start.index()] != Color::White {
            continue;
        }

        color[start.index()] = Color::Gray;
        let mut stack = vec![(start, graph.neighbors_directed(start, Direction::Outgoing))];

        while let Some((node, neighbors)) = stack.last_mut() {
            let node = *node;
            match neighbors.next() {
                None => {
                    color[node.index()] = Color::Black;
                    stack.pop();
                }
                Some(next) => match color[next.index()] {
                    Color::White => {
                        color[next.index()] = Color::Gray;
                        stack.push((next, graph.neighbors_directed(next, Direction::Outgoing)));
                    }
                    Color::Gray => {
                        // The gray node is on the current path; the cycle is
                        // the path suffix starting there.
                        let from = stack.iter().position(|(n, _)| *n == next).unwrap_or(0);
                        return Some(stack[from..].iter().map(|(n, _)| *n).collect());
                    }
                    Color::Black => {}
                },
            }
        }
    }

    None
}
