//! Nested-call graph over all summarized files

use crate::features::ctu::domain::{FileSummary, NestedCall};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

/// Functions as nodes; an edge `f → g` with weight `(i, j)` means `f`
/// passes its parameter `i` as argument `j` of `g`
pub struct CallGraph {
    graph: DiGraph<String, NestedCall>,
    nodes: FxHashMap<String, NodeIndex>,
}

impl CallGraph {
    pub fn build(summaries: &[FileSummary]) -> Self {
        let mut graph = CallGraph {
            graph: DiGraph::new(),
            nodes: FxHashMap::default(),
        };
        for nested in summaries.iter().flat_map(|s| s.nested_calls.iter()) {
            let from = graph.node(&nested.caller);
            let to = graph.node(&nested.callee);
            graph.graph.add_edge(from, to, nested.clone());
        }
        graph
    }

    fn node(&mut self, key: &str) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(key) {
            return idx;
        }
        let idx = self.graph.add_node(key.to_string());
        self.nodes.insert(key.to_string(), idx);
        idx
    }

    pub fn function_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Every `(function, argument)` that argument `arg` of `function` reaches
    /// within `max_depth` forwarding steps, with the nested calls taken
    ///
    /// The start itself is included with an empty chain.
    pub fn reachable(&self, function: &str, arg: usize, max_depth: usize) -> Vec<(String, usize, Vec<&NestedCall>)> {
        let mut out = vec![(function.to_string(), arg, Vec::new())];
        let Some(&start) = self.nodes.get(function) else {
            return out;
        };
        let mut queue: VecDeque<(NodeIndex, usize, Vec<&NestedCall>)> = VecDeque::new();
        queue.push_back((start, arg, Vec::new()));
        while let Some((node, arg, chain)) = queue.pop_front() {
            if chain.len() >= max_depth {
                continue;
            }
            for edge in self.graph.edges_directed(node, Direction::Outgoing) {
                let nested = edge.weight();
                if nested.caller_arg != arg {
                    continue;
                }
                // cycles are cut by the chain itself
                if chain.iter().any(|c| c.callee == nested.callee && c.callee_arg == nested.callee_arg) {
                    continue;
                }
                let mut next = chain.clone();
                next.push(nested);
                out.push((nested.callee.clone(), nested.callee_arg, next.clone()));
                queue.push_back((edge.target(), nested.callee_arg, next));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::FileLocation;

    fn nested(caller: &str, caller_arg: usize, callee: &str, callee_arg: usize) -> NestedCall {
        NestedCall {
            caller: caller.to_string(),
            caller_arg,
            callee: callee.to_string(),
            callee_arg,
            location: FileLocation::new("a.c", 1, 1),
        }
    }

    #[test]
    fn test_reachable_respects_depth_and_argument() {
        let mut summary = FileSummary::new("a.c");
        summary.nested_calls = vec![
            nested("a/1", 1, "b/2", 2),
            nested("b/2", 2, "c/1", 1),
            nested("b/2", 1, "d/1", 1),
        ];
        let graph = CallGraph::build(&[summary]);
        assert_eq!(graph.function_count(), 4);

        let keys = |depth| -> Vec<String> {
            graph.reachable("a/1", 1, depth).into_iter().map(|(k, _, _)| k).collect()
        };
        assert_eq!(keys(0), vec!["a/1"]);
        assert_eq!(keys(1), vec!["a/1", "b/2"]);
        assert_eq!(keys(2), vec!["a/1", "b/2", "c/1"]);
    }

    #[test]
    fn test_recursive_forwarding_terminates() {
        let mut summary = FileSummary::new("a.c");
        summary.nested_calls = vec![nested("r/1", 1, "r/1", 1)];
        let graph = CallGraph::build(&[summary]);
        assert_eq!(graph.reachable("r/1", 1, 10).len(), 2);
    }
}
