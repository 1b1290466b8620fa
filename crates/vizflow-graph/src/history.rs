//! History reconstruction.
//!
//! A history is a topological ordering of a subset of the flow. The ordering
//! is produced by a stack-based (LIFO) Kahn traversal, which walks one branch
//! to its end before starting the next. The renderer depends on exactly this
//! order; a queue-based Kahn would interleave branches.

use std::collections::BTreeSet;

use tracing::warn;

use crate::FlowGraph;

impl FlowGraph {
    /// Ancestors of `id` plus `id` itself, linearized.
    ///
    /// Returns an empty history when `id` is not part of the flow.
    pub fn get_history(&self, id: &str) -> Vec<String> {
        let Some(start) = self.index(id) else {
            return Vec::new();
        };

        let mut members = vec![false; self.len()];
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            if std::mem::replace(&mut members[node], true) {
                continue;
            }
            stack.extend(
                self.predecessors(node)
                    .iter()
                    .copied()
                    .filter(|&prev| !members[prev]),
            );
        }

        let order = self.linearize(&members);
        if !order.contains(&start) {
            warn!(node = %id, "Node sits on or behind a cycle, history is partial");
        }
        self.to_ids(order)
    }

    /// Every maximal connected history of the flow, one per component.
    ///
    /// Components are ordered by their earliest start node. Nodes that no
    /// start node reaches can only sit on a cycle; they are logged and left
    /// out.
    pub fn get_histories(&self) -> Vec<Vec<String>> {
        let starts = (0..self.len()).filter(|&i| self.predecessors(i).is_empty());

        // One route per start. A node already covered by an earlier route
        // still joins this route, so overlapping routes share it, but it is
        // not walked again.
        let mut covered = vec![false; self.len()];
        let mut routes: Vec<BTreeSet<usize>> = Vec::new();
        for start in starts {
            let mut route = BTreeSet::new();
            let mut stack = vec![start];
            while let Some(node) = stack.pop() {
                route.insert(node);
                if std::mem::replace(&mut covered[node], true) {
                    continue;
                }
                stack.extend(self.successors(node).iter().copied());
            }
            routes.push(route);
        }

        let components = merge_overlapping(routes);

        let mut members = vec![false; self.len()];
        for &node in components.iter().flatten() {
            members[node] = true;
        }
        let leftover: Vec<&str> = (0..self.len())
            .filter(|&i| !members[i])
            .map(|i| self.id_at(i))
            .collect();
        if !leftover.is_empty() {
            warn!(
                count = leftover.len(),
                nodes = ?leftover,
                "Nodes unreachable from any start node (cyclic), excluded from histories"
            );
        }

        components
            .into_iter()
            .map(|component| {
                let mut members = vec![false; self.len()];
                for node in component {
                    members[node] = true;
                }
                self.to_ids(self.linearize(&members))
            })
            .collect()
    }

    /// Nodes that can never be ordered because they sit on a cycle or
    /// downstream of one. Always empty for graphs built through `connect`.
    pub fn cyclic_nodes(&self) -> Vec<String> {
        let (_, stalled) = self.kahn(&vec![true; self.len()]);
        self.to_ids(stalled)
    }

    /// Stack-based Kahn traversal restricted to `members`.
    ///
    /// In-degrees count only edges with both endpoints inside the set.
    /// Zero in-degree seeds are pushed so that they pop in insertion order,
    /// and successors are pushed in reverse edge order so that siblings that
    /// become ready together pop left to right.
    ///
    /// Members on or behind a cycle never reach zero in-degree. They are
    /// logged and left out of the order.
    pub(crate) fn linearize(&self, members: &[bool]) -> Vec<usize> {
        let (order, stalled) = self.kahn(members);
        if !stalled.is_empty() {
            let nodes: Vec<&str> = stalled.iter().map(|&i| self.id_at(i)).collect();
            warn!(
                count = nodes.len(),
                nodes = ?nodes,
                "Nodes on or behind a cycle, excluded from history"
            );
        }
        order
    }

    /// Returns the emitted order and the members left with in-degree.
    fn kahn(&self, members: &[bool]) -> (Vec<usize>, Vec<usize>) {
        let mut in_degree = vec![0usize; self.len()];
        for node in (0..self.len()).filter(|&i| members[i]) {
            for &next in self.successors(node) {
                if members[next] {
                    in_degree[next] += 1;
                }
            }
        }

        let mut stack: Vec<usize> = (0..self.len())
            .rev()
            .filter(|&i| members[i] && in_degree[i] == 0)
            .collect();
        let mut order = Vec::new();

        while let Some(node) = stack.pop() {
            order.push(node);
            for &next in self.successors(node).iter().rev() {
                if !members[next] {
                    continue;
                }
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    stack.push(next);
                }
            }
        }

        let stalled = (0..self.len())
            .filter(|&i| members[i] && in_degree[i] > 0)
            .collect();
        (order, stalled)
    }

    fn to_ids(&self, order: Vec<usize>) -> Vec<String> {
        order.into_iter().map(|i| self.id_at(i).to_string()).collect()
    }
}

/// Union every pair of sets that share an element until the survivors are
/// pairwise disjoint. A merged set keeps the slot of its earliest member.
fn merge_overlapping(routes: Vec<BTreeSet<usize>>) -> Vec<BTreeSet<usize>> {
    let mut merged: Vec<BTreeSet<usize>> = Vec::new();
    for route in routes {
        let touching: Vec<usize> = merged
            .iter()
            .enumerate()
            .filter(|(_, set)| !set.is_disjoint(&route))
            .map(|(i, _)| i)
            .collect();

        let Some(&first) = touching.first() else {
            merged.push(route);
            continue;
        };
        // Remove from the back so earlier indices stay valid.
        for &i in touching[1..].iter().rev() {
            let absorbed = merged.remove(i);
            merged[first].extend(absorbed);
        }
        merged[first].extend(route);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &str)]) -> FlowGraph {
        let mut graph = FlowGraph::new();
        for (from, to) in edges {
            graph.connect(from, to).unwrap();
        }
        graph
    }

    #[test]
    fn test_history_of_chain_node() {
        let g = graph(&[("a", "b"), ("b", "c"), ("c", "d")]);
        assert_eq!(g.get_history("c"), vec!["a", "b", "c"]);
        assert_eq!(g.get_history("a"), vec!["a"]);
    }

    #[test]
    fn test_history_of_unknown_node_is_empty() {
        let g = graph(&[("a", "b")]);
        assert!(g.get_history("zzz").is_empty());
    }

    #[test]
    fn test_history_walks_one_branch_before_the_next() {
        // 1 -> 2 -> {3 -> 4, 5 -> 6} -> 7
        let g = graph(&[
            ("1", "2"),
            ("2", "3"),
            ("2", "5"),
            ("3", "4"),
            ("5", "6"),
            ("4", "7"),
            ("6", "7"),
        ]);
        assert_eq!(g.get_history("7"), vec!["1", "2", "3", "4", "5", "6", "7"]);
        // Only the ancestors of 6 take part.
        assert_eq!(g.get_history("6"), vec!["1", "2", "5", "6"]);
    }

    #[test]
    fn test_history_seeds_follow_insertion_order() {
        let g = graph(&[("x", "m"), ("y", "m")]);
        assert_eq!(g.get_history("m"), vec!["x", "y", "m"]);
    }

    #[test]
    fn test_histories_split_disconnected_components() {
        let mut g = graph(&[("a", "b"), ("c", "d"), ("b", "e")]);
        g.add_node("lonely");
        assert_eq!(
            g.get_histories(),
            vec![
                vec!["a", "b", "e"],
                vec!["c", "d"],
                vec!["lonely"],
            ]
        );
    }

    #[test]
    fn test_histories_merge_routes_sharing_a_node() {
        let g = graph(&[("1", "3"), ("2", "3"), ("3", "4")]);
        assert_eq!(g.get_histories(), vec![vec!["1", "2", "3", "4"]]);
    }

    #[test]
    fn test_histories_bridge_merges_three_routes() {
        // a and c only meet through b's route.
        let g = graph(&[("a", "x"), ("c", "y"), ("b", "x"), ("b", "y")]);
        let histories = g.get_histories();
        assert_eq!(histories.len(), 1);
        assert_eq!(histories[0].len(), 5);
    }

    #[test]
    fn test_histories_exclude_cyclic_leftovers() {
        let g = FlowGraph::from_parts(
            Vec::new(),
            vec![
                ("a".to_string(), "b".to_string()),
                ("c".to_string(), "d".to_string()),
                ("d".to_string(), "c".to_string()),
            ],
        );
        assert_eq!(g.get_histories(), vec![vec!["a", "b"]]);
        assert_eq!(g.cyclic_nodes(), vec!["c", "d"]);
    }

    #[test]
    fn test_connected_graph_has_no_cyclic_nodes() {
        let g = graph(&[("a", "b"), ("b", "c"), ("a", "c")]);
        assert!(g.cyclic_nodes().is_empty());
    }

    #[test]
    fn test_cycle_reachable_from_start_is_excluded() {
        let edges = [("a", "b"), ("b", "c"), ("c", "b"), ("c", "d")];
        let g = FlowGraph::from_parts(
            Vec::new(),
            edges
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect::<Vec<_>>(),
        );
        assert_eq!(g.cyclic_nodes(), vec!["b", "c", "d"]);
        assert_eq!(g.get_history("d"), vec!["a"]);
        assert_eq!(g.get_history("a"), vec!["a"]);
        assert_eq!(g.get_histories(), vec![vec!["a"]]);
    }

    #[test]
    fn test_merge_overlapping_keeps_first_slot() {
        let sets = vec![
            BTreeSet::from([1, 2]),
            BTreeSet::from([5]),
            BTreeSet::from([2, 5]),
            BTreeSet::from([9]),
        ];
        let merged = merge_overlapping(sets);
        assert_eq!(merged, vec![BTreeSet::from([1, 2, 5]), BTreeSet::from([9])]);
    }
}
