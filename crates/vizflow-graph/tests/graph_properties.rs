//! Property tests: acyclicity under arbitrary connect sequences and
//! topological validity of every reconstructed history.

use std::collections::HashMap;

use proptest::prelude::*;
use vizflow_graph::{FlowGraph, GraphError};

fn edge_strategy() -> impl Strategy<Value = Vec<(u8, u8)>> {
    prop::collection::vec((0u8..12, 0u8..12), 0..40)
}

fn build(edges: &[(u8, u8)]) -> (FlowGraph, usize) {
    let mut graph = FlowGraph::new();
    let mut rejected = 0;
    for (from, to) in edges {
        let before: Vec<(String, String)> = graph
            .edges()
            .map(|(f, t)| (f.to_string(), t.to_string()))
            .collect();
        match graph.connect(&from.to_string(), &to.to_string()) {
            Ok(_) => {}
            Err(GraphError::CycleDetected { .. }) => {
                rejected += 1;
                let after: Vec<(String, String)> = graph
                    .edges()
                    .map(|(f, t)| (f.to_string(), t.to_string()))
                    .collect();
                assert_eq!(before, after, "rejected connect mutated the edge list");
            }
        }
    }
    (graph, rejected)
}

fn assert_topological(graph: &FlowGraph, history: &[String]) {
    let mut seen = HashMap::new();
    for (pos, id) in history.iter().enumerate() {
        assert!(seen.insert(id.as_str(), pos).is_none(), "{id} repeated");
    }
    for (from, to) in graph.edges() {
        if let (Some(a), Some(b)) = (seen.get(from), seen.get(to)) {
            assert!(a < b, "{from} must precede {to} in {history:?}");
        }
    }
}

proptest! {
    #[test]
    fn committed_edges_never_form_a_cycle(edges in edge_strategy()) {
        let (graph, _) = build(&edges);
        prop_assert!(graph.is_acyclic());
        for (from, to) in edges {
            let (from, to) = (from.to_string(), to.to_string());
            if graph.has_edge(&from, &to) {
                // The reverse direction must now be refused.
                let mut probe = graph.clone();
                prop_assert!(probe.connect(&to, &from).is_err());
                prop_assert_eq!(&probe, &graph);
            }
        }
    }

    #[test]
    fn node_history_is_topological(edges in edge_strategy()) {
        let (graph, _) = build(&edges);
        for id in graph.nodes() {
            let history = graph.get_history(id);
            prop_assert_eq!(history.last(), Some(id));
            assert_topological(&graph, &history);
        }
    }

    #[test]
    fn histories_partition_the_flow(edges in edge_strategy()) {
        let (graph, _) = build(&edges);
        let histories = graph.get_histories();
        let total: usize = histories.iter().map(Vec::len).sum();
        prop_assert_eq!(total, graph.len());
        let all: Vec<String> = histories.iter().flatten().cloned().collect();
        assert_topological(&graph, &all);
        for history in &histories {
            prop_assert!(!graph.render(history).is_empty());
        }
    }
}
