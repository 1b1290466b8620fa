//! Byte-exact rendering of the worked branch/merge examples.
//!
//! Each fixture is written as a flowchart (`1 --> 2` per line). Node `n` is
//! registered at position `n`, so labels in the output equal the fixture
//! numbers.

use vizflow_graph::FlowGraph;

fn flow_map(flowchart: &str) -> Vec<String> {
    let mut numbers = Vec::new();
    let mut edges = Vec::new();
    for line in flowchart.lines() {
        let Some((from, to)) = line.split_once("-->") else {
            continue;
        };
        let from: u32 = from.trim().parse().unwrap();
        let to: u32 = to.trim().parse().unwrap();
        numbers.extend([from, to]);
        edges.push((from.to_string(), to.to_string()));
    }
    numbers.sort_unstable();
    numbers.dedup();

    let mut graph = FlowGraph::new();
    for n in numbers {
        graph.add_node(&n.to_string());
    }
    for (from, to) in edges {
        graph.connect(&from, &to).unwrap();
    }
    graph.render_all()
}

#[test]
fn linear_chain() {
    let result = flow_map(
        "
        1 --> 2
        2 --> 3
        3 --> 4
        ",
    );
    assert_eq!(result, vec!["1→2→3→4"]);
}

#[test]
fn simple_fork() {
    let result = flow_map(
        "
        1 --> 2
        2 --> 3
        2 --> 4
        ",
    );
    assert_eq!(result, vec!["1→2<\n  2<3\n  2<4"]);
}

#[test]
fn simple_join() {
    let result = flow_map(
        "
        1 --> 3
        2 --> 3
        3 --> 4
        ",
    );
    assert_eq!(result, vec!["1>3\n  2>3\n  >3→4"]);
}

#[test]
fn diamond() {
    let result = flow_map(
        "
        1 --> 2
        2 --> 3
        2 --> 4
        3 --> 5
        4 --> 5
        5 --> 6
        ",
    );
    assert_eq!(result, vec!["1→2<\n  2<3>5\n  2<4>5\n  >5→6"]);
}

#[test]
fn long_diamond() {
    let result = flow_map(
        "
        1 --> 2
        2 --> 3
        2 --> 5
        3 --> 4
        5 --> 6
        4 --> 7
        6 --> 7
        7 --> 8
        ",
    );
    assert_eq!(result, vec!["1→2<\n  2<3→4>7\n  2<5→6>7\n  >7→8"]);
}

#[test]
fn triple_fork_join() {
    let result = flow_map(
        "
        1 --> 2
        2 --> 3
        2 --> 4
        2 --> 5
        3 --> 6
        4 --> 6
        5 --> 6
        6 --> 7
        ",
    );
    assert_eq!(result, vec!["1→2<\n  2<3>6\n  2<4>6\n  2<5>6\n  >6→7"]);
}

#[test]
fn disconnected_flows_render_separately() {
    let result = flow_map(
        "
        1 --> 2
        3 --> 4
        4 --> 5
        ",
    );
    assert_eq!(result, vec!["1→2", "3→4→5"]);
}
