//! Branch/merge rendering of a linear history.
//!
//! Adjacency is restricted to edges with both endpoints in the history.
//! Markup per line:
//!
//! - `a→b`   plain continuation
//! - `a<`    `a` branches; each branch line then opens with `a<`
//! - `a>b`   this segment merges into `b`
//! - `>b`    continuation line after the merge point `b`
//! - `p,q<`  a segment whose first node has several predecessors

use tracing::debug;

use crate::FlowGraph;

const INDENT: &str = "  ";
const ARROW: &str = "→";
const BRANCH: &str = "<";
const MERGE: &str = ">";

impl FlowGraph {
    /// Render `history` as display lines. Nodes are labelled by their 1-based
    /// position in the flow. Identifiers unknown to the flow are skipped.
    pub fn render(&self, history: &[String]) -> Vec<String> {
        let order: Vec<usize> = history
            .iter()
            .filter_map(|id| {
                let index = self.index(id);
                if index.is_none() {
                    debug!(id = %id, "Skipping unknown node while rendering");
                }
                index
            })
            .collect();

        let mut members = vec![false; self.len()];
        for &node in &order {
            members[node] = true;
        }
        let restricted = |row: &[usize]| -> Vec<usize> {
            row.iter().copied().filter(|&i| members[i]).collect()
        };
        let next: Vec<Vec<usize>> = (0..self.len())
            .map(|i| restricted(self.successors(i)))
            .collect();
        let prev: Vec<Vec<usize>> = (0..self.len())
            .map(|i| restricted(self.predecessors(i)))
            .collect();

        let mut lines = Vec::new();
        let mut line = String::new();
        let mut previous: Option<usize> = None;

        for &node in &order {
            if let Some(p) = previous {
                if !next[p].contains(&node) {
                    // `node` opens a segment not continuing from `p`.
                    if !next[p].is_empty() {
                        line.push_str(MERGE);
                        line.push_str(&labels(&next[p]));
                    }
                    lines.push(std::mem::replace(&mut line, INDENT.to_string()));
                    if !prev[node].is_empty() {
                        line.push_str(&labels(&prev[node]));
                        line.push_str(BRANCH);
                    }
                } else if prev[node].len() > 1 {
                    lines.push(format!("{line}{MERGE}{}", label(node)));
                    line = format!("{INDENT}{MERGE}");
                } else if next[p].len() > 1 {
                    // Branch marker already written when `p` was emitted.
                } else {
                    line.push_str(ARROW);
                }
            }

            line.push_str(&label(node).to_string());

            if next[node].len() > 1 {
                lines.push(format!("{line}{BRANCH}"));
                line = format!("{INDENT}{}{BRANCH}", label(node));
            }
            previous = Some(node);
        }

        if !line.is_empty() {
            lines.push(line);
        }
        lines
    }

    /// Render every history from [`get_histories`](FlowGraph::get_histories),
    /// one newline-joined block per history.
    pub fn render_all(&self) -> Vec<String> {
        self.get_histories()
            .iter()
            .map(|history| self.render(history).join("\n"))
            .collect()
    }
}

fn label(index: usize) -> usize {
    index + 1
}

fn labels(indices: &[usize]) -> String {
    indices
        .iter()
        .map(|&i| label(i).to_string())
        .collect::<Vec<_>>()
        .join(",")
}
