//! In-memory flow graph.
//!
//! Node identifiers are interned into dense indices (their insertion order),
//! so adjacency is stored as index-keyed vectors. The edge list is the source
//! of truth: removals rebuild both adjacency tables from it.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::{GraphError, Result};

/// A directed acyclic graph over opaque node identifiers.
///
/// `nodes` keeps first-seen order and only grows until an explicit
/// [`remove_node`](FlowGraph::remove_node). Each node's display label is its
/// 1-based position in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowGraph {
    nodes: Vec<String>,
    slots: HashMap<String, usize>,
    edges: Vec<(usize, usize)>,
    forward: Vec<Vec<usize>>,
    reverse: Vec<Vec<usize>>,
}

impl FlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a graph from persisted node and edge lists.
    ///
    /// Edges are committed without the cycle guard so that a flow damaged
    /// outside this process still loads; unknown endpoints are appended to
    /// the node list and duplicate edges are dropped.
    pub fn from_parts<N, E>(nodes: N, edges: E) -> Self
    where
        N: IntoIterator<Item = String>,
        E: IntoIterator<Item = (String, String)>,
    {
        let mut graph = Self::new();
        for id in nodes {
            graph.register(&id);
        }
        for (from, to) in edges {
            let f = graph.register(&from);
            let t = graph.register(&to);
            if graph.forward[f].contains(&t) {
                debug!(from = %from, to = %to, "Dropping duplicate edge");
                continue;
            }
            graph.commit(f, t);
        }
        if !graph.is_acyclic() {
            warn!(
                nodes = graph.nodes.len(),
                edges = graph.edges.len(),
                "Loaded flow graph contains a cycle"
            );
        }
        graph
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Node identifiers in first-seen order.
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    /// Edges in commit order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.edges
            .iter()
            .map(|&(f, t)| (self.nodes[f].as_str(), self.nodes[t].as_str()))
    }

    pub fn exists(&self, id: &str) -> bool {
        self.slots.contains_key(id)
    }

    /// 1-based position of `id`, used as its display label.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index(id).map(|i| i + 1)
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        match (self.index(from), self.index(to)) {
            (Some(f), Some(t)) => self.forward[f].contains(&t),
            _ => false,
        }
    }

    /// Register `id` as an isolated node if it is not already known.
    /// Returns its 1-based position.
    pub fn add_node(&mut self, id: &str) -> usize {
        self.register(id) + 1
    }

    /// Add the edge `from -> to`.
    ///
    /// Returns `Ok(false)` when the edge already existed. Fails with
    /// [`GraphError::CycleDetected`] if `from` is reachable from `to`; in that
    /// case neither the node list nor the edge list is touched.
    pub fn connect(&mut self, from: &str, to: &str) -> Result<bool> {
        match (self.index(from), self.index(to)) {
            (Some(f), Some(t)) => {
                if self.forward[f].contains(&t) {
                    return Ok(false);
                }
                if self.reaches(t, f, (f, t)) {
                    return Err(cycle(from, to));
                }
            }
            // A fresh endpoint can only close a loop onto itself.
            _ if from == to => return Err(cycle(from, to)),
            _ => {}
        }

        let f = self.register(from);
        let t = self.register(to);
        self.commit(f, t);
        debug!(from = %from, to = %to, "Connected");
        Ok(true)
    }

    /// Remove the edge `from -> to`. Returns whether an edge was removed.
    pub fn disconnect(&mut self, from: &str, to: &str) -> bool {
        let (Some(f), Some(t)) = (self.index(from), self.index(to)) else {
            return false;
        };
        let before = self.edges.len();
        self.edges.retain(|&edge| edge != (f, t));
        if self.edges.len() == before {
            return false;
        }
        self.rebuild_adjacency();
        true
    }

    /// Remove `id` and every edge touching it. Returns whether it existed.
    ///
    /// Later nodes shift down one position.
    pub fn remove_node(&mut self, id: &str) -> bool {
        let Some(gone) = self.index(id) else {
            return false;
        };
        let shift = |i: usize| if i > gone { i - 1 } else { i };

        self.edges.retain(|&(f, t)| f != gone && t != gone);
        for edge in &mut self.edges {
            *edge = (shift(edge.0), shift(edge.1));
        }
        self.nodes.remove(gone);
        self.slots = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        self.rebuild_adjacency();
        true
    }

    /// Direct predecessors of `id`, in edge order. Empty if `id` is unknown.
    pub fn get_previous(&self, id: &str) -> Vec<&str> {
        self.index(id)
            .map(|i| self.ids(&self.reverse[i]))
            .unwrap_or_default()
    }

    /// Direct successors of `id`, in edge order. Empty if `id` is unknown.
    pub fn get_next(&self, id: &str) -> Vec<&str> {
        self.index(id)
            .map(|i| self.ids(&self.forward[i]))
            .unwrap_or_default()
    }

    /// Whether every node can be ordered topologically.
    pub fn is_acyclic(&self) -> bool {
        let mut in_degree: Vec<usize> = self.reverse.iter().map(Vec::len).collect();
        let mut stack: Vec<usize> = (0..self.nodes.len())
            .filter(|&i| in_degree[i] == 0)
            .collect();
        let mut visited = 0;
        while let Some(node) = stack.pop() {
            visited += 1;
            for &next in &self.forward[node] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    stack.push(next);
                }
            }
        }
        visited == self.nodes.len()
    }

    // ── index-level access for history and render ───────────────────

    pub(crate) fn index(&self, id: &str) -> Option<usize> {
        self.slots.get(id).copied()
    }

    pub(crate) fn id_at(&self, index: usize) -> &str {
        &self.nodes[index]
    }

    pub(crate) fn successors(&self, index: usize) -> &[usize] {
        &self.forward[index]
    }

    pub(crate) fn predecessors(&self, index: usize) -> &[usize] {
        &self.reverse[index]
    }

    fn ids(&self, indices: &[usize]) -> Vec<&str> {
        indices.iter().map(|&i| self.nodes[i].as_str()).collect()
    }

    fn register(&mut self, id: &str) -> usize {
        if let Some(i) = self.index(id) {
            return i;
        }
        let i = self.nodes.len();
        self.nodes.push(id.to_string());
        self.slots.insert(id.to_string(), i);
        self.forward.push(Vec::new());
        self.reverse.push(Vec::new());
        i
    }

    fn commit(&mut self, from: usize, to: usize) {
        self.edges.push((from, to));
        self.forward[from].push(to);
        self.reverse[to].push(from);
    }

    fn rebuild_adjacency(&mut self) {
        let n = self.nodes.len();
        self.forward = vec![Vec::new(); n];
        self.reverse = vec![Vec::new(); n];
        for &(f, t) in &self.edges {
            self.forward[f].push(t);
            self.reverse[t].push(f);
        }
    }

    /// Depth-first probe from `start` looking for `target`, over the current
    /// forward adjacency plus the tentative edge. The tentative edge lives in
    /// a copied row only; nothing shared is mutated.
    fn reaches(&self, start: usize, target: usize, tentative: (usize, usize)) -> bool {
        let (src, dst) = tentative;
        let mut overlay = self.forward[src].clone();
        overlay.push(dst);

        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            if node == target {
                return true;
            }
            if std::mem::replace(&mut seen[node], true) {
                continue;
            }
            let row = if node == src {
                &overlay
            } else {
                &self.forward[node]
            };
            stack.extend(row.iter().copied().filter(|&next| !seen[next]));
        }
        false
    }
}

fn cycle(from: &str, to: &str) -> GraphError {
    GraphError::CycleDetected {
        from: from.to_string(),
        to: to.to_string(),
    }
}
