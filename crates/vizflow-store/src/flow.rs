//! Flow record: a named conversation graph with timestamps.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use vizflow_graph::FlowGraph;

use crate::clock::now;
use crate::record::Record;
use crate::{Result, StoreError};

/// A named flow graph.
///
/// Every mutation that changes or confirms the edge set bumps `updated`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flow {
    pub id: String,
    pub name: String,
    pub created: DateTime<FixedOffset>,
    pub updated: DateTime<FixedOffset>,
    pub description: String,
    graph: FlowGraph,
}

impl Flow {
    /// An empty flow stamped now.
    pub fn new(id: impl Into<String>, name: impl Into<String>, description: impl Into<String>) -> Self {
        let ts = now();
        Self {
            id: id.into(),
            name: name.into(),
            created: ts,
            updated: ts,
            description: description.into(),
            graph: FlowGraph::new(),
        }
    }

    pub fn graph(&self) -> &FlowGraph {
        &self.graph
    }

    pub fn touch(&mut self) {
        self.updated = now();
    }

    pub fn exists(&self, id: &str) -> bool {
        self.graph.exists(id)
    }

    pub fn add_node(&mut self, id: &str) -> usize {
        if self.graph.exists(id) {
            return self.graph.add_node(id);
        }
        self.touch();
        self.graph.add_node(id)
    }

    /// Add `from → to`. Returns `false` if the edge was already present;
    /// the flow is touched either way. A rejected edge leaves the flow,
    /// timestamps included, untouched.
    pub fn connect(&mut self, from: &str, to: &str) -> Result<bool> {
        let added = self.graph.connect(from, to)?;
        self.touch();
        Ok(added)
    }

    pub fn disconnect(&mut self, from: &str, to: &str) -> bool {
        let removed = self.graph.disconnect(from, to);
        if removed {
            self.touch();
        }
        removed
    }

    pub fn remove_node(&mut self, id: &str) -> bool {
        let removed = self.graph.remove_node(id);
        if removed {
            self.touch();
        }
        removed
    }

    pub fn get_previous(&self, id: &str) -> Vec<&str> {
        self.graph.get_previous(id)
    }

    fn to_document(&self) -> FlowDocument {
        let nodes = self.graph.nodes();
        let slot = |id: &str| {
            nodes
                .iter()
                .position(|n| n == id)
                .map(|i| i + 1)
                .unwrap_or_default()
        };
        FlowDocument {
            id: self.id.clone(),
            name: self.name.clone(),
            created: self.created,
            updated: self.updated,
            description: self.description.clone(),
            nodes: nodes
                .iter()
                .enumerate()
                .map(|(i, id)| NodeSlot {
                    index: i + 1,
                    id: id.clone(),
                })
                .collect(),
            connections: self
                .graph
                .edges()
                .map(|(from, to)| Connection {
                    from: slot(from),
                    to: slot(to),
                })
                .collect(),
        }
    }

    fn from_document(doc: FlowDocument) -> Result<Self> {
        let mut slots = doc.nodes;
        slots.sort_by_key(|slot| slot.index);

        let resolve = |index: usize| {
            slots
                .iter()
                .find(|slot| slot.index == index)
                .map(|slot| slot.id.clone())
                .ok_or_else(|| {
                    StoreError::InvalidDocument(format!(
                        "flow {} references missing node index {index}",
                        doc.id
                    ))
                })
        };
        let edges = doc
            .connections
            .iter()
            .map(|c| Ok((resolve(c.from)?, resolve(c.to)?)))
            .collect::<Result<Vec<_>>>()?;
        let graph = FlowGraph::from_parts(slots.iter().map(|slot| slot.id.clone()), edges);

        Ok(Self {
            id: doc.id,
            name: doc.name,
            created: doc.created,
            updated: doc.updated,
            description: doc.description,
            graph,
        })
    }
}

impl Record for Flow {
    const KIND: &'static str = "flow";
    const EXTENSION: &'static str = "yaml";
    const TIMESTAMP_KEY: &'static str = "updated";

    fn id(&self) -> &str {
        &self.id
    }

    fn timestamp(&self) -> DateTime<FixedOffset> {
        self.updated
    }

    fn encode(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.to_document())?)
    }

    fn decode(text: &str) -> Result<Self> {
        Self::from_document(serde_yaml::from_str(text)?)
    }
}

/// On-disk layout. Header fields come first.
#[derive(Debug, Serialize, Deserialize)]
struct FlowDocument {
    id: String,
    name: String,
    created: DateTime<FixedOffset>,
    updated: DateTime<FixedOffset>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    nodes: Vec<NodeSlot>,
    #[serde(default)]
    connections: Vec<Connection>,
}

#[derive(Debug, Serialize, Deserialize)]
struct NodeSlot {
    index: usize,
    id: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Connection {
    from: usize,
    to: usize,
}
