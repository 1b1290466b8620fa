//! A project directory holding one flow store and one node store.

use std::path::PathBuf;

use tracing::info;

use crate::{Result, StoreError};
use crate::entity::{FlowStore, NodeStore};
use crate::node::{NewNode, Node};

/// Where a project lives and how much it caches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    pub base_dir: PathBuf,
    pub flows_dir: String,
    pub nodes_dir: String,
    pub max_flows: usize,
    pub max_nodes: usize,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("project"),
            flows_dir: "flows".to_string(),
            nodes_dir: "nodes".to_string(),
            max_flows: 256,
            max_nodes: 4096,
        }
    }
}

impl ProjectConfig {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    pub fn flows_root(&self) -> PathBuf {
        self.base_dir.join(&self.flows_dir)
    }

    pub fn nodes_root(&self) -> PathBuf {
        self.base_dir.join(&self.nodes_dir)
    }
}

#[derive(Debug)]
pub struct Project {
    pub flows: FlowStore,
    pub nodes: NodeStore,
}

impl Project {
    /// Open both stores, reconciling their indexes.
    pub fn open(config: &ProjectConfig) -> Result<Self> {
        let flows = FlowStore::open(config.flows_root(), config.max_flows)?;
        let nodes = NodeStore::open(config.nodes_root(), config.max_nodes)?;
        info!(
            base_dir = %config.base_dir.display(),
            flows = flows.len(),
            nodes = nodes.len(),
            "Opened project"
        );
        Ok(Self { flows, nodes })
    }

    /// Store a new node and attach it to `flow_id`, after `parent` when
    /// given. `parent` must already belong to the flow. A rejected edge
    /// leaves the node stored but unattached.
    pub fn record_exchange(
        &mut self,
        flow_id: &str,
        parent: Option<&str>,
        new: NewNode,
    ) -> Result<Node> {
        // Fail before writing anything if the flow or parent is unknown.
        let flow = self.flows.get(flow_id)?;
        if let Some(parent) = parent
            && !flow.exists(parent)
        {
            return Err(StoreError::NotFound(format!("{parent} in flow {flow_id}")));
        }
        let node = self.nodes.create_node(new)?;
        self.flows.update(flow_id, |flow| match parent {
            Some(parent) => flow.connect(parent, &node.id).map(drop),
            None => {
                flow.add_node(&node.id);
                Ok(())
            }
        })?;
        Ok(node)
    }
}
