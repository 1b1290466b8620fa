//! Persistent storage for flows and nodes.
//!
//! Each record kind lives in its own shard tree, indexed by a
//! tab-separated file that is reconciled against the tree on every open.
//! [`EntityStore`] layers serialization and an LRU cache on top of the
//! [`StorageIndex`]; [`Project`] opens the flow and node stores together.

pub mod clock;
pub mod entity;
pub mod error;
pub mod flow;
pub mod header;
pub mod index;
pub mod node;
pub mod project;
pub mod record;

pub use entity::{EntityStore, FlowStore, NodeStore};
pub use error::{Result, StoreError};
pub use flow::Flow;
pub use header::{HeaderExtractor, RecordHeader, YamlHeaderReader};
pub use index::{CAPACITY, IndexEntry, ReconcileReport, StorageIndex};
pub use node::{NewNode, Node, Role, Segment, Summary, Usage};
pub use project::{Project, ProjectConfig};
pub use record::Record;
