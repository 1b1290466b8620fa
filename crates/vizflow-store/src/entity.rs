//! Record stores: a storage index plus an LRU cache of decoded records.

use std::fs;
use std::io;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use lru::LruCache;
use tracing::{debug, info, trace};

use crate::clock::now;
use crate::flow::Flow;
use crate::header::{YamlHeaderReader, sentinel_id};
use crate::index::StorageIndex;
use crate::node::{NewNode, Node};
use crate::record::{Record, write_atomic};
use crate::{Result, StoreError};

/// Persistent store of one record kind.
pub struct EntityStore<R: Record> {
    index: StorageIndex,
    cache: LruCache<String, R>,
}

pub type FlowStore = EntityStore<Flow>;
pub type NodeStore = EntityStore<Node>;

impl<R: Record> std::fmt::Debug for EntityStore<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStore")
            .field("kind", &R::KIND)
            .field("index", &self.index)
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl<R: Record> EntityStore<R> {
    /// Open the store rooted at `root`, reconciling its index. At most
    /// `cache_capacity` decoded records are kept in memory (minimum one).
    pub fn open(root: impl Into<PathBuf>, cache_capacity: usize) -> Result<Self> {
        let reader = YamlHeaderReader::new(R::ID_KEY, R::TIMESTAMP_KEY);
        let index = StorageIndex::open(root, R::EXTENSION, reader)?;
        debug!(
            kind = R::KIND,
            root = %index.root().display(),
            records = index.len(),
            "Opened store"
        );
        let cap = NonZeroUsize::new(cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Ok(Self {
            index,
            cache: LruCache::new(cap),
        })
    }

    pub fn index(&self) -> &StorageIndex {
        &self.index
    }

    /// Known record identifiers in index order.
    pub fn ids(&self) -> Vec<String> {
        self.index.ids()
    }

    pub fn len(&self) -> usize {
        self.ids().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `id` names a stored record. Agrees with [`Self::ids`], so the
    /// sentinel under which unreadable files are indexed is never contained.
    pub fn contains(&self, id: &str) -> bool {
        id != sentinel_id() && self.index.contains_id(id)
    }

    /// A fresh identifier for a new record.
    pub fn generate_id(&self) -> String {
        self.index.generate_identifier()
    }

    /// Load a record, from cache when possible.
    pub fn get(&mut self, id: &str) -> Result<R> {
        if let Some(record) = self.cache.get(id) {
            trace!(kind = R::KIND, id = %id, "Cache hit");
            return Ok(record.clone());
        }
        trace!(kind = R::KIND, id = %id, "Cache miss");

        let record = self.load(id)?;
        self.cache.put(id.to_string(), record.clone());
        Ok(record)
    }

    /// Persist `record`, overwriting its newest file or allocating a new
    /// slot for an unseen identifier.
    pub fn put(&mut self, record: R) -> Result<()> {
        let text = record.encode()?;
        match self.index.latest_path(record.id()) {
            Ok(path) => {
                write_atomic(&path, text.as_bytes())?;
                debug!(kind = R::KIND, id = %record.id(), path = %path.display(), "Rewrote record");
            }
            Err(StoreError::NotFound(_)) => {
                let relpath = self.index.allocate_slot()?;
                write_atomic(&self.index.root().join(&relpath), text.as_bytes())?;
                self.index
                    .register(&relpath, record.id(), record.timestamp())?;
                info!(kind = R::KIND, id = %record.id(), relpath = %relpath, "Stored new record");
            }
            Err(e) => return Err(e),
        }
        self.cache.put(record.id().to_string(), record);
        Ok(())
    }

    /// Load `id`, apply `f`, and persist the result if `f` succeeds.
    pub fn update<T, F>(&mut self, id: &str, f: F) -> Result<T>
    where
        F: FnOnce(&mut R) -> Result<T>,
    {
        let mut record = self.get(id)?;
        let out = f(&mut record)?;
        self.put(record)?;
        Ok(out)
    }

    fn load(&self, id: &str) -> Result<R> {
        let path = self.index.latest_path(id)?;
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let corrupt = |reason: String| StoreError::CorruptRecord {
            path: path.display().to_string(),
            reason,
        };
        let record = R::decode(&text).map_err(|e| corrupt(e.to_string()))?;
        if record.id() != id {
            return Err(corrupt(format!(
                "{} file holds id {}, expected {id}",
                R::KIND,
                record.id()
            )));
        }
        Ok(record)
    }
}

impl FlowStore {
    pub fn create_flow(&mut self, name: &str, description: &str) -> Result<Flow> {
        let flow = Flow::new(self.generate_id(), name, description);
        self.put(flow.clone())?;
        Ok(flow)
    }

    /// Add `from → to` to a stored flow. See [`Flow::connect`].
    pub fn connect(&mut self, flow_id: &str, from: &str, to: &str) -> Result<bool> {
        self.update(flow_id, |flow| flow.connect(from, to))
    }

    pub fn disconnect(&mut self, flow_id: &str, from: &str, to: &str) -> Result<bool> {
        self.update(flow_id, |flow| Ok(flow.disconnect(from, to)))
    }

    pub fn remove_node(&mut self, flow_id: &str, node_id: &str) -> Result<bool> {
        self.update(flow_id, |flow| Ok(flow.remove_node(node_id)))
    }

    /// Every stored flow in index order.
    pub fn list_flows(&mut self) -> Result<Vec<Flow>> {
        self.ids().iter().map(|id| self.get(id)).collect()
    }
}

impl NodeStore {
    /// Store a new node under a fresh identifier.
    pub fn create_node(&mut self, new: NewNode) -> Result<Node> {
        let node = Node::from_new(self.generate_id(), new);
        self.put(node.clone())?;
        Ok(node)
    }

    pub fn set_tags(&mut self, id: &str, tags: Vec<String>) -> Result<Node> {
        self.update(id, |node| {
            node.tags = tags;
            Ok(node.clone())
        })
    }

    /// Record whether the node's summary is current. Marking it built also
    /// stamps `last_built`.
    pub fn mark_summary(&mut self, id: &str, built: bool) -> Result<Node> {
        self.update(id, |node| {
            node.summary.updated = built;
            if built {
                node.summary.last_built = now();
            }
            Ok(node.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Role;

    #[test]
    fn test_put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FlowStore::open(dir.path(), 4).unwrap();
        let flow = store.create_flow("demo", "first").unwrap();

        assert!(store.contains(&flow.id));
        assert_eq!(store.ids(), vec![flow.id.clone()]);
        assert!(dir.path().join("00/00.yaml").exists());
        assert_eq!(store.get(&flow.id).unwrap(), flow);
    }

    #[test]
    fn test_get_unknown_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = NodeStore::open(dir.path(), 4).unwrap();
        assert!(matches!(store.get("nope"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_put_overwrites_existing_slot() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FlowStore::open(dir.path(), 4).unwrap();
        let flow = store.create_flow("demo", "").unwrap();
        store.connect(&flow.id, "a", "b").unwrap();

        assert_eq!(store.index().len(), 1);
        let reopened = FlowStore::open(dir.path(), 4).unwrap().get(&flow.id).unwrap();
        assert!(reopened.graph().has_edge("a", "b"));
    }

    #[test]
    fn test_rejected_update_is_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FlowStore::open(dir.path(), 4).unwrap();
        let flow = store.create_flow("demo", "").unwrap();
        store.connect(&flow.id, "a", "b").unwrap();
        let before = fs::read(dir.path().join("00/00.yaml")).unwrap();

        assert!(store.connect(&flow.id, "b", "a").is_err());
        assert_eq!(fs::read(dir.path().join("00/00.yaml")).unwrap(), before);
        assert_eq!(store.get(&flow.id).unwrap().graph().edge_count(), 1);
    }

    #[test]
    fn test_corrupt_record_surfaces() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = NodeStore::open(dir.path(), 1).unwrap();
        let node = store.create_node(NewNode::exchange("q", "a", "m")).unwrap();
        let other = store.create_node(NewNode::exchange("q2", "a2", "m")).unwrap();
        // `other` evicts `node` from the single-entry cache.
        assert!(store.get(&other.id).is_ok());

        let path = store.index().latest_path(&node.id).unwrap();
        fs::write(&path, format!("id: {}\ntimestamp: nonsense\n", node.id)).unwrap();
        assert!(matches!(
            store.get(&node.id),
            Err(StoreError::CorruptRecord { .. })
        ));
    }

    #[test]
    fn test_cache_serves_until_evicted() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = NodeStore::open(dir.path(), 1).unwrap();
        let node = store.create_node(NewNode::exchange("q", "a", "m")).unwrap();
        let path = store.index().latest_path(&node.id).unwrap();
        fs::remove_file(&path).unwrap();

        // Still cached.
        assert_eq!(store.get(&node.id).unwrap(), node);

        store.create_node(NewNode::exchange("q2", "a2", "m")).unwrap();
        assert!(matches!(store.get(&node.id), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_node_amendments() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = NodeStore::open(dir.path(), 8).unwrap();
        let node = store
            .create_node(NewNode::exchange("hello\r\n", "world  ", "m"))
            .unwrap();
        assert_eq!(node.text_of(Role::User), Some("hello"));

        let tagged = store
            .set_tags(&node.id, vec!["draft".into(), "x".into()])
            .unwrap();
        assert_eq!(tagged.tags, ["draft", "x"]);

        let built = store.mark_summary(&node.id, true).unwrap();
        assert!(built.summary.updated);
        assert!(built.summary.last_built >= node.summary.last_built);

        let reopened = NodeStore::open(dir.path(), 8).unwrap().get(&node.id).unwrap();
        assert_eq!(reopened.tags, ["draft", "x"]);
        assert!(reopened.summary.updated);
        assert_eq!(reopened.segments, node.segments);
    }

    #[test]
    fn test_unreadable_file_is_not_a_record() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("00")).unwrap();
        fs::write(dir.path().join("00/00.yaml"), "not a flow\n").unwrap();

        let mut store = FlowStore::open(dir.path(), 4).unwrap();
        assert!(store.index().contains_id(&sentinel_id()));
        assert!(!store.contains(&sentinel_id()));
        assert!(store.is_empty());
        assert!(store.get(&sentinel_id()).is_err());
    }

    #[test]
    fn test_list_flows_in_index_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FlowStore::open(dir.path(), 2).unwrap();
        let names: Vec<String> = ["one", "two", "three"]
            .iter()
            .map(|n| store.create_flow(n, "").unwrap().name)
            .collect();
        let listed: Vec<String> = store.list_flows().unwrap().into_iter().map(|f| f.name).collect();
        assert_eq!(listed, names);
        assert_eq!(store.len(), 3);
    }
}
