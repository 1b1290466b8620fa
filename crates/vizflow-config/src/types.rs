//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [storage]
//! base_dir = "project"
//! flows_dir = "flows"
//! nodes_dir = "nodes"
//!
//! [cache]
//! max_flows = 256
//! max_nodes = 4096
//!
//! [logging]
//! filter = "info"
//! directory = "logs"   # optional JSON log output
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration structure.
///
/// Every section is optional so that partial files can be layered; a
/// section present in a later layer replaces the earlier one wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VizflowConfig {
    pub storage: Option<StorageConfig>,
    pub cache: Option<CacheConfig>,
    pub logging: Option<LoggingConfig>,
}

impl VizflowConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    pub fn to_toml(&self) -> crate::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: VizflowConfig) {
        if other.storage.is_some() {
            self.storage = other.storage;
        }
        if other.cache.is_some() {
            self.cache = other.cache;
        }
        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// Storage settings, defaulted when the section is absent.
    pub fn storage(&self) -> StorageConfig {
        self.storage.clone().unwrap_or_default()
    }

    pub fn cache(&self) -> CacheConfig {
        self.cache.clone().unwrap_or_default()
    }

    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }
}

/// Where records are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Project directory; relative paths resolve against the working
    /// directory.
    pub base_dir: PathBuf,
    /// Flow tree, relative to `base_dir`.
    pub flows_dir: String,
    /// Node tree, relative to `base_dir`.
    pub nodes_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("project"),
            flows_dir: "flows".to_string(),
            nodes_dir: "nodes".to_string(),
        }
    }
}

/// Capacities of the in-memory record caches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_flows: usize,
    pub max_nodes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_flows: 256,
            max_nodes: 4096,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Directory for daily JSON log files. Disabled when unset.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            directory: None,
        }
    }
}
