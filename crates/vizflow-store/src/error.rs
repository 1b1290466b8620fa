use thiserror::Error;
use vizflow_graph::GraphError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage capacity exceeded: all {capacity} slots are in use")]
    CapacityExceeded { capacity: usize },

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Corrupt record {path}: {reason}")]
    CorruptRecord { path: String, reason: String },

    #[error("Corrupt index {path}: {reason}")]
    CorruptIndex { path: String, reason: String },

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
