use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// Committing the edge would close a directed cycle. The graph is unchanged.
    #[error("Cycle detected: connecting {from} -> {to} would close a loop")]
    CycleDetected { from: String, to: String },
}

pub type Result<T> = std::result::Result<T, GraphError>;
