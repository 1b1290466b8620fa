//! Flow graph for branching conversation histories.
//!
//! A flow is a directed acyclic graph over opaque node identifiers. This crate
//! keeps the edge set cycle-free, reconstructs deterministic linear histories
//! from arbitrary branch/merge topologies, and renders a history into the
//! compact nested notation shown below.
//!
//! ```text
//! 1→2<
//!   2<3>5
//!   2<4>5
//!   >5→6
//! ```
//!
//! Nodes are displayed by their 1-based position in the flow. `a<` marks a
//! branch out of `a`, `>b` marks a merge into `b`, and `→` joins a plain
//! single-predecessor continuation.

pub mod error;
pub mod graph;
pub mod history;
pub mod render;

pub use error::{GraphError, Result};
pub use graph::FlowGraph;
