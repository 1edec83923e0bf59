//! Parse phase: JSON → document types, shape detection, neutral view + graph.

pub mod graph;
pub mod normalize;
pub mod types;

pub use graph::WorkflowGraph;
pub use normalize::{SourceEdge, SourceNode, SourceWorkflow, detect_shape, normalize};
pub use types::*;
