//! Source lint (pre-pass).
//!
//! Reports suspicious structure in the source workflow before conversion. The
//! findings are logged as warnings and never stop the conversion.

pub mod structural;

use crate::error::ConversionError;
use crate::parse::graph::WorkflowGraph;
use crate::parse::normalize::SourceWorkflow;

/// Lint the whole source workflow.
pub fn lint_workflow(workflow: &SourceWorkflow, graph: &WorkflowGraph) -> Vec<ConversionError> {
    structural::lint_structural(workflow, graph)
}
