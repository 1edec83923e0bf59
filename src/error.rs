//! Conversion error kinds shared by all phases.
//!
//! None of these abort a conversion. The orchestrator renders each one into a
//! diagnostic log entry and carries on with a local fallback.

use serde::Serialize;

use crate::platform::Platform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Validating,
    ConvertingNodes,
    ConvertingConnections,
    Assembling,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Validating => write!(f, "Validating"),
            Phase::ConvertingNodes => write!(f, "Converting nodes"),
            Phase::ConvertingConnections => write!(f, "Converting connections"),
            Phase::Assembling => write!(f, "Assembling"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConversionError {
    #[error("Source workflow is empty; returning an empty {target} workflow")]
    InvalidInput { target: Platform },

    #[error("Source workflow is not valid JSON ({reason}); returning an empty {target} workflow")]
    MalformedDocument { reason: String, target: Platform },

    #[error("Document is neither an n8n workflow nor a Make blueprint; returning an empty {target} workflow")]
    UnrecognizedShape { target: Platform },

    #[error("Document was declared as {declared} but is shaped like a {detected} workflow; converting it as {detected}")]
    ShapeMismatch {
        declared: Platform,
        detected: Platform,
    },

    #[error("Source and target platform are the same ({platform}); returning the workflow unchanged")]
    UnsupportedDirection { platform: Platform },

    #[error("Unknown platform '{0}'")]
    UnknownPlatform(String),

    #[error("{0}; using default options")]
    InvalidOptions(String),

    #[error("Node '{node_id}' could not be read ({reason}); created a placeholder")]
    MalformedNode { node_id: String, reason: String },

    #[error("No mapping found for node type '{node_type}' (node '{node_id}'); created a placeholder")]
    UnmappedType { node_id: String, node_type: String },

    #[error("Mapping for '{node_type}' (node '{node_id}') has accuracy {accuracy}, below the threshold of {threshold}; created a placeholder")]
    LowAccuracy {
        node_id: String,
        node_type: String,
        accuracy: u8,
        threshold: u8,
    },

    #[error("Parameter '{path}' of node '{node_id}' needs review: {reason}")]
    AmbiguousExpression {
        node_id: String,
        path: String,
        reason: String,
    },

    #[error("Route filter '{filter}' on node '{node_id}' was dropped; re-create its conditions in {target}")]
    DroppedFilter {
        node_id: String,
        filter: String,
        target: Platform,
    },

    #[error("Connection from '{from}' to '{to}' dropped: {reason}")]
    DanglingConnection {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Connection from '{from}' to '{to}' cannot be represented in {target}: {reason}")]
    UnrepresentableConnection {
        from: String,
        to: String,
        target: Platform,
        reason: String,
    },

    #[error("{message}")]
    Lint {
        code: &'static str,
        message: String,
        node_id: Option<String>,
    },
}

impl ConversionError {
    /// Stable machine-readable code for log consumers.
    pub fn code(&self) -> &'static str {
        match self {
            ConversionError::InvalidInput { .. } => "C001",
            ConversionError::UnrecognizedShape { .. } => "C002",
            ConversionError::ShapeMismatch { .. } => "C003",
            ConversionError::UnsupportedDirection { .. } => "C004",
            ConversionError::UnknownPlatform(_) => "C005",
            ConversionError::InvalidOptions(_) => "C006",
            ConversionError::MalformedDocument { .. } => "C007",
            ConversionError::MalformedNode { .. } => "N001",
            ConversionError::UnmappedType { .. } => "N002",
            ConversionError::LowAccuracy { .. } => "N003",
            ConversionError::AmbiguousExpression { .. } => "X001",
            ConversionError::DroppedFilter { .. } => "X002",
            ConversionError::DanglingConnection { .. } => "E001",
            ConversionError::UnrepresentableConnection { .. } => "E002",
            ConversionError::Lint { code, .. } => *code,
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            ConversionError::InvalidInput { .. }
            | ConversionError::UnrecognizedShape { .. }
            | ConversionError::ShapeMismatch { .. }
            | ConversionError::UnsupportedDirection { .. }
            | ConversionError::UnknownPlatform(_)
            | ConversionError::InvalidOptions(_)
            | ConversionError::MalformedDocument { .. }
            | ConversionError::Lint { .. } => Phase::Validating,
            ConversionError::MalformedNode { .. }
            | ConversionError::UnmappedType { .. }
            | ConversionError::LowAccuracy { .. }
            | ConversionError::AmbiguousExpression { .. }
            | ConversionError::DroppedFilter { .. } => Phase::ConvertingNodes,
            ConversionError::DanglingConnection { .. }
            | ConversionError::UnrepresentableConnection { .. } => Phase::ConvertingConnections,
        }
    }

    pub fn node_id(&self) -> Option<&str> {
        match self {
            ConversionError::MalformedNode { node_id, .. }
            | ConversionError::UnmappedType { node_id, .. }
            | ConversionError::LowAccuracy { node_id, .. }
            | ConversionError::AmbiguousExpression { node_id, .. }
            | ConversionError::DroppedFilter { node_id, .. } => Some(node_id),
            ConversionError::Lint { node_id, .. } => node_id.as_deref(),
            _ => None,
        }
    }

    pub fn lint(code: &'static str, message: impl Into<String>, node_id: Option<String>) -> Self {
        ConversionError::Lint {
            code,
            message: message.into(),
            node_id,
        }
    }
}

/// Failure to load a user or plugin mapping table.
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("Failed to parse mapping tables: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Mapping for '{source_type}' ({table}) has an empty target type")]
    EmptyTarget { table: &'static str, source_type: String },

    #[error("Mapping for '{source_type}' ({table}) has accuracy {accuracy}; expected 0-100")]
    AccuracyOutOfRange {
        table: &'static str,
        source_type: String,
        accuracy: u8,
    },
}

/// Failure to read a `ConversionOptions` document.
#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    #[error("Invalid conversion options: {0}")]
    Json(#[from] serde_json::Error),
}
