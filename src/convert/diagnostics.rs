//! Log sequence, unmapped types and review entries for one conversion call.
//!
//! Every entry is mirrored to `tracing`; the accumulated sequence is what
//! callers get back and stays the source of truth.

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::error::{ConversionError, Phase};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEntry {
    pub node_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    pub parameter_path: String,
    pub reason: String,
}

/// Default severity of an error kind.
pub fn default_level(err: &ConversionError) -> LogLevel {
    match err {
        ConversionError::InvalidInput { .. }
        | ConversionError::UnrecognizedShape { .. }
        | ConversionError::MalformedDocument { .. }
        | ConversionError::UnknownPlatform(_)
        | ConversionError::MalformedNode { .. } => LogLevel::Error,
        _ => LogLevel::Warning,
    }
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    logs: Vec<LogEntry>,
    unmapped: IndexSet<String>,
    review: Vec<ReviewEntry>,
    timestamps: bool,
}

impl Diagnostics {
    pub fn new(timestamps: bool) -> Self {
        Self {
            timestamps,
            ..Self::default()
        }
    }

    fn push(
        &mut self,
        level: LogLevel,
        message: String,
        code: Option<&str>,
        node_id: Option<&str>,
        phase: Option<Phase>,
    ) {
        let phase = phase.map(|p| p.to_string());
        let phase = phase.as_deref();
        match level {
            LogLevel::Info => tracing::info!(code, node_id, phase, "{}", message),
            LogLevel::Warning => tracing::warn!(code, node_id, phase, "{}", message),
            LogLevel::Error => tracing::error!(code, node_id, phase, "{}", message),
        }
        self.logs.push(LogEntry {
            level,
            message,
            code: code.map(str::to_string),
            node_id: node_id.map(str::to_string),
            timestamp: self.timestamps.then(Utc::now),
        });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Info, message.into(), None, None, None);
    }

    /// Logs an error kind at its default severity.
    pub fn report(&mut self, err: &ConversionError) {
        self.report_at(default_level(err), err);
    }

    pub fn report_at(&mut self, level: LogLevel, err: &ConversionError) {
        self.push(
            level,
            err.to_string(),
            Some(err.code()),
            err.node_id(),
            Some(err.phase()),
        );
    }

    /// Keeps the first occurrence of each type.
    pub fn unmapped(&mut self, node_type: impl Into<String>) {
        self.unmapped.insert(node_type.into());
    }

    pub fn review(&mut self, entry: ReviewEntry) {
        tracing::debug!(
            node_id = entry.node_id.as_str(),
            path = entry.parameter_path.as_str(),
            "parameter needs review: {}",
            entry.reason
        );
        self.review.push(entry);
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    pub fn into_parts(self) -> (Vec<LogEntry>, Vec<String>, Vec<ReviewEntry>) {
        (self.logs, self.unmapped.into_iter().collect(), self.review)
    }
}
