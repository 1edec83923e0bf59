//! Per-call conversion options.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::OptionsError;
use crate::expression::ExpressionContext;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConversionOptions {
    /// Keep original node ids where the target schema allows.
    pub preserve_ids: bool,
    /// Log untranslatable expressions as errors instead of warnings.
    pub strict_mode: bool,
    /// Mappings below this accuracy (0-100) are treated as missing.
    pub mapping_accuracy: f64,
    /// Evaluate expressions against `expression_context` instead of
    /// rewriting them.
    pub evaluate_expressions: bool,
    pub expression_context: Option<Value>,
    /// Module `$json` refers to for nodes without an upstream node.
    pub default_module_ref: u32,
    /// Attach UTC timestamps to log entries.
    pub timestamps: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            preserve_ids: false,
            strict_mode: false,
            mapping_accuracy: 0.0,
            evaluate_expressions: false,
            expression_context: None,
            default_module_ref: 1,
            timestamps: false,
        }
    }
}

impl ConversionOptions {
    pub fn from_json(json: &str) -> Result<Self, OptionsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// `mapping_accuracy` clamped to 0-100. Fractions round up so that a
    /// threshold of 60.5 rejects an accuracy of 60.
    pub fn accuracy_threshold(&self) -> u8 {
        if self.mapping_accuracy.is_nan() {
            return 0;
        }
        self.mapping_accuracy.clamp(0.0, 100.0).ceil() as u8
    }

    pub fn evaluation_context(&self) -> ExpressionContext {
        self.expression_context
            .as_ref()
            .map(ExpressionContext::from_value)
            .unwrap_or_default()
    }
}
