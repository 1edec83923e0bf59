//! WASM entry points for browser use.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::convert::{self, ConversionResult};
use crate::expression::{self, RewriteContext};
use crate::mapping::{MappingResolver, MappingTables};
use crate::platform::Direction;

fn to_js<T: Serialize>(value: &T) -> JsValue {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .unwrap_or(JsValue::NULL)
}

/// Full conversion. `options_json` may be empty.
/// Returns `{ convertedWorkflow, logs, unmappedNodes, parametersNeedingReview, debug }`.
#[wasm_bindgen]
pub fn convert_workflow(json: &str, source: &str, target: &str, options_json: &str) -> JsValue {
    to_js(&convert_workflow_inner(json, source, target, options_json))
}

fn convert_workflow_inner(json: &str, source: &str, target: &str, options_json: &str) -> ConversionResult {
    let options = Some(options_json).filter(|o| !o.trim().is_empty());
    convert::convert_json(json, source, target, options)
}

/// Rewrites one parameter string. `direction` is `n8nToMake` or `makeToN8n`;
/// `module_ref` is the module `$json` refers to.
#[wasm_bindgen]
pub fn translate_expression(input: &str, direction: &str, module_ref: u32) -> JsValue {
    to_js(&translate_expression_inner(input, direction, module_ref))
}

fn translate_expression_inner(input: &str, direction: &str, module_ref: u32) -> TranslationDto {
    let direction = match direction {
        "n8nToMake" => Direction::N8nToMake,
        "makeToN8n" => Direction::MakeToN8n,
        other => {
            return TranslationDto {
                output: input.to_string(),
                review: Some(format!("Unknown direction '{}'", other)),
            };
        }
    };
    let ctx = RewriteContext::default().with_module_ref(module_ref.max(1));
    let translation = expression::translate_expression(input, direction, &ctx);
    TranslationDto {
        output: translation.output,
        review: translation.review,
    }
}

#[wasm_bindgen]
pub fn is_expression(value: &str) -> bool {
    expression::is_expression_str(value)
}

/// The built-in mapping tables as `{ n8nToMake, makeToN8n }`.
#[wasm_bindgen]
pub fn default_mappings() -> JsValue {
    to_js(&default_mappings_inner())
}

fn default_mappings_inner() -> MappingTables {
    MappingResolver::default_shared().tables().clone()
}

// ---------------------------------------------------------------------------
// DTOs for serialization to JS
// ---------------------------------------------------------------------------

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct TranslationDto {
    output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    review: Option<String>,
}
