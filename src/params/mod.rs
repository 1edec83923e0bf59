//! Parameter trees: cross-platform expression rewriting, review detection and
//! deep evaluation.
//!
//! All operations here are pure and total. Malformed input degrades to an
//! empty or unchanged tree.

pub mod path;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::expression::{
    self, ExpressionContext, RewriteContext, Translator, has_expression,
};
use crate::platform::Direction;

/// Key a scalar parameter root is wrapped under.
pub const VALUE_KEY: &str = "value";

/// One parameter that could not be handled with full confidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewNote {
    pub path: String,
    pub reason: String,
}

/// `null` becomes `{}` and any other non-object is wrapped as `{"value": x}`.
pub fn normalize_root(params: &Value) -> Map<String, Value> {
    match params {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert(VALUE_KEY.to_string(), other.clone());
            map
        }
    }
}

/// Rewrites every expression leaf into the target platform's syntax with the
/// default module reference.
pub fn convert_parameters_across_platforms(params: &Value, direction: Direction) -> Value {
    let translator = Translator::new(direction, RewriteContext::default());
    convert_parameters_with_review(params, &translator).0
}

/// Like [`convert_parameters_across_platforms`], with a caller-supplied
/// translator, also returning the leaves that were passed through untranslated.
pub fn convert_parameters_with_review(
    params: &Value,
    translator: &Translator,
) -> (Value, Vec<ReviewNote>) {
    let mut notes = Vec::new();
    let root = normalize_root(params);
    let converted = root
        .into_iter()
        .map(|(key, value)| {
            let converted = rewrite(&value, &key, translator, &mut notes);
            (key, converted)
        })
        .collect::<Map<String, Value>>();
    (Value::Object(converted), notes)
}

fn rewrite(value: &Value, path: &str, translator: &Translator, notes: &mut Vec<ReviewNote>) -> Value {
    match value {
        Value::String(s) => {
            let translation = translator.translate(s);
            if let Some(reason) = translation.review {
                notes.push(ReviewNote {
                    path: path.to_string(),
                    reason,
                });
            }
            Value::String(translation.output)
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), rewrite(v, &join(path, k), translator, notes)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, v)| rewrite(v, &join(path, &i.to_string()), translator, notes))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Dotted paths of every leaf that carries an expression, depth-first in
/// document key order.
pub fn identify_expressions_for_review(params: &Value) -> Vec<String> {
    let mut paths = Vec::new();
    for (key, value) in normalize_root(params) {
        collect_expression_paths(&value, &key, &mut paths);
    }
    paths
}

fn collect_expression_paths(value: &Value, path: &str, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                collect_expression_paths(v, &join(path, k), out);
            }
        }
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                collect_expression_paths(v, &join(path, &i.to_string()), out);
            }
        }
        leaf if has_expression(leaf) => out.push(path.to_string()),
        _ => {}
    }
}

/// Structure-preserving deep evaluation. A `null` root stays `null`.
pub fn evaluate_expressions(params: &Value, ctx: &ExpressionContext) -> Value {
    expression::process_object_with_expressions(params, ctx)
}

/// Deep evaluation that also reports every expression leaf that evaluated to
/// `null`, which is how an unsupported construct shows up in evaluation mode.
pub fn evaluate_parameters_with_review(
    params: &Value,
    ctx: &ExpressionContext,
) -> (Value, Vec<ReviewNote>) {
    let mut notes = Vec::new();
    let evaluated = evaluate_tracking(params, "", ctx, &mut notes);
    (evaluated, notes)
}

fn evaluate_tracking(
    value: &Value,
    path: &str,
    ctx: &ExpressionContext,
    notes: &mut Vec<ReviewNote>,
) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), evaluate_tracking(v, &join(path, k), ctx, notes)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, v)| evaluate_tracking(v, &join(path, &i.to_string()), ctx, notes))
                .collect(),
        ),
        leaf => {
            let evaluated = expression::process_value_with_possible_expression(leaf, ctx);
            if evaluated.is_null() && has_expression(leaf) {
                notes.push(ReviewNote {
                    path: path.to_string(),
                    reason: "expression evaluated to null".to_string(),
                });
            } else if has_expression(leaf) && !expression::is_expression(leaf) {
                notes.push(ReviewNote {
                    path: path.to_string(),
                    reason: "text template left unevaluated".to_string(),
                });
            }
            evaluated
        }
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_and_scalar_roots() {
        assert_eq!(
            convert_parameters_across_platforms(&Value::Null, Direction::N8nToMake),
            json!({})
        );
        assert_eq!(
            convert_parameters_across_platforms(&json!("x"), Direction::N8nToMake),
            json!({ "value": "x" })
        );
    }

    #[test]
    fn rewrites_nested_leaves_only() {
        let params = json!({
            "url": "={{ $json.url }}",
            "headers": { "Authorization": "=Bearer {{ $json.token }}" },
            "list": [1, "={{ $json.a }}"],
            "count": 3
        });
        assert_eq!(
            convert_parameters_across_platforms(&params, Direction::N8nToMake),
            json!({
                "url": "{{1.url}}",
                "headers": { "Authorization": "Bearer {{1.token}}" },
                "list": [1, "{{1.a}}"],
                "count": 3
            })
        );
    }

    #[test]
    fn untranslatable_leaves_are_noted() {
        let translator = Translator::new(Direction::N8nToMake, RewriteContext::default());
        let (out, notes) = convert_parameters_with_review(
            &json!({ "opts": { "key": "={{ $env.KEY }}" } }),
            &translator,
        );
        assert_eq!(out, json!({ "opts": { "key": "={{ $env.KEY }}" } }));
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].path, "opts.key");
    }

    #[test]
    fn review_paths_are_depth_first() {
        let params = json!({
            "b": "={{ $json.b }}",
            "headers": { "Authorization": "={{ $json.t }}", "Accept": "json" },
            "items": ["x", "{{1.y}}"],
            "a": "Hi {{ $json.a }}"
        });
        assert_eq!(
            identify_expressions_for_review(&params),
            vec!["b", "headers.Authorization", "items.1", "a"]
        );
        assert!(identify_expressions_for_review(&Value::Null).is_empty());
    }

    #[test]
    fn evaluation_flags_null_results() {
        let ctx = ExpressionContext::new().with_json(json!({ "a": 2 }));
        let (out, notes) = evaluate_parameters_with_review(
            &json!({ "x": "={{ $json.a * 2 }}", "y": "={{ $json.missing }}", "z": null }),
            &ctx,
        );
        assert_eq!(out, json!({ "x": 4, "y": null, "z": null }));
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].path, "y");
        assert_eq!(evaluate_expressions(&Value::Null, &ctx), Value::Null);
    }

    #[test]
    fn evaluation_leaves_text_templates_alone() {
        let ctx = ExpressionContext::from_value(&json!({ "1": { "id": 7 } }));
        let (out, notes) = evaluate_parameters_with_review(
            &json!({ "subject": "Order {{1.id}}", "id": "{{1.id}}" }),
            &ctx,
        );
        assert_eq!(out, json!({ "subject": "Order {{1.id}}", "id": 7 }));
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].path, "subject");
        assert_eq!(notes[0].reason, "text template left unevaluated");
    }
}
