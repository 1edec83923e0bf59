//! The expression micro-language shared by n8n (`={{ $json.a }}`) and Make
//! (`{{1.a}}`): recognition, extraction, evaluation and cross-platform rewrite.

pub mod ast;
pub mod context;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod template;
pub mod translate;

use serde_json::{Map, Value};

pub use context::ExpressionContext;
pub use parser::ParseError;
pub use template::{TemplatePart, contains_expression, split_template};
pub use translate::{
    RewriteContext, Translation, Translator, convert_make_to_n8n_expression,
    convert_n8n_to_make_expression, translate_expression,
};

/// True for a string that is exactly one `{{ ... }}` block, with or without
/// n8n's leading `=`, or an n8n `=`-prefixed template holding at least one
/// block. Never panics; non-strings are never expressions.
pub fn is_expression(value: &Value) -> bool {
    value.as_str().is_some_and(is_expression_str)
}

pub fn is_expression_str(s: &str) -> bool {
    template::is_single_block(s) || template::is_n8n_template(s)
}

/// Holds at least one `{{ ... }}` block, either as the whole string or
/// embedded in text.
pub fn has_expression(value: &Value) -> bool {
    value.as_str().is_some_and(contains_expression)
}

/// Trimmed body between the delimiters. Non-expressions come back unchanged.
pub fn extract_expression_content(value: &str) -> String {
    template::extract(value)
}

/// [`extract_expression_content`] over any JSON value: `null` and non-strings
/// give an empty string.
pub fn extract_expression_content_value(value: &Value) -> String {
    match value {
        Value::String(s) => extract_expression_content(s),
        _ => String::new(),
    }
}

/// Evaluates an expression string. An empty body or anything outside the
/// supported grammar is `null`. Templates evaluate to the joined text.
/// Strings without an expression come back as strings.
pub fn evaluate_expression(value: &str, ctx: &ExpressionContext) -> Value {
    if let Some(body) = template::expression_body(value) {
        let body = extract_expression_content(body);
        return evaluate_body(&body, ctx);
    }
    let text = value.trim_start();
    let text = text.strip_prefix('=').unwrap_or(text);
    let parts = split_template(text);
    if !parts.iter().any(|p| matches!(p, TemplatePart::Expr(_))) {
        return Value::String(value.to_string());
    }
    let mut out = String::new();
    for part in parts {
        match part {
            TemplatePart::Lit(lit) => out.push_str(&lit),
            TemplatePart::Expr(body) => {
                out.push_str(&eval::to_display_string(&evaluate_body(&body, ctx)))
            }
        }
    }
    Value::String(out)
}

fn evaluate_body(body: &str, ctx: &ExpressionContext) -> Value {
    match parser::parse(body) {
        Ok(expr) => eval::evaluate(&expr, ctx),
        Err(e) => {
            tracing::debug!(body, error = %e, "expression did not parse; evaluating to null");
            Value::Null
        }
    }
}

/// Evaluates `value` when [`is_expression`] holds, otherwise returns it
/// untouched. Make text templates such as `Order {{1.id}}` are not
/// expressions here and pass through.
pub fn process_value_with_possible_expression(value: &Value, ctx: &ExpressionContext) -> Value {
    match value {
        Value::String(s) if is_expression_str(s) => evaluate_expression(s, ctx),
        other => other.clone(),
    }
}

/// Deep, shape-preserving evaluation of every expression leaf.
pub fn process_object_with_expressions(value: &Value, ctx: &ExpressionContext) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), process_object_with_expressions(v, ctx)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| process_object_with_expressions(v, ctx))
                .collect(),
        ),
        other => process_value_with_possible_expression(other, ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recognizes_both_dialects() {
        assert!(is_expression(&json!("={{ $json.name }}")));
        assert!(is_expression(&json!("{{1.name}}")));
        assert!(!is_expression(&json!("Hello {{1.name}}")));
        assert!(is_expression(&json!("=Hello {{ $json.name }}!")));
        assert!(!is_expression(&json!(42)));
        assert!(!is_expression(&Value::Null));
        assert!(has_expression(&json!("Hello {{1.name}}")));
    }

    #[test]
    fn extraction() {
        assert_eq!(extract_expression_content("={{ $json.a }}"), "$json.a");
        assert_eq!(extract_expression_content("plain"), "plain");
        assert_eq!(extract_expression_content(""), "");
        assert_eq!(extract_expression_content_value(&Value::Null), "");
    }

    #[test]
    fn concatenation_does_not_become_nan() {
        let ctx = ExpressionContext::from_value(&json!({ "$json": { "id": "12345" } }));
        assert_eq!(
            evaluate_expression("={{ \"https://example.com/api/\" + $json.id }}", &ctx),
            json!("https://example.com/api/12345")
        );
    }

    #[test]
    fn empty_and_invalid_bodies_are_null() {
        let ctx = ExpressionContext::new();
        assert_eq!(evaluate_expression("{{}}", &ctx), Value::Null);
        assert_eq!(evaluate_expression("={{ 1 + }}", &ctx), Value::Null);
    }

    #[test]
    fn templates_evaluate_to_text() {
        let ctx = ExpressionContext::new().with_json(json!({ "name": "Ada", "n": 3 }));
        assert_eq!(
            evaluate_expression("=Hello {{ $json.name }}, {{ $json.n * 2 }}!", &ctx),
            json!("Hello Ada, 6!")
        );
        assert_eq!(evaluate_expression("  Hi {{ $json.name }}", &ctx), json!("Hi Ada"));
    }

    #[test]
    fn non_expressions_pass_through() {
        let ctx = ExpressionContext::new();
        for value in [json!("plain"), json!(null), json!(1.5), json!(true), json!("={ x }")] {
            assert_eq!(process_value_with_possible_expression(&value, &ctx), value);
        }
    }

    #[test]
    fn recognition_and_processing_agree() {
        let ctx = ExpressionContext::new().with_json(json!({ "name": "Bo", "x": "Ada" }));
        for text in [
            "Hello {{ $json.x }}",
            "Hello {{1.name}}",
            "{{ a }} and {{ b }}",
            "a {{ b",
            "{ not an expression }",
        ] {
            let value = json!(text);
            assert!(!is_expression(&value), "{:?}", text);
            assert_eq!(process_value_with_possible_expression(&value, &ctx), value);
        }
        assert_eq!(
            process_value_with_possible_expression(&json!("=Hello {{ $json.name }}!"), &ctx),
            json!("Hello Bo!")
        );
        assert_eq!(
            process_value_with_possible_expression(&json!("  =Hi {{ $json.x }}"), &ctx),
            json!("Hi Ada")
        );
    }

    #[test]
    fn deep_processing_preserves_shape() {
        let ctx = ExpressionContext::new().with_json(json!({ "a": 1 }));
        let tree = json!({ "x": ["={{ $json.a + 1 }}", "lit"], "y": { "z": null } });
        assert_eq!(
            process_object_with_expressions(&tree, &ctx),
            json!({ "x": [2, "lit"], "y": { "z": null } })
        );
        assert_eq!(process_object_with_expressions(&Value::Null, &ctx), Value::Null);
    }
}
