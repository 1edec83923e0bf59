//! Evaluates a parsed expression against an [`ExpressionContext`].
//!
//! Evaluation never fails: anything it cannot resolve is `null`.

use serde_json::{Number, Value, json};

use super::ast::{BinaryOp, Expr};
use super::context::ExpressionContext;
use super::functions::{match_make_call, match_n8n_call};

pub fn evaluate(expr: &Expr, ctx: &ExpressionContext) -> Value {
    let evaluator = Evaluator {
        ctx,
        one_based: uses_module_paths(expr),
    };
    evaluator.eval(expr)
}

struct Evaluator<'a> {
    ctx: &'a ExpressionContext,
    /// Make indexes arrays from 1.
    one_based: bool,
}

impl Evaluator<'_> {
    fn eval(&self, expr: &Expr) -> Value {
        match expr {
            Expr::Number(raw) => raw
                .parse::<f64>()
                .ok()
                .and_then(number_value)
                .unwrap_or(Value::Null),
            Expr::Str { value, .. } => Value::String(value.clone()),
            Expr::Bool(b) => Value::Bool(*b),
            Expr::Null => Value::Null,
            Expr::Ident(name) => self.ident(name),
            Expr::Member {
                object, property, ..
            } => {
                let base = self.eval_object(object);
                property_of(&base, property)
            }
            Expr::Index { object, index } => {
                let base = self.eval_object(object);
                match self.eval(index) {
                    Value::String(key) => property_of(&base, &key),
                    Value::Number(n) => match (n.as_u64(), &base) {
                        (Some(i), Value::Array(items)) => {
                            let i = if self.one_based { i.checked_sub(1) } else { Some(i) };
                            i.and_then(|i| items.get(i as usize))
                                .cloned()
                                .unwrap_or(Value::Null)
                        }
                        _ => Value::Null,
                    },
                    _ => Value::Null,
                }
            }
            Expr::Call { callee, args } => self.call(callee, args),
            Expr::Neg(operand) => to_number(&self.eval(operand))
                .and_then(|n| number_value(-n))
                .unwrap_or(Value::Null),
            Expr::Binary { op, lhs, rhs } => {
                binary(*op, &self.eval(lhs), &self.eval(rhs))
            }
            Expr::Group(inner) => self.eval(inner),
        }
    }

    /// An integer literal in object position is a Make module reference.
    fn eval_object(&self, expr: &Expr) -> Value {
        match expr.as_integer() {
            Some(id) => self
                .ctx
                .module(&id.to_string())
                .cloned()
                .unwrap_or(Value::Null),
            None => self.eval(expr),
        }
    }

    fn ident(&self, name: &str) -> Value {
        if let Some(v) = self.ctx.namespace(name) {
            return v.clone();
        }
        match name {
            "$now" | "now" => Value::String(chrono::Utc::now().to_rfc3339()),
            _ => Value::Null,
        }
    }

    fn call(&self, callee: &Expr, args: &[Expr]) -> Value {
        // $('Node name') reads a named node's current item.
        if let Expr::Ident(name) = callee {
            if name == "$" {
                return match args {
                    [Expr::Str { value, .. }] => match self.ctx.node(value) {
                        Some(node) => json!({ "item": node }),
                        None => Value::Null,
                    },
                    _ => Value::Null,
                };
            }
        }
        if let Expr::Member {
            object, property, ..
        } = callee
        {
            if property == "first" && args.is_empty() {
                // $('Node name').first()
                if let Value::Object(map) = self.eval(object) {
                    if let Some(item) = map.get("item") {
                        return item.clone();
                    }
                }
            }
        }
        let matched = match_make_call(callee, args).or_else(|| match_n8n_call(callee, args));
        match matched {
            Some((func, operands)) => {
                let values: Vec<Value> = operands.into_iter().map(|e| self.eval(e)).collect();
                func.apply(&values)
            }
            None => Value::Null,
        }
    }
}

fn property_of(base: &Value, key: &str) -> Value {
    match base {
        Value::Object(map) => map.get(key).cloned().unwrap_or(Value::Null),
        Value::Array(items) if key == "length" => Value::from(items.len()),
        Value::String(s) if key == "length" => Value::from(s.chars().count()),
        _ => Value::Null,
    }
}

fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Value {
    if op == BinaryOp::Add && (is_textual(lhs) || is_textual(rhs)) {
        let mut out = to_display_string(lhs);
        out.push_str(&to_display_string(rhs));
        return Value::String(out);
    }
    let (Some(a), Some(b)) = (to_number(lhs), to_number(rhs)) else {
        return Value::Null;
    };
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div if b == 0.0 => return Value::Null,
        BinaryOp::Div => a / b,
    };
    number_value(result).unwrap_or(Value::Null)
}

fn is_textual(v: &Value) -> bool {
    matches!(v, Value::String(_) | Value::Array(_) | Value::Object(_))
}

fn to_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::Null => Some(0.0),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) if s.trim().is_empty() => Some(0.0),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Integral results become JSON integers; NaN and infinities have no value.
pub fn number_value(n: f64) -> Option<Value> {
    if !n.is_finite() {
        return None;
    }
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        return Some(Value::from(n as i64));
    }
    Number::from_f64(n).map(Value::Number)
}

/// String form used by concatenation and string functions. Numbers print
/// without a trailing `.0` and `null` prints as nothing.
pub fn to_display_string(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (_, Some(u), _) => u.to_string(),
            (_, _, Some(f)) if f.fract() == 0.0 && f.abs() < 9.0e15 => (f as i64).to_string(),
            _ => n.to_string(),
        },
        Value::Array(_) | Value::Object(_) => v.to_string(),
    }
}

/// True when the tree reads a Make module (`1.x`), which switches array
/// indexing to 1-based.
fn uses_module_paths(expr: &Expr) -> bool {
    match expr {
        Expr::Member { object, .. } | Expr::Index { object, .. }
            if object.as_integer().is_some() =>
        {
            true
        }
        Expr::Member { object, .. } => uses_module_paths(object),
        Expr::Index { object, index } => uses_module_paths(object) || uses_module_paths(index),
        Expr::Call { callee, args } => {
            uses_module_paths(callee) || args.iter().any(uses_module_paths)
        }
        Expr::Neg(inner) | Expr::Group(inner) => uses_module_paths(inner),
        Expr::Binary { lhs, rhs, .. } => uses_module_paths(lhs) || uses_module_paths(rhs),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::parser::parse;

    fn eval(src: &str, ctx: &ExpressionContext) -> Value {
        evaluate(&parse(src).unwrap(), ctx)
    }

    #[test]
    fn arithmetic_with_precedence() {
        let ctx = ExpressionContext::new();
        assert_eq!(eval("1 + 2 * 3", &ctx), json!(7));
        assert_eq!(eval("(1 + 2) * 3", &ctx), json!(9));
        assert_eq!(eval("7 / 2", &ctx), json!(3.5));
        assert_eq!(eval("-4 + 1", &ctx), json!(-3));
        assert_eq!(eval("1 / 0", &ctx), Value::Null);
    }

    #[test]
    fn concatenation_is_left_to_right() {
        let ctx = ExpressionContext::new().with_json(json!({ "id": 12345, "n": 2 }));
        assert_eq!(eval("'id-' + $json.id", &ctx), json!("id-12345"));
        assert_eq!(eval("$json.n + 1 + 'x'", &ctx), json!("3x"));
        assert_eq!(eval("'x' + $json.n + 1", &ctx), json!("x21"));
        assert_eq!(eval("'a' + $json.missing", &ctx), json!("a"));
    }

    #[test]
    fn namespaced_paths() {
        let ctx = ExpressionContext::from_value(&json!({
            "$json": { "user": { "first name": "Ada" }, "tags": ["a", "b"] },
            "$env": { "API": "k" },
            "$workflow": { "id": "wf1" }
        }));
        assert_eq!(eval("$json.user[\"first name\"]", &ctx), json!("Ada"));
        assert_eq!(eval("$env.API", &ctx), json!("k"));
        assert_eq!(eval("$workflow.id", &ctx), json!("wf1"));
        assert_eq!(eval("$json.tags[1]", &ctx), json!("b"));
        assert_eq!(eval("$json.user.missing.deeper", &ctx), Value::Null);
    }

    #[test]
    fn make_module_paths_are_one_based() {
        let ctx = ExpressionContext::new().with_module(1, json!({ "tags": ["a", "b"], "first name": "Ada" }));
        assert_eq!(eval("1.tags[1]", &ctx), json!("a"));
        assert_eq!(eval("1.`first name`", &ctx), json!("Ada"));
        assert_eq!(eval("upper(1.`first name`)", &ctx), json!("ADA"));
    }

    #[test]
    fn named_node_references() {
        let ctx = ExpressionContext::new().with_node("HTTP Request", json!({ "body": "ok" }));
        assert_eq!(eval("$node[\"HTTP Request\"].json.body", &ctx), json!("ok"));
        assert_eq!(eval("$('HTTP Request').item.json.body", &ctx), json!("ok"));
        assert_eq!(eval("$('HTTP Request').first().json.body", &ctx), json!("ok"));
    }

    #[test]
    fn unknown_functions_are_null() {
        let ctx = ExpressionContext::new().with_json(json!({ "a": "x" }));
        assert_eq!(eval("$json.a.padStart(3)", &ctx), Value::Null);
        assert_eq!(eval("$json.a.toUpperCase()", &ctx), json!("X"));
    }

    #[test]
    fn display_strings() {
        assert_eq!(to_display_string(&json!(2.0)), "2");
        assert_eq!(to_display_string(&json!(2.5)), "2.5");
        assert_eq!(to_display_string(&Value::Null), "");
        assert_eq!(number_value(f64::NAN), None);
    }
}
