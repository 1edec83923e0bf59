//! Values an expression can read during evaluation.

use serde_json::{Map, Value, json};

/// Namespaces visible to an expression: `$json`, `$env`, `$workflow`, `$node`,
/// plus Make module outputs keyed by their numeric id (`"1"`, `"2"`, ...).
///
/// Built per conversion call from the caller's `expressionContext` option.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpressionContext {
    values: Map<String, Value>,
}

impl ExpressionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a context object. Bare namespace keys (`json`, `env`, ...) are
    /// accepted as aliases of their `$` forms. Non-objects give an empty context.
    pub fn from_value(value: &Value) -> Self {
        let mut ctx = Self::new();
        let Some(map) = value.as_object() else {
            return ctx;
        };
        for (key, v) in map {
            let key = match key.as_str() {
                "json" | "env" | "workflow" | "node" | "now" | "execution" => format!("${}", key),
                _ => key.clone(),
            };
            ctx.values.insert(key, v.clone());
        }
        ctx
    }

    pub fn with_json(mut self, value: Value) -> Self {
        self.values.insert("$json".into(), value);
        self
    }

    pub fn with_env(mut self, value: Value) -> Self {
        self.values.insert("$env".into(), value);
        self
    }

    pub fn with_workflow(mut self, value: Value) -> Self {
        self.values.insert("$workflow".into(), value);
        self
    }

    /// Output of a Make module, read as `<id>.path`.
    pub fn with_module(mut self, id: u32, value: Value) -> Self {
        self.values.insert(id.to_string(), value);
        self
    }

    /// Output of a named n8n node, read as `$node["name"].json.path`.
    pub fn with_node(mut self, name: &str, value: Value) -> Self {
        let nodes = self
            .values
            .entry("$node")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Some(nodes) = nodes.as_object_mut() {
            nodes.insert(name.to_string(), json!({ "json": value }));
        }
        self
    }

    pub fn namespace(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Module output by id. Falls back to `$json` when no module output was
    /// supplied, so `1.x` and `$json.x` read the same item.
    pub fn module(&self, id: &str) -> Option<&Value> {
        self.values.get(id).or_else(|| self.values.get("$json"))
    }

    /// `$node["name"]` entry, shaped `{ "json": ... }`.
    pub fn node(&self, name: &str) -> Option<&Value> {
        self.values.get("$node").and_then(|nodes| nodes.get(name))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_keys_alias_namespaces() {
        let ctx = ExpressionContext::from_value(&json!({ "json": { "a": 1 }, "$env": { "B": "x" } }));
        assert_eq!(ctx.namespace("$json"), Some(&json!({ "a": 1 })));
        assert_eq!(ctx.namespace("$env"), Some(&json!({ "B": "x" })));
    }

    #[test]
    fn module_falls_back_to_current_item() {
        let ctx = ExpressionContext::new()
            .with_json(json!({ "id": 7 }))
            .with_module(2, json!({ "id": 9 }));
        assert_eq!(ctx.module("2"), Some(&json!({ "id": 9 })));
        assert_eq!(ctx.module("1"), Some(&json!({ "id": 7 })));
    }

    #[test]
    fn nodes_are_wrapped_in_json() {
        let ctx = ExpressionContext::new().with_node("HTTP Request", json!({ "body": "ok" }));
        assert_eq!(ctx.node("HTTP Request"), Some(&json!({ "json": { "body": "ok" } })));
        assert!(ExpressionContext::from_value(&json!(null)).is_empty());
    }
}
