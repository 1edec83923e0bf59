#![allow(dead_code)]

use flowbridge::convert::{ConversionOptions, ConversionResult, LogLevel, convert_workflow};
use flowbridge::mapping::MappingResolver;
use flowbridge::platform::Platform;
use serde_json::{Value, json};

// =============================================================================
// Document builders
// =============================================================================

/// n8n node with an id derived from its name.
pub fn n8n_node(name: &str, node_type: &str, parameters: Value) -> Value {
    json!({
        "id": format!("id-{}", name.to_lowercase().replace(' ', "-")),
        "name": name,
        "type": node_type,
        "typeVersion": 1,
        "position": [0, 0],
        "parameters": parameters
    })
}

/// n8n workflow whose nodes are wired one after another on `main`.
pub fn n8n_chain(name: &str, nodes: Vec<Value>) -> Value {
    let mut connections = serde_json::Map::new();
    for pair in nodes.windows(2) {
        let from = pair[0]["name"].as_str().unwrap_or_default().to_string();
        let to = pair[1]["name"].clone();
        connections.insert(
            from,
            json!({ "main": [[{ "node": to, "type": "main", "index": 0 }]] }),
        );
    }
    json!({ "name": name, "nodes": nodes, "connections": connections })
}

pub fn make_module(id: u64, module: &str, mapper: Value) -> Value {
    json!({
        "id": id,
        "module": module,
        "version": 1,
        "mapper": mapper,
        "metadata": { "designer": { "x": id * 300, "y": 0 } }
    })
}

pub fn make_blueprint(name: &str, flow: Vec<Value>) -> Value {
    json!({ "name": name, "flow": flow, "metadata": { "version": 1 } })
}

// =============================================================================
// Conversion shorthands
// =============================================================================

pub fn to_make(document: &Value) -> ConversionResult {
    to_make_with(document, &ConversionOptions::default())
}

pub fn to_make_with(document: &Value, options: &ConversionOptions) -> ConversionResult {
    convert_workflow(
        document,
        Platform::N8n,
        Platform::Make,
        options,
        MappingResolver::default_shared(),
    )
}

pub fn to_n8n(document: &Value) -> ConversionResult {
    to_n8n_with(document, &ConversionOptions::default())
}

pub fn to_n8n_with(document: &Value, options: &ConversionOptions) -> ConversionResult {
    convert_workflow(
        document,
        Platform::Make,
        Platform::N8n,
        options,
        MappingResolver::default_shared(),
    )
}

pub fn preserving_ids() -> ConversionOptions {
    ConversionOptions {
        preserve_ids: true,
        ..ConversionOptions::default()
    }
}

// =============================================================================
// Assertions
// =============================================================================

pub fn logs_at(result: &ConversionResult, level: LogLevel) -> Vec<&str> {
    result
        .logs
        .iter()
        .filter(|l| l.level == level)
        .map(|l| l.message.as_str())
        .collect()
}

pub fn codes(result: &ConversionResult) -> Vec<&str> {
    result.logs.iter().filter_map(|l| l.code.as_deref()).collect()
}

/// Target nodes of either document shape, main flow first.
pub fn target_nodes(document: &Value) -> Vec<&Value> {
    if let Some(nodes) = document["nodes"].as_array() {
        return nodes.iter().collect();
    }
    let mut out = Vec::new();
    fn walk<'a>(flow: &'a Value, out: &mut Vec<&'a Value>) {
        for module in flow.as_array().into_iter().flatten() {
            out.push(module);
            for route in module["routes"].as_array().into_iter().flatten() {
                walk(&route["flow"], out);
            }
        }
    }
    walk(&document["flow"], &mut out);
    for chain in document["metadata"]["designer"]["orphans"]
        .as_array()
        .into_iter()
        .flatten()
    {
        walk(chain, &mut out);
    }
    out
}
