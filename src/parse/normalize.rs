//! Shape detection and the platform-neutral view of a source document.
//!
//! Every node gets a unique string key. Nodes that fail to deserialize are
//! kept, marked malformed, so that one bad node never hides the rest.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Number, Value};

use super::types::{MakeModule, N8nNode, NodeId, StubInfo};
use crate::platform::Platform;

#[derive(Debug, Clone, PartialEq)]
pub struct SourceNode {
    /// Unique within the workflow.
    pub key: String,
    pub id: Option<NodeId>,
    /// n8n node name or Make designer name.
    pub name: Option<String>,
    pub node_type: Option<String>,
    pub type_version: Option<Number>,
    pub position: [f64; 2],
    /// Single logical parameter set. For Make modules this is `mapper`
    /// overlaid with `parameters`.
    pub parameters: Map<String, Value>,
    /// Make `parameters` as written.
    pub raw_parameters: Map<String, Value>,
    /// Make `mapper` as written.
    pub raw_mapper: Option<Map<String, Value>>,
    pub notes: Option<String>,
    pub stub_info: Option<StubInfo>,
    /// Make route filter on the module, if any.
    pub filter: Option<Value>,
    pub raw: Value,
    /// Why the node could not be read, if it could not.
    pub malformed: Option<String>,
}

impl SourceNode {
    /// Best human-facing label: name, then id, then key.
    pub fn label(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.id.as_ref().map(NodeId::key))
            .unwrap_or_else(|| self.key.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEdge {
    pub from: String,
    pub from_output: u32,
    pub to: String,
    pub to_input: u32,
    /// n8n connection type (`main`, `ai_tool`, ...). Always `main` for Make.
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceWorkflow {
    pub platform: Platform,
    pub name: String,
    pub nodes: Vec<SourceNode>,
    /// Edges whose endpoints are both nodes of this workflow.
    pub edges: Vec<SourceEdge>,
    /// Edges naming a node that does not exist.
    pub unresolved: Vec<SourceEdge>,
    /// Make `metadata.scenario`, or the copy an earlier conversion left in
    /// n8n `meta.makeScenario`.
    pub scenario: Option<Value>,
    /// n8n `settings`. Empty for Make.
    pub settings: Map<String, Value>,
}

impl SourceWorkflow {
    pub fn node(&self, key: &str) -> Option<&SourceNode> {
        self.nodes.iter().find(|n| n.key == key)
    }
}

fn is_n8n_shaped(value: &Value) -> bool {
    value.get("nodes").is_some_and(Value::is_array)
}

fn is_make_shaped(value: &Value) -> bool {
    value.get("flow").is_some_and(Value::is_array)
}

/// Structural shape of `value`. A document matching both shapes is read as
/// `hint`.
pub fn detect_shape(value: &Value, hint: Platform) -> Option<Platform> {
    let matches = |p: Platform| match p {
        Platform::N8n => is_n8n_shaped(value),
        Platform::Make => is_make_shaped(value),
    };
    if matches(hint) {
        Some(hint)
    } else if matches(hint.other()) {
        Some(hint.other())
    } else {
        None
    }
}

/// Builds the neutral view of a document already known to have `platform`'s
/// shape.
pub fn normalize(value: &Value, platform: Platform) -> SourceWorkflow {
    let name = value
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let mut keys = KeyAllocator::default();
    match platform {
        Platform::N8n => normalize_n8n(value, name, &mut keys),
        Platform::Make => normalize_make(value, name, &mut keys),
    }
}

#[derive(Default)]
struct KeyAllocator {
    used: HashSet<String>,
}

impl KeyAllocator {
    fn allocate(&mut self, preferred: String) -> String {
        if self.used.insert(preferred.clone()) {
            return preferred;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}#{}", preferred, n);
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

// =============================================================================
// N8N
// =============================================================================

fn normalize_n8n(value: &Value, name: String, keys: &mut KeyAllocator) -> SourceWorkflow {
    let raw_nodes = value
        .get("nodes")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut nodes = Vec::with_capacity(raw_nodes.len());
    let mut by_name: HashMap<String, String> = HashMap::new();

    for (index, raw) in raw_nodes.into_iter().enumerate() {
        let node = match serde_json::from_value::<N8nNode>(raw.clone()) {
            Ok(parsed) => {
                let preferred = parsed
                    .id
                    .as_ref()
                    .map(NodeId::key)
                    .unwrap_or_else(|| parsed.name.clone());
                let key = keys.allocate(preferred);
                by_name.entry(parsed.name.clone()).or_insert_with(|| key.clone());
                SourceNode {
                    key,
                    id: parsed.id,
                    name: Some(parsed.name),
                    node_type: Some(parsed.node_type),
                    type_version: Some(parsed.type_version),
                    position: [parsed.position[0].0, parsed.position[1].0],
                    raw_parameters: parsed.parameters.clone(),
                    parameters: parsed.parameters,
                    raw_mapper: None,
                    notes: parsed.notes,
                    stub_info: parsed.stub_info,
                    filter: None,
                    raw,
                    malformed: None,
                }
            }
            Err(e) => malformed_node(raw, index, e.to_string(), keys, Platform::N8n),
        };
        nodes.push(node);
    }

    let mut edges = Vec::new();
    let mut unresolved = Vec::new();
    if let Some(connections) = value.get("connections").and_then(Value::as_object) {
        for (source_name, by_kind) in connections {
            let Some(by_kind) = by_kind.as_object() else {
                continue;
            };
            for (kind, outputs) in by_kind {
                let Some(outputs) = outputs.as_array() else {
                    continue;
                };
                for (output, targets) in outputs.iter().enumerate() {
                    let Some(targets) = targets.as_array() else {
                        continue;
                    };
                    for target in targets {
                        let Some(target_name) = target.get("node").and_then(Value::as_str) else {
                            continue;
                        };
                        let to_input = target
                            .get("index")
                            .and_then(Value::as_u64)
                            .unwrap_or(0) as u32;
                        let from = by_name.get(source_name);
                        let to = by_name.get(target_name);
                        let edge = SourceEdge {
                            from: from.cloned().unwrap_or_else(|| source_name.clone()),
                            from_output: output as u32,
                            to: to.cloned().unwrap_or_else(|| target_name.to_string()),
                            to_input,
                            kind: kind.clone(),
                        };
                        if from.is_some() && to.is_some() {
                            edges.push(edge);
                        } else {
                            unresolved.push(edge);
                        }
                    }
                }
            }
        }
    }

    SourceWorkflow {
        platform: Platform::N8n,
        name,
        nodes,
        edges,
        unresolved,
        scenario: value.pointer("/meta/makeScenario").filter(|v| v.is_object()).cloned(),
        settings: value
            .get("settings")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default(),
    }
}

// =============================================================================
// MAKE
// =============================================================================

fn normalize_make(value: &Value, name: String, keys: &mut KeyAllocator) -> SourceWorkflow {
    let mut walker = MakeWalker {
        keys,
        nodes: Vec::new(),
        edges: Vec::new(),
        next_index: 0,
    };
    if let Some(flow) = value.get("flow").and_then(Value::as_array) {
        walker.walk_flow(flow);
    }
    // Orphan chains are converted too.
    if let Some(orphans) = value
        .pointer("/metadata/designer/orphans")
        .and_then(Value::as_array)
    {
        for chain in orphans {
            match chain {
                Value::Array(flow) => {
                    walker.walk_flow(flow);
                }
                module @ Value::Object(_) => {
                    walker.walk_flow(std::slice::from_ref(module));
                }
                _ => {}
            }
        }
    }

    SourceWorkflow {
        platform: Platform::Make,
        name,
        nodes: walker.nodes,
        edges: walker.edges,
        unresolved: Vec::new(),
        scenario: value.pointer("/metadata/scenario").filter(|v| v.is_object()).cloned(),
        settings: Map::new(),
    }
}

struct MakeWalker<'a> {
    keys: &'a mut KeyAllocator,
    nodes: Vec<SourceNode>,
    edges: Vec<SourceEdge>,
    next_index: usize,
}

impl MakeWalker<'_> {
    /// Adds every module of `flow` and returns the key of its first module.
    fn walk_flow(&mut self, flow: &[Value]) -> Option<String> {
        let mut first = None;
        let mut previous: Option<(String, u32)> = None;
        for raw in flow {
            let (key, route_count) = self.add_module(raw);
            if let Some((prev, output)) = previous.take() {
                self.edges.push(edge(prev, output, key.clone()));
            }
            if first.is_none() {
                first = Some(key.clone());
            }
            previous = Some((key, route_count));
        }
        first
    }

    /// Returns the module key and how many routes it has.
    fn add_module(&mut self, raw: &Value) -> (String, u32) {
        let index = self.next_index;
        self.next_index += 1;

        let mut body = raw.clone();
        let routes = body
            .as_object_mut()
            .and_then(|m| m.remove("routes"))
            .and_then(|r| match r {
                Value::Array(routes) => Some(routes),
                _ => None,
            })
            .unwrap_or_default();

        let node = match serde_json::from_value::<MakeModule>(body) {
            Ok(module) => {
                let key = self.keys.allocate(module.id.key());
                let mut merged = module.mapper.clone();
                for (k, v) in &module.parameters {
                    merged.insert(k.clone(), v.clone());
                }
                SourceNode {
                    key,
                    id: Some(module.id),
                    name: module.metadata.designer.name.clone(),
                    node_type: Some(module.module),
                    type_version: Some(module.version),
                    position: [module.metadata.designer.x.0, module.metadata.designer.y.0],
                    parameters: merged,
                    raw_parameters: module.parameters,
                    raw_mapper: Some(module.mapper),
                    notes: None,
                    stub_info: module.stub_info,
                    filter: module.filter,
                    raw: raw.clone(),
                    malformed: None,
                }
            }
            Err(e) => malformed_node(raw.clone(), index, e.to_string(), self.keys, Platform::Make),
        };
        let key = node.key.clone();
        self.nodes.push(node);

        let route_count = routes.len() as u32;
        for (output, route) in routes.iter().enumerate() {
            let flow = route
                .get("flow")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            if let Some(first) = self.walk_flow(flow) {
                self.edges.push(edge(key.clone(), output as u32, first));
            }
        }
        (key, route_count)
    }
}

fn edge(from: String, from_output: u32, to: String) -> SourceEdge {
    SourceEdge {
        from,
        from_output,
        to,
        to_input: 0,
        kind: "main".into(),
    }
}

fn malformed_node(
    raw: Value,
    index: usize,
    reason: String,
    keys: &mut KeyAllocator,
    platform: Platform,
) -> SourceNode {
    let id = raw
        .get("id")
        .and_then(|v| serde_json::from_value::<NodeId>(v.clone()).ok());
    let name = match platform {
        Platform::N8n => raw.get("name"),
        Platform::Make => raw.pointer("/metadata/designer/name"),
    }
    .and_then(Value::as_str)
    .map(str::to_string);
    let type_field = match platform {
        Platform::N8n => "type",
        Platform::Make => "module",
    };
    let preferred = id
        .as_ref()
        .map(NodeId::key)
        .or_else(|| name.clone())
        .unwrap_or_else(|| format!("node-{}", index + 1));
    SourceNode {
        key: keys.allocate(preferred),
        id,
        name,
        node_type: raw.get(type_field).and_then(Value::as_str).map(str::to_string),
        type_version: None,
        position: [0.0, 0.0],
        parameters: Map::new(),
        raw_parameters: raw
            .get("parameters")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default(),
        raw_mapper: raw.get("mapper").and_then(Value::as_object).cloned(),
        notes: None,
        stub_info: None,
        filter: None,
        raw,
        malformed: Some(reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detects_shapes() {
        assert_eq!(
            detect_shape(&json!({ "nodes": [] }), Platform::Make),
            Some(Platform::N8n)
        );
        assert_eq!(
            detect_shape(&json!({ "flow": [] }), Platform::Make),
            Some(Platform::Make)
        );
        assert_eq!(
            detect_shape(&json!({ "nodes": [], "flow": [] }), Platform::Make),
            Some(Platform::Make)
        );
        assert_eq!(detect_shape(&json!({ "nodes": {} }), Platform::N8n), None);
    }

    #[test]
    fn n8n_connections_resolve_by_name() {
        let wf = normalize(
            &json!({
                "name": "wf",
                "nodes": [
                    { "id": "a1", "name": "Start", "type": "n8n-nodes-base.webhook" },
                    { "id": "b2", "name": "Fetch", "type": "n8n-nodes-base.httpRequest" }
                ],
                "connections": {
                    "Start": { "main": [[{ "node": "Fetch", "type": "main", "index": 0 }]] },
                    "Fetch": { "main": [[{ "node": "Ghost", "type": "main", "index": 0 }]] }
                }
            }),
            Platform::N8n,
        );
        assert_eq!(wf.name, "wf");
        assert_eq!(wf.edges.len(), 1);
        assert_eq!(wf.edges[0].from, "a1");
        assert_eq!(wf.edges[0].to, "b2");
        assert_eq!(wf.unresolved.len(), 1);
        assert_eq!(wf.unresolved[0].to, "Ghost");
    }

    #[test]
    fn make_parameters_win_over_mapper() {
        let wf = normalize(
            &json!({
                "flow": [{
                    "id": 1,
                    "module": "http:ActionSendData",
                    "parameters": { "url": "generic", "handleErrors": true },
                    "mapper": { "url": "specific", "method": "get" }
                }]
            }),
            Platform::Make,
        );
        let node = &wf.nodes[0];
        assert_eq!(node.parameters["url"], json!("generic"));
        assert_eq!(node.parameters["method"], json!("get"));
        assert_eq!(node.parameters["handleErrors"], json!(true));
        assert_eq!(node.raw_mapper.as_ref().unwrap()["url"], json!("specific"));
    }

    #[test]
    fn make_routes_become_indexed_edges() {
        let wf = normalize(
            &json!({
                "flow": [
                    { "id": 1, "module": "gateway:CustomWebHook" },
                    { "id": 2, "module": "builtin:BasicRouter", "routes": [
                        { "flow": [{ "id": 3, "module": "slack:CreateMessage" }] },
                        { "flow": [
                            { "id": 4, "module": "http:ActionSendData" },
                            { "id": 5, "module": "util:SetVariables" }
                        ] }
                    ] }
                ]
            }),
            Platform::Make,
        );
        let keys: Vec<&str> = wf.nodes.iter().map(|n| n.key.as_str()).collect();
        assert_eq!(keys, vec!["1", "2", "3", "4", "5"]);
        let edges: Vec<(&str, u32, &str)> = wf
            .edges
            .iter()
            .map(|e| (e.from.as_str(), e.from_output, e.to.as_str()))
            .collect();
        assert!(edges.contains(&("1", 0, "2")));
        assert!(edges.contains(&("2", 0, "3")));
        assert!(edges.contains(&("2", 1, "4")));
        assert!(edges.contains(&("4", 0, "5")));
        assert_eq!(edges.len(), 4);
    }

    #[test]
    fn orphan_chains_and_modules_are_walked() {
        let wf = normalize(
            &json!({
                "flow": [{ "id": 1, "module": "gateway:CustomWebHook" }],
                "metadata": { "designer": { "orphans": [
                    [
                        { "id": 7, "module": "http:ActionSendData" },
                        { "id": 8, "module": "util:SetVariables" }
                    ],
                    { "id": 9, "module": "slack:CreateMessage" },
                    "ignored"
                ] } }
            }),
            Platform::Make,
        );
        let keys: Vec<&str> = wf.nodes.iter().map(|n| n.key.as_str()).collect();
        assert_eq!(keys, vec!["1", "7", "8", "9"]);
        assert_eq!(wf.edges.len(), 1);
        assert_eq!((wf.edges[0].from.as_str(), wf.edges[0].to.as_str()), ("7", "8"));
        assert_eq!(wf.nodes[3].node_type.as_deref(), Some("slack:CreateMessage"));
    }

    #[test]
    fn workflow_settings_are_kept() {
        let make = normalize(
            &json!({ "flow": [], "metadata": { "scenario": { "roundtrips": 5, "sequential": true } } }),
            Platform::Make,
        );
        assert_eq!(make.scenario, Some(json!({ "roundtrips": 5, "sequential": true })));
        assert!(make.settings.is_empty());

        let n8n = normalize(
            &json!({
                "nodes": [],
                "settings": { "executionOrder": "v1", "timezone": "Europe/Berlin" },
                "meta": { "makeScenario": { "maxErrors": 7 } }
            }),
            Platform::N8n,
        );
        assert_eq!(n8n.settings["timezone"], json!("Europe/Berlin"));
        assert_eq!(n8n.scenario, Some(json!({ "maxErrors": 7 })));
    }

    #[test]
    fn malformed_nodes_are_kept() {
        let wf = normalize(
            &json!({
                "nodes": [
                    { "id": "x", "type": "n8n-nodes-base.set" },
                    { "name": "Ok", "type": "n8n-nodes-base.set" }
                ],
                "connections": {}
            }),
            Platform::N8n,
        );
        assert_eq!(wf.nodes.len(), 2);
        assert!(wf.nodes[0].malformed.is_some());
        assert_eq!(wf.nodes[0].key, "x");
        assert_eq!(wf.nodes[0].node_type.as_deref(), Some("n8n-nodes-base.set"));
        assert_eq!(wf.nodes[1].key, "Ok");
    }

    #[test]
    fn duplicate_ids_get_distinct_keys() {
        let wf = normalize(
            &json!({ "flow": [
                { "id": 1, "module": "a:B" },
                { "id": 1, "module": "a:C" }
            ] }),
            Platform::Make,
        );
        assert_eq!(wf.nodes[0].key, "1");
        assert_eq!(wf.nodes[1].key, "1#2");
        assert_eq!(wf.edges[0].to, "1#2");
    }
}
