//! Converts exactly one node, end to end.
//!
//! Never fails: an unmapped, low-accuracy or unreadable node becomes a stub
//! and the reason is returned alongside it.

use serde_json::{Map, Number, Value};

use super::diagnostics::{LogLevel, ReviewEntry, default_level};
use super::options::ConversionOptions;
use super::stub::{self, designer};
use crate::error::ConversionError;
use crate::expression::{ExpressionContext, RewriteContext, Translator};
use crate::mapping::{MappingResolver, NodeMappingEntry, Resolution, switch_rules, widen_router};
use crate::params::path::{remove_path, set_path};
use crate::params::{ReviewNote, convert_parameters_with_review, evaluate_parameters_with_review};
use crate::parse::normalize::SourceNode;
use crate::parse::types::{Coord, MakeModule, N8nNode, NodeId};
use crate::platform::{Direction, Platform};

#[derive(Debug, Clone, PartialEq)]
pub enum TargetNode {
    N8n(N8nNode),
    Make(MakeModule),
}

impl TargetNode {
    pub fn node_type(&self) -> &str {
        match self {
            TargetNode::N8n(n) => &n.node_type,
            TargetNode::Make(m) => &m.module,
        }
    }

    pub fn is_stub(&self) -> bool {
        match self {
            TargetNode::N8n(n) => n.stub_info.is_some(),
            TargetNode::Make(m) => m.stub_info.is_some(),
        }
    }

    pub fn parameters(&self) -> &Map<String, Value> {
        match self {
            TargetNode::N8n(n) => &n.parameters,
            TargetNode::Make(m) => &m.mapper,
        }
    }
}

/// What the orchestrator decided about a node before converting it.
pub struct NodeContext<'a> {
    /// Make ids are numbers, n8n ids are strings.
    pub target_id: NodeId,
    /// n8n node name, or Make designer name.
    pub target_name: Option<String>,
    pub rewrite: RewriteContext,
    pub options: &'a ConversionOptions,
    pub evaluation: &'a ExpressionContext,
    /// Outputs the node's outgoing connections need.
    pub outputs: usize,
}

impl<'a> NodeContext<'a> {
    pub fn new(
        target_id: NodeId,
        target_name: Option<String>,
        options: &'a ConversionOptions,
        evaluation: &'a ExpressionContext,
    ) -> Self {
        Self {
            target_id,
            target_name,
            rewrite: RewriteContext::default().with_module_ref(options.default_module_ref),
            options,
            evaluation,
            outputs: 0,
        }
    }

    pub fn with_rewrite(mut self, rewrite: RewriteContext) -> Self {
        self.rewrite = rewrite;
        self
    }

    pub fn with_outputs(mut self, outputs: usize) -> Self {
        self.outputs = outputs;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeConversion {
    pub node: TargetNode,
    pub stub: bool,
    /// A stub converted back to its original platform.
    pub restored: bool,
    /// Source type to list under `unmappedNodes`.
    pub unmapped_type: Option<String>,
    pub review: Vec<ReviewEntry>,
    pub issues: Vec<(LogLevel, ConversionError)>,
}

impl NodeConversion {
    fn new(node: TargetNode) -> Self {
        Self {
            node,
            stub: false,
            restored: false,
            unmapped_type: None,
            review: Vec::new(),
            issues: Vec::new(),
        }
    }
}

pub struct NodeMapper<'a> {
    resolver: &'a MappingResolver,
    threshold: u8,
}

impl<'a> NodeMapper<'a> {
    pub fn new(resolver: &'a MappingResolver, threshold: u8) -> Self {
        Self { resolver, threshold }
    }

    pub fn convert(&self, node: &SourceNode, direction: Direction, ctx: &NodeContext<'_>) -> NodeConversion {
        let mut conversion = self.convert_node(node, direction, ctx);
        if let Some(filter) = &node.filter {
            let name = filter
                .get("name")
                .and_then(Value::as_str)
                .filter(|n| !n.trim().is_empty())
                .unwrap_or("unnamed")
                .to_string();
            let err = ConversionError::DroppedFilter {
                node_id: node.label(),
                filter: name.clone(),
                target: direction.target(),
            };
            conversion.issues.push((default_level(&err), err));
            conversion.review.push(ReviewEntry {
                node_id: ctx.target_id.key(),
                node_name: ctx.target_name.clone(),
                parameter_path: "filter".to_string(),
                reason: format!("route filter '{}' was dropped; re-create its conditions", name),
            });
        }
        conversion
    }

    fn convert_node(&self, node: &SourceNode, direction: Direction, ctx: &NodeContext<'_>) -> NodeConversion {
        let target = direction.target();
        let label = node.label();

        if let Some(reason) = &node.malformed {
            let err = ConversionError::MalformedNode {
                node_id: label,
                reason: reason.clone(),
            };
            let note = format!("Original node could not be read: {}", reason);
            return self.stub(node, direction, ctx, note, err, None);
        }

        if let Some(info) = stub::restorable(node, target) {
            let mut conversion = NodeConversion::new(stub::restore(node, info, ctx));
            conversion.restored = true;
            return conversion;
        }

        let node_type = node.node_type.clone().unwrap_or_default();
        match self.resolver.resolve_with_accuracy(&node_type, direction, self.threshold) {
            Resolution::Found(entry) => match widen_router(entry, ctx.outputs) {
                Some(switch) => {
                    let mut conversion = self.mapped(node, &switch, direction, ctx);
                    if let TargetNode::N8n(n8n) = &mut conversion.node {
                        n8n.parameters.extend(switch_rules(ctx.outputs));
                    }
                    conversion
                }
                None => self.mapped(node, entry, direction, ctx),
            },
            Resolution::BelowThreshold(entry) => {
                let err = ConversionError::LowAccuracy {
                    node_id: label,
                    node_type: node_type.clone(),
                    accuracy: entry.accuracy,
                    threshold: self.threshold,
                };
                let note = format!(
                    "Mapping to '{}' ({}% accurate) is below the {}% threshold; configure this step manually.",
                    entry.target_type, entry.accuracy, self.threshold
                );
                self.stub(node, direction, ctx, note, err, Some(node_type))
            }
            Resolution::NotFound => {
                let err = ConversionError::UnmappedType {
                    node_id: label,
                    node_type: node_type.clone(),
                };
                let note = format!(
                    "No {} equivalent for '{}'; the original node is kept in stubInfo.",
                    target, node_type
                );
                self.stub(node, direction, ctx, note, err, Some(node_type))
            }
        }
    }

    fn stub(
        &self,
        node: &SourceNode,
        direction: Direction,
        ctx: &NodeContext<'_>,
        note: String,
        err: ConversionError,
        unmapped_type: Option<String>,
    ) -> NodeConversion {
        let info = stub::stub_info(node, direction.source(), note);
        let mut conversion = NodeConversion::new(stub::build_stub(node, direction.target(), ctx, info));
        conversion.stub = true;
        conversion.unmapped_type = unmapped_type;
        conversion.issues.push((default_level(&err), err));
        conversion
    }

    fn mapped(
        &self,
        node: &SourceNode,
        entry: &NodeMappingEntry,
        direction: Direction,
        ctx: &NodeContext<'_>,
    ) -> NodeConversion {
        let renamed = Value::Object(map_parameters(&node.parameters, entry));
        let (processed, notes) = if ctx.options.evaluate_expressions {
            evaluate_parameters_with_review(&renamed, ctx.evaluation)
        } else {
            let translator = Translator::new(direction, ctx.rewrite.clone());
            convert_parameters_with_review(&renamed, &translator)
        };
        let parameters = match processed {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        let version = Number::from(entry.target_version.unwrap_or(1));
        let target_node = match direction.target() {
            Platform::Make => TargetNode::Make(MakeModule {
                id: ctx.target_id.clone(),
                module: entry.target_type.clone(),
                version,
                parameters: Map::new(),
                mapper: parameters,
                metadata: designer(node.position, ctx.target_name.clone()),
                routes: Vec::new(),
                filter: None,
                stub_info: None,
            }),
            Platform::N8n => TargetNode::N8n(N8nNode {
                id: Some(ctx.target_id.clone()),
                name: ctx.target_name.clone().unwrap_or_default(),
                node_type: entry.target_type.clone(),
                type_version: version,
                position: [Coord(node.position[0]), Coord(node.position[1])],
                parameters,
                notes: node.notes.clone(),
                stub_info: None,
            }),
        };

        let mut conversion = NodeConversion::new(target_node);
        let level = if ctx.options.strict_mode {
            LogLevel::Error
        } else {
            LogLevel::Warning
        };
        for ReviewNote { path, reason } in notes {
            conversion.issues.push((
                level,
                ConversionError::AmbiguousExpression {
                    node_id: node.label(),
                    path: path.clone(),
                    reason: reason.clone(),
                },
            ));
            conversion.review.push(ReviewEntry {
                node_id: ctx.target_id.key(),
                node_name: ctx.target_name.clone(),
                parameter_path: path,
                reason,
            });
        }
        conversion
    }
}

/// Renames parameters through the entry's ordered map, then applies the
/// per-parameter transforms. Mapped parameters come first in map order;
/// everything else follows under its own name.
pub fn map_parameters(params: &Map<String, Value>, entry: &NodeMappingEntry) -> Map<String, Value> {
    let mut remaining = params.clone();
    let mut mapped = Map::new();

    for (source, target) in &entry.parameter_map {
        let value = match remove_path(&mut remaining, source) {
            Some(value) => value,
            None => match entry.defaults.get(source) {
                Some(default) => default.clone(),
                None => continue,
            },
        };
        let value = match entry.transforms.get(source) {
            Some(transform) => transform.apply(value),
            None => value,
        };
        set_path(&mut mapped, target, value);
    }

    // Transforms on parameters that keep their name.
    for (source, transform) in &entry.transforms {
        if entry.parameter_map.contains_key(source) {
            continue;
        }
        if let Some(value) = remove_path(&mut remaining, source) {
            set_path(&mut remaining, source, transform.apply(value));
        }
    }

    for (key, value) in remaining {
        if !mapped.contains_key(&key) {
            mapped.insert(key, value);
        }
    }
    mapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::ValueTransform;
    use crate::parse::normalize::normalize;
    use serde_json::json;

    fn source_node(doc: Value, platform: Platform) -> SourceNode {
        normalize(&doc, platform).nodes.remove(0)
    }

    fn n8n_node(node_type: &str, parameters: Value) -> SourceNode {
        source_node(
            json!({ "nodes": [{ "id": "a1", "name": "Step", "type": node_type, "parameters": parameters }] }),
            Platform::N8n,
        )
    }

    fn run(node: &SourceNode, direction: Direction, options: &ConversionOptions) -> NodeConversion {
        let evaluation = options.evaluation_context();
        let target_id = match direction.target() {
            Platform::Make => NodeId::Number(1),
            Platform::N8n => NodeId::Text("n-1".into()),
        };
        let ctx = NodeContext::new(target_id, Some("Step".into()), options, &evaluation);
        NodeMapper::new(MappingResolver::default_shared(), options.accuracy_threshold())
            .convert(node, direction, &ctx)
    }

    #[test]
    fn renames_in_map_order_and_passes_the_rest_through() {
        let entry = NodeMappingEntry::new("a", "b")
            .param("body", "data")
            .param("options.flag", "flag")
            .transform("options.flag", ValueTransform::BooleanToString)
            .default_value("method", json!("GET"))
            .param("method", "method");
        let params = json!({
            "extra": 1,
            "body": { "x": 1 },
            "options": { "flag": true }
        });
        let mapped = map_parameters(params.as_object().unwrap(), &entry);
        assert_eq!(
            Value::Object(mapped),
            json!({ "data": { "x": 1 }, "flag": "1", "method": "GET", "extra": 1 })
        );
    }

    #[test]
    fn http_request_to_make() {
        let node = n8n_node(
            "n8n-nodes-base.httpRequest",
            json!({
                "url": "https://api.example.com/data",
                "method": "POST",
                "headers": { "Content-Type": "application/json" },
                "body": { "data": "example" }
            }),
        );
        let result = run(&node, Direction::N8nToMake, &ConversionOptions::default());
        assert!(!result.stub);
        assert_eq!(result.node.node_type(), "http:ActionSendData");
        let params = result.node.parameters();
        assert_eq!(params["url"], json!("https://api.example.com/data"));
        assert_eq!(params["method"], json!("POST"));
        assert_eq!(params["headers"], json!({ "Content-Type": "application/json" }));
        assert_eq!(params["data"], json!({ "data": "example" }));
        assert!(result.issues.is_empty());
    }

    #[test]
    fn unmapped_type_becomes_stub() {
        let node = n8n_node("n8n-nodes-base.someCustomThing", json!({ "a": 1 }));
        let result = run(&node, Direction::N8nToMake, &ConversionOptions::default());
        assert!(result.stub);
        assert_eq!(result.unmapped_type.as_deref(), Some("n8n-nodes-base.someCustomThing"));
        let TargetNode::Make(module) = &result.node else {
            panic!("expected a Make module");
        };
        assert_eq!(module.module, stub::MAKE_PLACEHOLDER);
        let info = module.stub_info.as_ref().unwrap();
        assert_eq!(info.original_type, "n8n-nodes-base.someCustomThing");
        assert_eq!(info.original_id, NodeId::Text("a1".into()));
        assert_eq!(info.original_parameters["a"], json!(1));
        assert_eq!(result.issues[0].1.code(), "N002");
    }

    #[test]
    fn low_accuracy_mapping_becomes_stub() {
        let node = n8n_node("n8n-nodes-base.switch", json!({}));
        let options = ConversionOptions {
            mapping_accuracy: 90.0,
            ..ConversionOptions::default()
        };
        let result = run(&node, Direction::N8nToMake, &options);
        assert!(result.stub);
        assert_eq!(result.issues[0].1.code(), "N003");
    }

    #[test]
    fn stub_restores_on_its_original_platform() {
        let node = n8n_node("n8n-nodes-base.someCustomThing", json!({ "a": "={{ $json.x }}" }));
        let stubbed = run(&node, Direction::N8nToMake, &ConversionOptions::default());
        let doc = json!({ "flow": [serde_json::to_value(match stubbed.node {
            TargetNode::Make(m) => m,
            TargetNode::N8n(_) => unreachable!(),
        }).unwrap()] });
        let back = source_node(doc, Platform::Make);
        let restored = run(&back, Direction::MakeToN8n, &ConversionOptions::default());
        assert!(restored.restored);
        assert!(!restored.stub);
        let TargetNode::N8n(n8n) = &restored.node else {
            panic!("expected an n8n node");
        };
        assert_eq!(n8n.node_type, "n8n-nodes-base.someCustomThing");
        assert_eq!(n8n.parameters["a"], json!("={{ $json.x }}"));
        assert!(n8n.stub_info.is_none());
    }

    #[test]
    fn malformed_node_becomes_stub_with_error() {
        let node = source_node(
            json!({ "nodes": [{ "id": "x", "type": "n8n-nodes-base.set" }] }),
            Platform::N8n,
        );
        let result = run(&node, Direction::N8nToMake, &ConversionOptions::default());
        assert!(result.stub);
        assert!(result.unmapped_type.is_none());
        assert_eq!(result.issues[0].0, LogLevel::Error);
        let TargetNode::Make(module) = &result.node else {
            panic!("expected a Make module");
        };
        assert!(module.stub_info.as_ref().unwrap().original_node.is_some());
    }

    #[test]
    fn expressions_are_rewritten_and_flagged() {
        let node = n8n_node(
            "n8n-nodes-base.set",
            json!({ "a": "={{ $json.name }}", "b": "={{ $env.TOKEN }}" }),
        );
        let result = run(&node, Direction::N8nToMake, &ConversionOptions::default());
        let params = result.node.parameters();
        assert_eq!(params["a"], json!("{{1.name}}"));
        assert_eq!(params["b"], json!("={{ $env.TOKEN }}"));
        assert_eq!(result.review.len(), 1);
        assert_eq!(result.review[0].parameter_path, "b");
        assert_eq!(result.issues[0].0, LogLevel::Warning);

        let strict = ConversionOptions {
            strict_mode: true,
            ..ConversionOptions::default()
        };
        let result = run(&node, Direction::N8nToMake, &strict);
        assert_eq!(result.issues[0].0, LogLevel::Error);
    }

    #[test]
    fn evaluation_mode_resolves_against_context() {
        let node = n8n_node("n8n-nodes-base.set", json!({ "greeting": "=Hi {{ $json.name }}" }));
        let options = ConversionOptions {
            evaluate_expressions: true,
            expression_context: Some(json!({ "$json": { "name": "Ada" } })),
            ..ConversionOptions::default()
        };
        let result = run(&node, Direction::N8nToMake, &options);
        assert_eq!(result.node.parameters()["greeting"], json!("Hi Ada"));
    }

    #[test]
    fn filtered_module_keeps_converting_and_asks_for_review() {
        let node = source_node(
            json!({ "flow": [{
                "id": 3,
                "module": "util:FunctionSleep",
                "mapper": { "duration": 2 },
                "filter": { "name": "Only VIPs", "conditions": [] }
            }] }),
            Platform::Make,
        );
        let result = run(&node, Direction::MakeToN8n, &ConversionOptions::default());
        assert!(!result.stub);
        assert_eq!(result.node.node_type(), "n8n-nodes-base.wait");
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].1.code(), "X002");
        assert_eq!(result.review[0].parameter_path, "filter");
        assert!(result.review[0].reason.contains("Only VIPs"));
    }

    #[test]
    fn router_outputs_pick_if_or_switch() {
        let node = source_node(
            json!({ "flow": [{ "id": 2, "module": "builtin:BasicRouter" }] }),
            Platform::Make,
        );
        let options = ConversionOptions::default();
        let evaluation = options.evaluation_context();
        let mapper = NodeMapper::new(MappingResolver::default_shared(), options.accuracy_threshold());

        let narrow = NodeContext::new(NodeId::Text("n-2".into()), None, &options, &evaluation).with_outputs(2);
        let result = mapper.convert(&node, Direction::MakeToN8n, &narrow);
        assert_eq!(result.node.node_type(), "n8n-nodes-base.if");

        let wide = NodeContext::new(NodeId::Text("n-2".into()), None, &options, &evaluation).with_outputs(4);
        let result = mapper.convert(&node, Direction::MakeToN8n, &wide);
        assert_eq!(result.node.node_type(), "n8n-nodes-base.switch");
        assert_eq!(result.node.parameters()["rules"]["values"].as_array().map(Vec::len), Some(4));
    }
}
