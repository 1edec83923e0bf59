//! Conversion orchestrator.
//!
//! `Validating → ConvertingNodes → ConvertingConnections → Assembling → Done`,
//! with `Errored` reachable from validation. Nothing here fails: every problem
//! becomes a log entry and the caller always gets a well-formed result.

pub mod connections;
pub mod diagnostics;
pub mod document;
pub mod ids;
pub mod node_mapper;
pub mod options;
pub mod stub;

pub use diagnostics::{Diagnostics, LogEntry, LogLevel, ReviewEntry};
pub use node_mapper::{NodeContext, NodeConversion, NodeMapper, TargetNode};
pub use options::ConversionOptions;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConversionError;
use crate::expression::{ExpressionContext, RewriteContext};
use crate::mapping::MappingResolver;
use crate::parse::graph::WorkflowGraph;
use crate::parse::normalize::{SourceWorkflow, detect_shape, normalize};
use crate::parse::types::{NodeId, ScenarioSettings};
use crate::platform::{Direction, Platform};
use crate::validate::lint_workflow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConversionState {
    Validating,
    ConvertingNodes,
    ConvertingConnections,
    Assembling,
    Done,
    Errored,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionDebug {
    pub source_platform: Option<Platform>,
    pub target_platform: Option<Platform>,
    pub source_node_count: usize,
    pub mapped_nodes: usize,
    /// Nodes stubbed because their type had no usable mapping.
    pub unmapped_nodes: usize,
    pub stub_nodes: usize,
    pub restored_stubs: usize,
    pub converted_connections: usize,
    pub dropped_connections: usize,
    pub final_state: ConversionState,
}

impl ConversionDebug {
    fn new(source: Option<Platform>, target: Option<Platform>) -> Self {
        Self {
            source_platform: source,
            target_platform: target,
            source_node_count: 0,
            mapped_nodes: 0,
            unmapped_nodes: 0,
            stub_nodes: 0,
            restored_stubs: 0,
            converted_connections: 0,
            dropped_connections: 0,
            final_state: ConversionState::Validating,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub converted_workflow: Value,
    pub logs: Vec<LogEntry>,
    pub unmapped_nodes: Vec<String>,
    pub parameters_needing_review: Vec<ReviewEntry>,
    pub debug: ConversionDebug,
}

/// Per-call accumulator. Nothing in it outlives the call.
struct Conversion<'a> {
    options: &'a ConversionOptions,
    resolver: &'a MappingResolver,
    diagnostics: Diagnostics,
    debug: ConversionDebug,
    state: ConversionState,
}

impl<'a> Conversion<'a> {
    fn new(
        options: &'a ConversionOptions,
        resolver: &'a MappingResolver,
        source: Option<Platform>,
        target: Option<Platform>,
    ) -> Self {
        Self {
            options,
            resolver,
            diagnostics: Diagnostics::new(options.timestamps),
            debug: ConversionDebug::new(source, target),
            state: ConversionState::Validating,
        }
    }

    fn enter(&mut self, state: ConversionState) {
        tracing::debug!(from = ?self.state, to = ?state, "conversion state");
        self.state = state;
    }

    fn finish(mut self, converted_workflow: Value) -> ConversionResult {
        self.debug.final_state = self.state;
        let (logs, unmapped_nodes, parameters_needing_review) = self.diagnostics.into_parts();
        ConversionResult {
            converted_workflow,
            logs,
            unmapped_nodes,
            parameters_needing_review,
            debug: self.debug,
        }
    }

    fn fail(mut self, err: &ConversionError, converted_workflow: Value) -> ConversionResult {
        self.diagnostics.report(err);
        self.enter(ConversionState::Errored);
        self.finish(converted_workflow)
    }

    fn run(mut self, document: &Value, source: Platform, target: Platform) -> ConversionResult {
        if document.as_object().is_none_or(|map| map.is_empty()) {
            return self.fail(&ConversionError::InvalidInput { target }, document::empty_document(target));
        }
        if source == target {
            return self.fail(
                &ConversionError::UnsupportedDirection { platform: source },
                document.clone(),
            );
        }
        let Some(detected) = detect_shape(document, source) else {
            return self.fail(
                &ConversionError::UnrecognizedShape { target },
                document::empty_document(target),
            );
        };
        if detected != source {
            self.diagnostics.report(&ConversionError::ShapeMismatch {
                declared: source,
                detected,
            });
            self.debug.source_platform = Some(detected);
        }
        let Some(direction) = Direction::between(detected, target) else {
            return self.fail(
                &ConversionError::UnsupportedDirection { platform: detected },
                document.clone(),
            );
        };

        let workflow = normalize(document, direction.source());
        let graph = WorkflowGraph::build(&workflow);
        for finding in lint_workflow(&workflow, &graph) {
            self.diagnostics.report(&finding);
        }
        self.debug.source_node_count = workflow.nodes.len();

        let _span = tracing::debug_span!("convert", %direction, name = workflow.name.as_str()).entered();
        let converted = match direction {
            Direction::N8nToMake => self.to_make(&workflow, &graph),
            Direction::MakeToN8n => self.to_n8n(&workflow, &graph),
        };

        self.diagnostics.info("Conversion complete");
        self.enter(ConversionState::Done);
        self.finish(converted)
    }

    /// Folds one node's outcome into the call's diagnostics.
    fn absorb(&mut self, conversion: NodeConversion) -> TargetNode {
        for (level, err) in &conversion.issues {
            self.diagnostics.report_at(*level, err);
        }
        if let Some(node_type) = conversion.unmapped_type {
            self.debug.unmapped_nodes += 1;
            self.diagnostics.unmapped(node_type);
        }
        for entry in conversion.review {
            self.diagnostics.review(entry);
        }
        if conversion.restored {
            self.debug.restored_stubs += 1;
        } else if conversion.stub {
            self.debug.stub_nodes += 1;
        } else {
            self.debug.mapped_nodes += 1;
        }
        conversion.node
    }

    fn to_make(&mut self, workflow: &SourceWorkflow, graph: &WorkflowGraph) -> Value {
        self.enter(ConversionState::ConvertingNodes);
        let direction = Direction::N8nToMake;
        let (ids, mut allocator) = ids::allocate_make_ids(workflow, self.options.preserve_ids);
        let evaluation = self.options.evaluation_context();

        // Connections resolve duplicate names to the first node, so do references.
        let mut base = RewriteContext::default();
        for node in &workflow.nodes {
            if let (Some(name), Some(&id)) = (&node.name, ids.get(&node.key)) {
                if !base.module_ids.contains_key(name) {
                    base = base.with_node(name.clone(), id);
                }
            }
        }

        let mapper = NodeMapper::new(self.resolver, self.options.accuracy_threshold());
        let mut modules = IndexMap::new();
        for (node, &id) in workflow.nodes.iter().zip(ids.values()) {
            let module_ref = graph
                .first_upstream(&node.key)
                .and_then(|upstream| ids.get(upstream))
                .copied()
                .unwrap_or(self.options.default_module_ref);
            let ctx = self
                .node_context(NodeId::Number(u64::from(id)), node.name.clone(), &evaluation)
                .with_rewrite(base.clone().with_module_ref(module_ref));
            if let TargetNode::Make(module) = self.absorb(mapper.convert(node, direction, &ctx)) {
                modules.insert(node.key.clone(), module);
            }
        }

        self.enter(ConversionState::ConvertingConnections);
        let layout =
            connections::build_make_flow(workflow, graph, modules, &mut allocator, &mut self.diagnostics);
        self.debug.converted_connections = layout.converted;
        self.debug.dropped_connections = layout.dropped;

        self.enter(ConversionState::Assembling);
        let scenario = self.scenario_settings(workflow);
        document::to_document(&document::assemble_make(workflow.name.clone(), layout, scenario))
    }

    /// Scenario settings for a Make target: the ones an earlier conversion
    /// carried in n8n `meta`, or the defaults. n8n settings have no Make
    /// counterpart and are only reported.
    fn scenario_settings(&mut self, workflow: &SourceWorkflow) -> ScenarioSettings {
        let dropped: Vec<&str> = workflow
            .settings
            .keys()
            .map(String::as_str)
            .filter(|k| *k != "executionOrder")
            .collect();
        if !dropped.is_empty() {
            self.diagnostics.info(format!(
                "Workflow settings without a Make equivalent were not carried over: {}",
                dropped.join(", ")
            ));
        }
        let Some(carried) = &workflow.scenario else {
            return ScenarioSettings::default();
        };
        match serde_json::from_value(carried.clone()) {
            Ok(scenario) => scenario,
            Err(e) => {
                self.diagnostics.info(format!(
                    "Carried Make scenario settings could not be read ({}); using defaults",
                    e
                ));
                ScenarioSettings::default()
            }
        }
    }

    fn to_n8n(&mut self, workflow: &SourceWorkflow, graph: &WorkflowGraph) -> Value {
        self.enter(ConversionState::ConvertingNodes);
        let direction = Direction::MakeToN8n;
        let ids = ids::allocate_n8n_ids(workflow, self.options.preserve_ids);
        let names = ids::allocate_n8n_names(workflow, graph, self.resolver, direction);
        let evaluation = self.options.evaluation_context();

        let module_id = |key: &str| {
            workflow
                .node(key)
                .and_then(|n| n.id.as_ref())
                .and_then(NodeId::as_number)
                .and_then(|n| u32::try_from(n).ok())
        };

        let mut base = RewriteContext::default();
        for (node, name) in workflow.nodes.iter().zip(names.values()) {
            if let Some(id) = module_id(&node.key) {
                if !base.node_names.contains_key(&id) {
                    base = base.with_node(name.clone(), id);
                }
            }
        }

        let mapper = NodeMapper::new(self.resolver, self.options.accuracy_threshold());
        let mut nodes = Vec::with_capacity(workflow.nodes.len());
        for ((node, id), name) in workflow.nodes.iter().zip(ids.values()).zip(names.values()) {
            let module_ref = graph
                .first_upstream(&node.key)
                .and_then(module_id)
                .unwrap_or(self.options.default_module_ref);
            let ctx = self
                .node_context(NodeId::Text(id.clone()), Some(name.clone()), &evaluation)
                .with_rewrite(base.clone().with_module_ref(module_ref))
                .with_outputs(graph.output_count(&node.key));
            if let TargetNode::N8n(n8n) = self.absorb(mapper.convert(node, direction, &ctx)) {
                nodes.push(n8n);
            }
        }

        self.enter(ConversionState::ConvertingConnections);
        let (connections, converted, dropped) =
            connections::build_n8n_connections(workflow, graph, &names, &mut self.diagnostics);
        self.debug.converted_connections = converted;
        self.debug.dropped_connections = dropped;

        self.enter(ConversionState::Assembling);
        document::to_document(&document::assemble_n8n(
            workflow.name.clone(),
            nodes,
            connections,
            workflow.scenario.clone(),
        ))
    }

    fn node_context<'c>(
        &self,
        target_id: NodeId,
        target_name: Option<String>,
        evaluation: &'c ExpressionContext,
    ) -> NodeContext<'c>
    where
        'a: 'c,
    {
        NodeContext::new(target_id, target_name, self.options, evaluation)
    }
}

/// Converts `document` from `source` to `target` against `resolver`.
pub fn convert_workflow(
    document: &Value,
    source: Platform,
    target: Platform,
    options: &ConversionOptions,
    resolver: &MappingResolver,
) -> ConversionResult {
    Conversion::new(options, resolver, Some(source), Some(target)).run(document, source, target)
}

/// Same as [`convert_workflow`] with the built-in mapping table. Completes
/// without suspending.
pub async fn convert(
    document: &Value,
    source: Platform,
    target: Platform,
    options: &ConversionOptions,
) -> ConversionResult {
    convert_workflow(document, source, target, options, MappingResolver::default_shared())
}

/// String surface used by the WASM layer. Unknown platforms, unparseable JSON
/// and bad options are reported in the result instead of failing.
pub fn convert_json(
    document: &str,
    source: &str,
    target: &str,
    options: Option<&str>,
) -> ConversionResult {
    let (options, options_error) = match options.map(ConversionOptions::from_json) {
        None => (ConversionOptions::default(), None),
        Some(Ok(options)) => (options, None),
        Some(Err(e)) => (
            ConversionOptions::default(),
            Some(ConversionError::InvalidOptions(e.to_string())),
        ),
    };
    let resolver = MappingResolver::default_shared();
    let source_platform = source.parse::<Platform>();
    let target_platform = target.parse::<Platform>();

    let mut run = Conversion::new(
        &options,
        resolver,
        source_platform.as_ref().ok().copied(),
        target_platform.as_ref().ok().copied(),
    );
    if let Some(err) = &options_error {
        run.diagnostics.report(err);
    }

    let (source, target) = match (source_platform, target_platform) {
        (Ok(source), Ok(target)) => (source, target),
        (Err(err), target) => {
            let empty = target.map(document::empty_document).unwrap_or(Value::Null);
            return run.fail(&err, empty);
        }
        (Ok(_), Err(err)) => return run.fail(&err, Value::Null),
    };

    match serde_json::from_str::<Value>(document) {
        Ok(value) => run.run(&value, source, target),
        Err(e) => run.fail(
            &ConversionError::MalformedDocument {
                reason: e.to_string(),
                target,
            },
            document::empty_document(target),
        ),
    }
}
