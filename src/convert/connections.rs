//! Topology rebuild.
//!
//! n8n keeps an adjacency map keyed by node name; Make nests successors
//! inline, either as the next module of the same flow or as the first module
//! of a router's route. Make routes cannot merge, so a node reachable from two
//! places keeps its first placement.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::{Map, Number};

use super::diagnostics::Diagnostics;
use super::ids::MakeIds;
use super::stub::designer;
use crate::error::ConversionError;
use crate::mapping::MAKE_ROUTER;
use crate::parse::graph::WorkflowGraph;
use crate::parse::normalize::SourceWorkflow;
use crate::parse::types::{MakeModule, MakeRoute, N8nConnection, N8nConnections, NodeId};
use crate::platform::Platform;

const MAIN: &str = "main";

#[derive(Debug, Default)]
pub struct MakeLayout {
    pub flow: Vec<MakeModule>,
    /// Chains not reachable from the first root.
    pub orphans: Vec<Vec<MakeModule>>,
    pub converted: usize,
    pub dropped: usize,
}

/// Lays converted modules out as a Make flow. `modules` is keyed by source
/// node key, in document order.
pub fn build_make_flow(
    workflow: &SourceWorkflow,
    graph: &WorkflowGraph,
    modules: IndexMap<String, MakeModule>,
    ids: &mut MakeIds,
    diagnostics: &mut Diagnostics,
) -> MakeLayout {
    let labels: HashMap<&str, String> = workflow
        .nodes
        .iter()
        .map(|n| (n.key.as_str(), n.label()))
        .collect();
    let mut builder = FlowBuilder {
        graph,
        labels,
        modules,
        ids,
        diagnostics,
        converted: 0,
        dropped: 0,
    };

    for edge in &workflow.unresolved {
        builder.dropped += 1;
        builder.diagnostics.report(&ConversionError::DanglingConnection {
            from: edge.from.clone(),
            to: edge.to.clone(),
            reason: "one of its nodes does not exist".into(),
        });
    }
    for edge in workflow.edges.iter().filter(|e| e.kind != MAIN) {
        builder.dropped += 1;
        let err = ConversionError::UnrepresentableConnection {
            from: builder.label(&edge.from),
            to: builder.label(&edge.to),
            target: Platform::Make,
            reason: format!("'{}' connections have no Make equivalent", edge.kind),
        };
        builder.diagnostics.report(&err);
    }

    let mut layout = MakeLayout::default();
    let roots: Vec<String> = graph.roots().into_iter().map(str::to_string).collect();
    for root in roots {
        if builder.modules.contains_key(&root) {
            let chain = builder.chain(&root);
            layout.push_chain(chain);
        }
    }
    // Left over: modules on a cycle, or reached only through non-main edges.
    while let Some(key) = builder.modules.keys().next().cloned() {
        let chain = builder.chain(&key);
        layout.push_chain(chain);
    }

    layout.converted = builder.converted;
    layout.dropped = builder.dropped;
    layout
}

impl MakeLayout {
    fn push_chain(&mut self, chain: Vec<MakeModule>) {
        if self.flow.is_empty() {
            self.flow = chain;
        } else {
            self.orphans.push(chain);
        }
    }
}

struct FlowBuilder<'a> {
    graph: &'a WorkflowGraph,
    labels: HashMap<&'a str, String>,
    /// Modules not yet placed.
    modules: IndexMap<String, MakeModule>,
    ids: &'a mut MakeIds,
    diagnostics: &'a mut Diagnostics,
    converted: usize,
    dropped: usize,
}

impl FlowBuilder<'_> {
    fn label(&self, key: &str) -> String {
        self.labels
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    /// `main` successors ordered by output index, then connection order.
    fn targets(&self, key: &str) -> Vec<String> {
        let mut outgoing: Vec<(u32, String)> = self
            .graph
            .successors(key)
            .into_iter()
            .filter(|(_, label)| label.kind == MAIN)
            .map(|(to, label)| (label.from_output, to.to_string()))
            .collect();
        outgoing.sort_by_key(|(output, _)| *output);
        outgoing.into_iter().map(|(_, to)| to).collect()
    }

    /// False, with a warning, when `to` has already been placed.
    fn available(&mut self, from: &str, to: &str) -> bool {
        if self.modules.contains_key(to) {
            return true;
        }
        self.dropped += 1;
        let err = ConversionError::UnrepresentableConnection {
            from: self.label(from),
            to: self.label(to),
            target: Platform::Make,
            reason: "the target module is already placed and Make routes cannot merge".into(),
        };
        self.diagnostics.report(&err);
        false
    }

    fn add_routes(&mut self, from: &str, router: &mut MakeModule, targets: Vec<String>) {
        for to in targets {
            if self.available(from, &to) {
                self.converted += 1;
                let flow = self.chain(&to);
                router.routes.push(MakeRoute { flow });
            }
        }
    }

    /// Places `start` and everything linearly after it.
    fn chain(&mut self, start: &str) -> Vec<MakeModule> {
        let mut flow = Vec::new();
        let mut current = Some(start.to_string());

        while let Some(key) = current.take() {
            let Some(mut module) = self.modules.shift_remove(&key) else {
                break;
            };
            let targets = self.targets(&key);

            if module.module == MAKE_ROUTER {
                self.add_routes(&key, &mut module, targets);
                flow.push(module);
            } else if targets.len() > 1 {
                let id = self.ids.next_free();
                let position = [
                    module.metadata.designer.x.0 + 150.0,
                    module.metadata.designer.y.0,
                ];
                let mut router = MakeModule {
                    id: NodeId::Number(u64::from(id)),
                    module: MAKE_ROUTER.to_string(),
                    version: Number::from(1),
                    parameters: Map::new(),
                    mapper: Map::new(),
                    metadata: designer(position, None),
                    routes: Vec::new(),
                    filter: None,
                    stub_info: None,
                };
                let message = format!(
                    "Inserted router {} after '{}' to split its {} outgoing connections",
                    id,
                    self.label(&key),
                    targets.len()
                );
                self.diagnostics.info(message);
                self.add_routes(&key, &mut router, targets);
                flow.push(module);
                flow.push(router);
            } else {
                if let Some(to) = targets.into_iter().next() {
                    if self.available(&key, &to) {
                        self.converted += 1;
                        current = Some(to);
                    }
                }
                flow.push(module);
            }
        }
        flow
    }
}

/// Builds n8n `main` connections from the graph, source nodes in document
/// order. `names` maps source keys to n8n node names.
pub fn build_n8n_connections(
    workflow: &SourceWorkflow,
    graph: &WorkflowGraph,
    names: &IndexMap<String, String>,
    diagnostics: &mut Diagnostics,
) -> (N8nConnections, usize, usize) {
    let mut connections = N8nConnections::new();
    let mut converted = 0;
    let mut dropped = 0;

    for node in &workflow.nodes {
        for (to, label) in graph.successors(&node.key) {
            let (Some(from_name), Some(to_name)) = (names.get(&node.key), names.get(to)) else {
                dropped += 1;
                diagnostics.report(&ConversionError::DanglingConnection {
                    from: node.key.clone(),
                    to: to.to_string(),
                    reason: "one of its nodes was not converted".into(),
                });
                continue;
            };
            let outputs = connections
                .entry(from_name.clone())
                .or_default()
                .entry(label.kind.clone())
                .or_default();
            let output = label.from_output as usize;
            if outputs.len() <= output {
                outputs.resize_with(output + 1, Vec::new);
            }
            outputs[output].push(N8nConnection {
                node: to_name.clone(),
                kind: label.kind.clone(),
                index: label.to_input,
            });
            converted += 1;
        }
    }

    for edge in &workflow.unresolved {
        dropped += 1;
        diagnostics.report(&ConversionError::DanglingConnection {
            from: edge.from.clone(),
            to: edge.to.clone(),
            reason: "one of its nodes does not exist".into(),
        });
    }

    (connections, converted, dropped)
}
