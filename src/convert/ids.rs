//! Target ids and names, allocated for every node before conversion.

use std::collections::HashSet;

use indexmap::IndexMap;
use uuid::Uuid;

use crate::mapping::{MappingResolver, widen_router};
use crate::parse::graph::WorkflowGraph;
use crate::parse::normalize::SourceWorkflow;
use crate::platform::Direction;

/// Make module ids in use, handing out the lowest free one.
#[derive(Debug, Default)]
pub struct MakeIds {
    used: HashSet<u32>,
    next: u32,
}

impl MakeIds {
    pub fn new() -> Self {
        Self {
            used: HashSet::new(),
            next: 1,
        }
    }

    /// Claims `id`. False when it is taken or zero.
    pub fn reserve(&mut self, id: u32) -> bool {
        id > 0 && self.used.insert(id)
    }

    pub fn next_free(&mut self) -> u32 {
        while self.used.contains(&self.next) {
            self.next += 1;
        }
        let id = self.next;
        self.used.insert(id);
        self.next += 1;
        id
    }
}

/// Source key -> Make id, in document order. With `preserve`, numeric source
/// ids are kept when unique; every other node gets the next free id.
pub fn allocate_make_ids(workflow: &SourceWorkflow, preserve: bool) -> (IndexMap<String, u32>, MakeIds) {
    let mut ids = MakeIds::new();
    let kept: Vec<Option<u32>> = workflow
        .nodes
        .iter()
        .map(|node| {
            if !preserve {
                return None;
            }
            node.id
                .as_ref()
                .and_then(|id| id.as_number())
                .and_then(|n| u32::try_from(n).ok())
                .filter(|&n| ids.reserve(n))
        })
        .collect();

    let allocated = workflow
        .nodes
        .iter()
        .zip(kept)
        .map(|(node, kept)| (node.key.clone(), kept.unwrap_or_else(|| ids.next_free())))
        .collect();
    (allocated, ids)
}

/// Deterministic n8n node id.
pub fn n8n_node_id(workflow_name: &str, key: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("{}/{}", workflow_name, key).as_bytes()).to_string()
}

/// Source key -> n8n id. With `preserve` the source id is kept.
pub fn allocate_n8n_ids(workflow: &SourceWorkflow, preserve: bool) -> IndexMap<String, String> {
    workflow
        .nodes
        .iter()
        .map(|node| {
            let id = if preserve {
                node.key.clone()
            } else {
                n8n_node_id(&workflow.name, &node.key)
            };
            (node.key.clone(), id)
        })
        .collect()
}

/// Source key -> unique n8n node name. Falls back from the source name to the
/// mapping's display name to the type. Repeats get `1`, `2`, ... appended.
pub fn allocate_n8n_names(
    workflow: &SourceWorkflow,
    graph: &WorkflowGraph,
    resolver: &MappingResolver,
    direction: Direction,
) -> IndexMap<String, String> {
    let mut used = HashSet::new();
    workflow
        .nodes
        .iter()
        .map(|node| {
            let base = node
                .name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .or_else(|| {
                    let entry = node.node_type.as_deref().and_then(|t| resolver.resolve(t, direction))?;
                    match widen_router(entry, graph.output_count(&node.key)) {
                        Some(switch) => switch.display_name,
                        None => entry.display_name.clone(),
                    }
                })
                .or_else(|| node.node_type.clone().filter(|t| !t.is_empty()))
                .unwrap_or_else(|| "Node".to_string());
            (node.key.clone(), unique_name(&base, &mut used))
        })
        .collect()
}

fn unique_name(base: &str, used: &mut HashSet<String>) -> String {
    if used.insert(base.to_string()) {
        return base.to_string();
    }
    let mut n = 1;
    loop {
        let candidate = format!("{}{}", base, n);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
