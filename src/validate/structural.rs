//! Source lint rules (L001–L005). All findings are warnings.

use std::collections::HashMap;

use crate::error::ConversionError;
use crate::parse::graph::WorkflowGraph;
use crate::parse::normalize::SourceWorkflow;
use crate::platform::Platform;

/// Run all lint rules. Returns all findings in rule order.
pub fn lint_structural(workflow: &SourceWorkflow, graph: &WorkflowGraph) -> Vec<ConversionError> {
    let mut findings = Vec::new();

    l001_unique_names(workflow, &mut findings);
    l002_unique_ids(workflow, &mut findings);
    l003_nodes_have_type(workflow, &mut findings);
    l004_no_self_loops(workflow, &mut findings);
    l005_no_cycles(graph, &mut findings);

    findings
}

fn duplicates<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order = Vec::new();
    for v in values {
        let count = counts.entry(v).or_insert(0);
        *count += 1;
        if *count == 2 {
            order.push(v);
        }
    }
    order
}

/// n8n connections are keyed by node name.
fn l001_unique_names(workflow: &SourceWorkflow, findings: &mut Vec<ConversionError>) {
    if workflow.platform != Platform::N8n {
        return;
    }
    let names = workflow.nodes.iter().filter_map(|n| n.name.as_deref());
    for name in duplicates(names) {
        findings.push(ConversionError::lint(
            "L001",
            format!("Node name '{}' is used more than once; connections resolve to the first", name),
            Some(name.to_string()),
        ));
    }
}

fn l002_unique_ids(workflow: &SourceWorkflow, findings: &mut Vec<ConversionError>) {
    let ids: Vec<String> = workflow
        .nodes
        .iter()
        .filter_map(|n| n.id.as_ref().map(|id| id.key()))
        .collect();
    for id in duplicates(ids.iter().map(String::as_str)) {
        findings.push(ConversionError::lint(
            "L002",
            format!("Node id '{}' is used more than once", id),
            Some(id.to_string()),
        ));
    }
}

fn l003_nodes_have_type(workflow: &SourceWorkflow, findings: &mut Vec<ConversionError>) {
    for node in &workflow.nodes {
        let missing = node.node_type.as_deref().is_none_or(|t| t.trim().is_empty());
        if missing {
            findings.push(ConversionError::lint(
                "L003",
                format!("Node '{}' has no type", node.label()),
                Some(node.key.clone()),
            ));
        }
    }
}

fn l004_no_self_loops(workflow: &SourceWorkflow, findings: &mut Vec<ConversionError>) {
    for edge in &workflow.edges {
        if edge.from == edge.to {
            findings.push(ConversionError::lint(
                "L004",
                format!("Node '{}' is connected to itself", edge.from),
                Some(edge.from.clone()),
            ));
        }
    }
}

fn l005_no_cycles(graph: &WorkflowGraph, findings: &mut Vec<ConversionError>) {
    if graph.is_cyclic() {
        findings.push(ConversionError::lint(
            "L005",
            "Workflow contains a cycle; looping connections are kept only where the target allows",
            None,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::normalize::normalize;
    use serde_json::json;

    fn lint(doc: serde_json::Value, platform: Platform) -> Vec<&'static str> {
        let wf = normalize(&doc, platform);
        let graph = WorkflowGraph::build(&wf);
        lint_structural(&wf, &graph).iter().map(|e| e.code()).collect()
    }

    #[test]
    fn clean_workflow_has_no_findings() {
        let codes = lint(
            json!({
                "nodes": [
                    { "id": "1", "name": "A", "type": "n8n-nodes-base.set" },
                    { "id": "2", "name": "B", "type": "n8n-nodes-base.set" }
                ],
                "connections": { "A": { "main": [[{ "node": "B", "type": "main", "index": 0 }]] } }
            }),
            Platform::N8n,
        );
        assert!(codes.is_empty());
    }

    #[test]
    fn duplicate_names_and_ids() {
        let codes = lint(
            json!({
                "nodes": [
                    { "id": "1", "name": "A", "type": "n8n-nodes-base.set" },
                    { "id": "1", "name": "A", "type": "n8n-nodes-base.set" }
                ],
                "connections": {}
            }),
            Platform::N8n,
        );
        assert_eq!(codes, vec!["L001", "L002"]);
    }

    #[test]
    fn missing_type_and_self_loop() {
        let codes = lint(
            json!({
                "nodes": [
                    { "name": "A", "type": "" },
                    { "name": "B", "type": "n8n-nodes-base.set" }
                ],
                "connections": { "B": { "main": [[{ "node": "B", "type": "main", "index": 0 }]] } }
            }),
            Platform::N8n,
        );
        assert_eq!(codes, vec!["L003", "L004", "L005"]);
    }
}
