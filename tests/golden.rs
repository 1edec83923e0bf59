//! Golden fixture comparisons. Each source document is converted and compared
//! as JSON values against the checked-in expected document.

mod helpers;

use helpers::*;
use serde_json::Value;

fn load(json: &str) -> Value {
    serde_json::from_str(json).expect("Fixture should be valid JSON")
}

#[test]
fn lead_intake_n8n_to_make() {
    let source = load(include_str!("fixtures/sources/n8n/lead_intake.json"));
    let expected = load(include_str!("fixtures/expected/make/lead_intake.json"));

    let result = to_make(&source);
    assert_eq!(result.converted_workflow, expected);
    assert!(result.parameters_needing_review.is_empty());
    assert_eq!(result.debug.mapped_nodes, 3);
    assert_eq!(result.debug.dropped_connections, 0);
}

#[test]
fn order_routing_make_to_n8n() {
    let source = load(include_str!("fixtures/sources/make/order_routing.json"));
    let expected = load(include_str!("fixtures/expected/n8n/order_routing.json"));

    let result = to_n8n_with(&source, &preserving_ids());
    assert_eq!(result.converted_workflow, expected);
    assert!(result.parameters_needing_review.is_empty());
    assert!(result.unmapped_nodes.is_empty());
    assert_eq!(result.debug.converted_connections, 3);
}

#[test]
fn golden_outputs_survive_the_trip_back() {
    let source = load(include_str!("fixtures/sources/n8n/lead_intake.json"));
    let make = to_make(&source).converted_workflow;
    let back = to_n8n(&make);

    let types: Vec<&str> = back.converted_workflow["nodes"]
        .as_array()
        .expect("nodes")
        .iter()
        .filter_map(|n| n["type"].as_str())
        .collect();
    assert_eq!(
        types,
        vec![
            "n8n-nodes-base.webhook",
            "n8n-nodes-base.httpRequest",
            "n8n-nodes-base.slack"
        ]
    );
    let notify = &back.converted_workflow["nodes"][2]["parameters"];
    assert_eq!(notify["otherOptions"]["mrkdwn"], true);
    assert_eq!(
        notify["text"],
        "={{ $str.upper($node[\"Webhook\"].json.name) }} via {{ $json.source }}"
    );
}
