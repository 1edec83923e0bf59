//! Target document assembly.

use serde::Serialize;
use serde_json::Value;

use super::connections::MakeLayout;
use crate::parse::types::{
    BlueprintDesigner, BlueprintMetadata, MakeBlueprint, N8nConnections, N8nMeta, N8nNode,
    N8nWorkflow, ScenarioSettings,
};
use crate::platform::Platform;

/// Canonical empty document of `platform`.
pub fn empty_document(platform: Platform) -> Value {
    match platform {
        Platform::N8n => to_document(&N8nWorkflow::empty()),
        Platform::Make => to_document(&MakeBlueprint::empty()),
    }
}

/// n8n has no scenario settings; they travel in `meta.makeScenario`.
pub fn assemble_n8n(
    name: String,
    nodes: Vec<N8nNode>,
    connections: N8nConnections,
    make_scenario: Option<Value>,
) -> N8nWorkflow {
    N8nWorkflow {
        name,
        nodes,
        connections,
        meta: Some(N8nMeta {
            converted_from: Platform::Make,
            make_scenario,
        }),
        ..N8nWorkflow::empty()
    }
}

pub fn assemble_make(name: String, layout: MakeLayout, scenario: ScenarioSettings) -> MakeBlueprint {
    MakeBlueprint {
        name,
        flow: layout.flow,
        metadata: BlueprintMetadata {
            scenario,
            designer: BlueprintDesigner {
                orphans: layout.orphans,
            },
            ..BlueprintMetadata::default()
        },
    }
}

pub fn to_document<T: Serialize>(document: &T) -> Value {
    serde_json::to_value(document).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to serialize converted workflow");
        Value::Null
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn make_assembly_carries_orphans_and_defaults() {
        let layout = MakeLayout {
            orphans: vec![vec![]],
            ..MakeLayout::default()
        };
        let doc = to_document(&assemble_make("wf".into(), layout, ScenarioSettings::default()));
        assert_eq!(doc["name"], "wf");
        assert_eq!(doc["metadata"]["designer"]["orphans"], json!([[]]));
        assert_eq!(doc["metadata"]["scenario"]["roundtrips"], 1);
    }

    #[test]
    fn n8n_assembly_records_origin() {
        let doc = to_document(&assemble_n8n("wf".into(), vec![], N8nConnections::new(), None));
        assert_eq!(doc["meta"], json!({ "convertedFrom": "make" }));
        assert_eq!(doc["active"], false);
        assert_eq!(doc["settings"]["executionOrder"], "v1");

        let scenario = json!({ "roundtrips": 4 });
        let doc = to_document(&assemble_n8n("wf".into(), vec![], N8nConnections::new(), Some(scenario.clone())));
        assert_eq!(doc["meta"]["makeScenario"], scenario);
    }
}
