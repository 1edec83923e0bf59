//! Placeholder nodes for types without a mapping, and their restoration.
//!
//! A stub keeps everything needed to rebuild the original node in
//! `stubInfo`. Converting a stub back to its original platform restores that
//! node instead of stubbing the placeholder again.

use serde_json::{Map, Number};

use super::node_mapper::{NodeContext, TargetNode};
use crate::parse::normalize::SourceNode;
use crate::parse::types::{Coord, Designer, MakeModule, ModuleMetadata, N8nNode, NodeId, StubInfo};
use crate::platform::Platform;

pub const MAKE_PLACEHOLDER: &str = "builtin:Placeholder";
pub const N8N_PLACEHOLDER: &str = "n8n-nodes-base.noOp";

/// Everything the source node carried, verbatim.
pub fn stub_info(node: &SourceNode, source: Platform, note: String) -> StubInfo {
    StubInfo {
        original_platform: source,
        original_type: node.node_type.clone().unwrap_or_default(),
        original_id: node.id.clone().unwrap_or_else(|| NodeId::Text(node.key.clone())),
        original_name: node.name.clone(),
        original_parameters: node.raw_parameters.clone(),
        original_mapper: node.raw_mapper.clone(),
        original_version: node.type_version.clone(),
        original_node: node.malformed.is_some().then(|| node.raw.clone()),
        note,
    }
}

pub(crate) fn designer(position: [f64; 2], name: Option<String>) -> ModuleMetadata {
    ModuleMetadata {
        designer: Designer {
            x: Coord(position[0]),
            y: Coord(position[1]),
            name,
        },
        extra: Map::new(),
    }
}

/// Placeholder on the target platform of `ctx`.
pub fn build_stub(node: &SourceNode, target: Platform, ctx: &NodeContext<'_>, info: StubInfo) -> TargetNode {
    match target {
        Platform::Make => TargetNode::Make(MakeModule {
            id: ctx.target_id.clone(),
            module: MAKE_PLACEHOLDER.to_string(),
            version: Number::from(1),
            parameters: Map::new(),
            mapper: Map::new(),
            metadata: designer(node.position, ctx.target_name.clone()),
            routes: Vec::new(),
            filter: None,
            stub_info: Some(info),
        }),
        Platform::N8n => TargetNode::N8n(N8nNode {
            id: Some(ctx.target_id.clone()),
            name: ctx.target_name.clone().unwrap_or_default(),
            node_type: N8N_PLACEHOLDER.to_string(),
            type_version: Number::from(1),
            position: [Coord(node.position[0]), Coord(node.position[1])],
            parameters: Map::new(),
            notes: Some(info.note.clone()),
            stub_info: Some(info),
        }),
    }
}

/// Stub info of a placeholder that was created on `target` and can be
/// rebuilt there.
pub fn restorable(node: &SourceNode, target: Platform) -> Option<&StubInfo> {
    node.stub_info
        .as_ref()
        .filter(|info| info.original_platform == target && !info.original_type.is_empty())
}

/// Rebuilds the original node under its new id and name.
pub fn restore(node: &SourceNode, info: &StubInfo, ctx: &NodeContext<'_>) -> TargetNode {
    let version = info.original_version.clone().unwrap_or_else(|| Number::from(1));
    match info.original_platform {
        Platform::Make => TargetNode::Make(MakeModule {
            id: ctx.target_id.clone(),
            module: info.original_type.clone(),
            version,
            parameters: info.original_parameters.clone(),
            mapper: info.original_mapper.clone().unwrap_or_default(),
            metadata: designer(
                node.position,
                ctx.target_name.clone().or_else(|| info.original_name.clone()),
            ),
            routes: Vec::new(),
            filter: None,
            stub_info: None,
        }),
        Platform::N8n => TargetNode::N8n(N8nNode {
            id: Some(ctx.target_id.clone()),
            name: ctx
                .target_name
                .clone()
                .or_else(|| info.original_name.clone())
                .unwrap_or_default(),
            node_type: info.original_type.clone(),
            type_version: version,
            position: [Coord(node.position[0]), Coord(node.position[1])],
            parameters: info.original_parameters.clone(),
            notes: None,
            stub_info: None,
        }),
    }
}
