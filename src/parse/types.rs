//! Serde shapes of the two workflow documents.
//!
//! n8n: `{ name, nodes: [...], connections: { "<name>": { "main": [[...]] } } }`.
//! Make: `{ name, flow: [...], metadata: {...} }` with routes nested inline
//! under router modules.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};

use crate::platform::Platform;

// =============================================================================
// SHARED
// =============================================================================

/// Node identifier: n8n uses strings, Make uses numbers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeId {
    Number(u64),
    Text(String),
}

impl NodeId {
    /// String form used as the internal key.
    pub fn key(&self) -> String {
        match self {
            NodeId::Number(n) => n.to_string(),
            NodeId::Text(s) => s.clone(),
        }
    }

    /// Numeric value, also for numeric text such as `"3"`.
    pub fn as_number(&self) -> Option<u64> {
        match self {
            NodeId::Number(n) => Some(*n),
            NodeId::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeId::Number(n) => write!(f, "{}", n),
            NodeId::Text(s) => f.write_str(s),
        }
    }
}

/// Canvas coordinate. Whole numbers serialize as JSON integers.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Coord(pub f64);

impl Serialize for Coord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.is_finite() && self.0.fract() == 0.0 && self.0.abs() < 9.0e15 {
            serializer.serialize_i64(self.0 as i64)
        } else {
            serializer.serialize_f64(self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Coord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<f64>::deserialize(deserializer).map(|v| Coord(v.unwrap_or(0.0)))
    }
}

/// Treats an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn version_one() -> Number {
    Number::from(1)
}

/// Carried by every placeholder node so the original can be inspected or
/// restored later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StubInfo {
    pub original_platform: Platform,
    pub original_type: String,
    pub original_id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub original_parameters: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_mapper: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_version: Option<Number>,
    /// Whole source node, kept when it could not be read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_node: Option<Value>,
    pub note: String,
}

// =============================================================================
// N8N
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct N8nNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default = "version_one")]
    pub type_version: Number,
    #[serde(default)]
    pub position: [Coord; 2],
    #[serde(default, deserialize_with = "null_as_default")]
    pub parameters: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stub_info: Option<StubInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct N8nConnection {
    pub node: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub index: u32,
}

/// `source name -> connection type -> output index -> targets`.
pub type N8nConnections = IndexMap<String, IndexMap<String, Vec<Vec<N8nConnection>>>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct N8nSettings {
    pub execution_order: String,
}

impl Default for N8nSettings {
    fn default() -> Self {
        Self {
            execution_order: "v1".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct N8nMeta {
    pub converted_from: Platform,
    /// Make scenario settings, kept so that converting back restores them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub make_scenario: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct N8nWorkflow {
    pub name: String,
    pub nodes: Vec<N8nNode>,
    pub connections: N8nConnections,
    pub active: bool,
    pub settings: N8nSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<N8nMeta>,
}

impl N8nWorkflow {
    /// Canonical empty document.
    pub fn empty() -> Self {
        Self {
            name: String::new(),
            nodes: Vec::new(),
            connections: IndexMap::new(),
            active: false,
            settings: N8nSettings::default(),
            meta: None,
        }
    }
}

// =============================================================================
// MAKE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Designer {
    #[serde(default)]
    pub x: Coord,
    #[serde(default)]
    pub y: Coord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModuleMetadata {
    #[serde(default, deserialize_with = "null_as_default")]
    pub designer: Designer,
    /// `restore`, `expect`, `parameters` and anything else Make stores here.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MakeRoute {
    #[serde(default)]
    pub flow: Vec<MakeModule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MakeModule {
    pub id: NodeId,
    pub module: String,
    #[serde(default = "version_one")]
    pub version: Number,
    #[serde(default, deserialize_with = "null_as_default")]
    pub parameters: Map<String, Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub mapper: Map<String, Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: ModuleMetadata,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<MakeRoute>,
    /// Route filter guarding entry into this module.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stub_info: Option<StubInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScenarioSettings {
    pub roundtrips: u32,
    pub max_errors: u32,
    pub auto_commit: bool,
    pub auto_commit_trigger_last: bool,
    pub sequential: bool,
    pub confidential: bool,
    pub dataloss: bool,
    pub dlq: bool,
    pub fresh_variables: bool,
}

impl Default for ScenarioSettings {
    fn default() -> Self {
        Self {
            roundtrips: 1,
            max_errors: 3,
            auto_commit: true,
            auto_commit_trigger_last: true,
            sequential: false,
            confidential: false,
            dataloss: false,
            dlq: false,
            fresh_variables: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BlueprintDesigner {
    /// Chains not reachable from the main flow.
    pub orphans: Vec<Vec<MakeModule>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlueprintMetadata {
    pub version: u32,
    pub scenario: ScenarioSettings,
    pub designer: BlueprintDesigner,
}

impl Default for BlueprintMetadata {
    fn default() -> Self {
        Self {
            version: 1,
            scenario: ScenarioSettings::default(),
            designer: BlueprintDesigner::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MakeBlueprint {
    pub name: String,
    pub flow: Vec<MakeModule>,
    pub metadata: BlueprintMetadata,
}

impl MakeBlueprint {
    /// Canonical empty document.
    pub fn empty() -> Self {
        Self {
            name: String::new(),
            flow: Vec::new(),
            metadata: BlueprintMetadata::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_ids_accept_both_forms() {
        let ids: Vec<NodeId> = serde_json::from_value(json!([3, "abc", "7"])).unwrap();
        assert_eq!(ids[0], NodeId::Number(3));
        assert_eq!(ids[1].as_number(), None);
        assert_eq!(ids[2].as_number(), Some(7));
        assert_eq!(ids[0].key(), "3");
    }

    #[test]
    fn whole_coordinates_serialize_as_integers() {
        assert_eq!(serde_json::to_value(Coord(250.0)).unwrap(), json!(250));
        assert_eq!(serde_json::to_value(Coord(12.5)).unwrap(), json!(12.5));
    }

    #[test]
    fn n8n_node_defaults() {
        let node: N8nNode = serde_json::from_value(json!({
            "name": "A",
            "type": "n8n-nodes-base.set",
            "parameters": null
        }))
        .unwrap();
        assert_eq!(node.type_version, Number::from(1));
        assert!(node.parameters.is_empty());
        assert_eq!(node.position, [Coord(0.0), Coord(0.0)]);
    }

    #[test]
    fn make_module_keeps_unknown_metadata() {
        let module: MakeModule = serde_json::from_value(json!({
            "id": 2,
            "module": "http:ActionSendData",
            "mapper": { "url": "x" },
            "metadata": { "designer": { "x": 300, "y": 0 }, "restore": {} }
        }))
        .unwrap();
        assert_eq!(module.metadata.designer.x, Coord(300.0));
        assert!(module.metadata.extra.contains_key("restore"));
        assert!(module.parameters.is_empty());
    }

    #[test]
    fn empty_documents() {
        assert_eq!(
            serde_json::to_value(N8nWorkflow::empty()).unwrap(),
            json!({
                "name": "",
                "nodes": [],
                "connections": {},
                "active": false,
                "settings": { "executionOrder": "v1" }
            })
        );
        let make = serde_json::to_value(MakeBlueprint::empty()).unwrap();
        assert_eq!(make["flow"], json!([]));
        assert_eq!(make["metadata"]["version"], json!(1));
        assert_eq!(make["metadata"]["designer"]["orphans"], json!([]));
        assert_eq!(make["metadata"]["scenario"]["maxErrors"], json!(3));
    }
}
