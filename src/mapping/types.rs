//! Mapping records and the per-direction tables that hold them.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::transform::ValueTransform;
use crate::error::MappingError;
use crate::platform::Direction;

fn full_accuracy() -> u8 {
    100
}

/// How one source node type becomes one target node type.
///
/// `parameter_map` is ordered; source and target names may be dotted paths
/// into nested parameter objects. `transforms` and `defaults` are keyed by the
/// source parameter name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMappingEntry {
    #[serde(default)]
    pub source_type: String,
    pub target_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_version: Option<u32>,
    #[serde(default)]
    pub parameter_map: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub transforms: IndexMap<String, ValueTransform>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub defaults: IndexMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub user_defined: bool,
    #[serde(default = "full_accuracy")]
    pub accuracy: u8,
}

impl NodeMappingEntry {
    pub fn new(source_type: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self {
            source_type: source_type.into(),
            target_type: target_type.into(),
            target_version: None,
            parameter_map: IndexMap::new(),
            transforms: IndexMap::new(),
            defaults: IndexMap::new(),
            display_name: None,
            description: None,
            user_defined: false,
            accuracy: full_accuracy(),
        }
    }

    pub fn version(mut self, version: u32) -> Self {
        self.target_version = Some(version);
        self
    }

    pub fn param(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.parameter_map.insert(source.into(), target.into());
        self
    }

    pub fn transform(mut self, source: impl Into<String>, transform: ValueTransform) -> Self {
        self.transforms.insert(source.into(), transform);
        self
    }

    pub fn default_value(mut self, source: impl Into<String>, value: Value) -> Self {
        self.defaults.insert(source.into(), value);
        self
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn accuracy(mut self, accuracy: u8) -> Self {
        self.accuracy = accuracy;
        self
    }

    pub fn user_defined(mut self) -> Self {
        self.user_defined = true;
        self
    }
}

/// The two direction tables, keyed by source type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingTables {
    #[serde(rename = "n8nToMake", default)]
    pub n8n_to_make: IndexMap<String, NodeMappingEntry>,
    #[serde(rename = "makeToN8n", default)]
    pub make_to_n8n: IndexMap<String, NodeMappingEntry>,
}

impl MappingTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `{ "n8nToMake": {...}, "makeToN8n": {...} }`. Each entry's
    /// `sourceType` is taken from its key.
    pub fn from_json(json: &str) -> Result<Self, MappingError> {
        let mut tables: MappingTables = serde_json::from_str(json)?;
        for direction in [Direction::N8nToMake, Direction::MakeToN8n] {
            for (key, entry) in tables.table_mut(direction) {
                entry.source_type = key.clone();
            }
        }
        tables.check()?;
        Ok(tables)
    }

    fn check(&self) -> Result<(), MappingError> {
        for direction in [Direction::N8nToMake, Direction::MakeToN8n] {
            for (key, entry) in self.table(direction) {
                if entry.target_type.trim().is_empty() {
                    return Err(MappingError::EmptyTarget {
                        table: direction.table_key(),
                        source_type: key.clone(),
                    });
                }
                if entry.accuracy > 100 {
                    return Err(MappingError::AccuracyOutOfRange {
                        table: direction.table_key(),
                        source_type: key.clone(),
                        accuracy: entry.accuracy,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn table(&self, direction: Direction) -> &IndexMap<String, NodeMappingEntry> {
        match direction {
            Direction::N8nToMake => &self.n8n_to_make,
            Direction::MakeToN8n => &self.make_to_n8n,
        }
    }

    pub fn table_mut(&mut self, direction: Direction) -> &mut IndexMap<String, NodeMappingEntry> {
        match direction {
            Direction::N8nToMake => &mut self.n8n_to_make,
            Direction::MakeToN8n => &mut self.make_to_n8n,
        }
    }

    pub fn insert(&mut self, direction: Direction, entry: NodeMappingEntry) {
        self.table_mut(direction)
            .insert(entry.source_type.clone(), entry);
    }

    /// Overlays `other`; its entries replace same-key entries here.
    pub fn merge(&mut self, other: &MappingTables) {
        for direction in [Direction::N8nToMake, Direction::MakeToN8n] {
            let target = self.table_mut(direction);
            for (key, entry) in other.table(direction) {
                target.insert(key.clone(), entry.clone());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.n8n_to_make.len() + self.make_to_n8n.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
