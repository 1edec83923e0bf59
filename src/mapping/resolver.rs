//! Node type lookup over the combined base + plugin + user tables.

use std::sync::LazyLock;

use super::base::base_tables;
use super::types::{MappingTables, NodeMappingEntry};
use crate::platform::Direction;

/// Synchronous accessor for an external mapping database.
pub trait MappingProvider {
    fn tables(&self) -> MappingTables;
}

impl MappingProvider for MappingTables {
    fn tables(&self) -> MappingTables {
        self.clone()
    }
}

/// Layered mapping sources. Later layers win on the same key:
/// base < plugins (in registration order) < user.
#[derive(Debug, Clone, Default)]
pub struct MappingDatabase {
    base: MappingTables,
    plugins: Vec<(String, MappingTables)>,
    user: MappingTables,
}

impl MappingDatabase {
    pub fn new(base: MappingTables) -> Self {
        Self {
            base,
            plugins: Vec::new(),
            user: MappingTables::new(),
        }
    }

    pub fn with_base_tables() -> Self {
        Self::new(base_tables())
    }

    /// Registers (or replaces) a plugin's tables under `name`.
    pub fn register_plugin(&mut self, name: impl Into<String>, tables: MappingTables) {
        let name = name.into();
        match self.plugins.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = tables,
            None => self.plugins.push((name, tables)),
        }
    }

    pub fn set_user_tables(&mut self, tables: MappingTables) {
        self.user = tables;
    }

    pub fn plugin_names(&self) -> impl Iterator<Item = &str> {
        self.plugins.iter().map(|(name, _)| name.as_str())
    }

    /// Merged view. Builds a new table; none of the layers are modified.
    pub fn combined(&self) -> MappingTables {
        let mut combined = self.base.clone();
        for (_, tables) in &self.plugins {
            combined.merge(tables);
        }
        let mut user = self.user.clone();
        for direction in [Direction::N8nToMake, Direction::MakeToN8n] {
            for entry in user.table_mut(direction).values_mut() {
                entry.user_defined = true;
            }
        }
        combined.merge(&user);
        combined
    }
}

impl MappingProvider for MappingDatabase {
    fn tables(&self) -> MappingTables {
        self.combined()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution<'a> {
    Found(&'a NodeMappingEntry),
    /// An entry exists but its accuracy is under the caller's threshold.
    BelowThreshold(&'a NodeMappingEntry),
    NotFound,
}

/// Immutable lookup over one combined table snapshot. Safe to share across
/// threads and conversion calls.
#[derive(Debug, Clone)]
pub struct MappingResolver {
    tables: MappingTables,
}

static DEFAULT_RESOLVER: LazyLock<MappingResolver> =
    LazyLock::new(|| MappingResolver::new(base_tables()));

impl MappingResolver {
    pub fn new(tables: MappingTables) -> Self {
        Self { tables }
    }

    pub fn from_provider(provider: &dyn MappingProvider) -> Self {
        Self::new(provider.tables())
    }

    /// Resolver over the built-in table, built once per process.
    pub fn default_shared() -> &'static MappingResolver {
        &DEFAULT_RESOLVER
    }

    pub fn tables(&self) -> &MappingTables {
        &self.tables
    }

    /// Exact, case-sensitive lookup.
    pub fn resolve(&self, source_type: &str, direction: Direction) -> Option<&NodeMappingEntry> {
        self.tables.table(direction).get(source_type)
    }

    pub fn resolve_with_accuracy(
        &self,
        source_type: &str,
        direction: Direction,
        threshold: u8,
    ) -> Resolution<'_> {
        match self.resolve(source_type, direction) {
            Some(entry) if entry.accuracy >= threshold => Resolution::Found(entry),
            Some(entry) => Resolution::BelowThreshold(entry),
            None => Resolution::NotFound,
        }
    }
}

impl Default for MappingResolver {
    fn default() -> Self {
        Self::new(base_tables())
    }
}

/// Entries whose target is itself a source in the reverse table but does not
/// map back to where it came from. Sorted.
pub fn round_trip_violations(tables: &MappingTables) -> Vec<String> {
    let mut violations = Vec::new();
    for direction in [Direction::N8nToMake, Direction::MakeToN8n] {
        let reverse = tables.table(direction.reverse());
        for (source, entry) in tables.table(direction) {
            if let Some(back) = reverse.get(&entry.target_type) {
                if back.target_type != *source {
                    violations.push(format!(
                        "{}: {} -> {} -> {}",
                        direction.table_key(),
                        source,
                        entry.target_type,
                        back.target_type
                    ));
                }
            }
        }
    }
    violations.sort();
    violations
}
