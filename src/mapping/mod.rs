//! Node mapping database: records, built-in table, layering and lookup.

pub mod base;
pub mod resolver;
pub mod transform;
pub mod types;

pub use base::{MAKE_ROUTER, base_tables, switch_rules, widen_router};
pub use resolver::{
    MappingDatabase, MappingProvider, MappingResolver, Resolution, round_trip_violations,
};
pub use transform::ValueTransform;
pub use types::{MappingTables, NodeMappingEntry};
