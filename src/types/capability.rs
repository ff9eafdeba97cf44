use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Node resource capability: memory + vcores plus optional named extended
/// resources (GPUs, etc). Used for both `totalCapability` and
/// `physicalCapability` in `NodeRecord`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceCapability {
    pub memory_mb: i64,
    pub vcores: i32,
    #[serde(default)]
    pub resource_types: HashMap<String, i64>,
}

impl ResourceCapability {
    pub fn new(memory_mb: i64, vcores: i32) -> Self {
        Self {
            memory_mb,
            vcores,
            resource_types: HashMap::new(),
        }
    }

    /// Minimum allocation check: both memory and vcores must clear the
    /// configured floor.
    pub fn meets_minimum(&self, min_memory_mb: i64, min_vcores: i32) -> bool {
        self.memory_mb >= min_memory_mb && self.vcores >= min_vcores
    }
}

/// A single override row in the Dynamic Resource Table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicResourceEntry {
    pub node_id: crate::types::NodeId,
    pub memory_mb: i64,
    pub vcores: i32,
}
