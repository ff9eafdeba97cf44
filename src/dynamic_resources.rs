//! Dynamic Resource Table: a copy-on-write snapshot of per-node
//! capacity overrides, reloaded wholesale by an admin `update` call.
//! Lookup is read-only and consulted by both `Register` and every
//! `Heartbeat`.

use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{DynamicResourceEntry, NodeId, ResourceCapability};

#[derive(Debug, Default)]
pub struct DynamicResourceTable {
    snapshot: ArcSwap<HashMap<NodeId, ResourceCapability>>,
}

impl DynamicResourceTable {
    pub fn new() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    /// Admin-initiated wholesale replace, atomic with respect to readers.
    pub fn update(&self, entries: Vec<DynamicResourceEntry>) {
        let map: HashMap<NodeId, ResourceCapability> = entries
            .into_iter()
            .map(|e| (e.node_id, ResourceCapability::new(e.memory_mb, e.vcores)))
            .collect();
        self.snapshot.store(Arc::new(map));
    }

    pub fn clear(&self) {
        self.snapshot.store(Arc::new(HashMap::new()));
    }

    pub fn lookup(&self, node_id: &NodeId) -> Option<ResourceCapability> {
        self.snapshot.load().get(node_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_miss_returns_none() {
        let table = DynamicResourceTable::new();
        assert!(table.lookup(&NodeId::new("h1", 1)).is_none());
    }

    #[test]
    fn test_update_then_lookup() {
        let table = DynamicResourceTable::new();
        let id = NodeId::new("h1", 8041);
        table.update(vec![DynamicResourceEntry {
            node_id: id.clone(),
            memory_mb: 16384,
            vcores: 8,
        }]);

        let cap = table.lookup(&id).unwrap();
        assert_eq!(cap.memory_mb, 16384);
        assert_eq!(cap.vcores, 8);
    }

    #[test]
    fn test_update_wholesale_replaces_previous_entries() {
        let table = DynamicResourceTable::new();
        let id_a = NodeId::new("h1", 1);
        let id_b = NodeId::new("h2", 2);
        table.update(vec![DynamicResourceEntry {
            node_id: id_a.clone(),
            memory_mb: 1024,
            vcores: 1,
        }]);
        table.update(vec![DynamicResourceEntry {
            node_id: id_b.clone(),
            memory_mb: 2048,
            vcores: 2,
        }]);

        assert!(table.lookup(&id_a).is_none());
        assert!(table.lookup(&id_b).is_some());
    }

    #[test]
    fn test_clear_removes_all_overrides() {
        let table = DynamicResourceTable::new();
        let id = NodeId::new("h1", 1);
        table.update(vec![DynamicResourceEntry {
            node_id: id.clone(),
            memory_mb: 1024,
            vcores: 1,
        }]);
        table.clear();
        assert!(table.lookup(&id).is_none());
    }
}
