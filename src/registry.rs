//! The Node Registry: a concurrent `NodeId -> NodeRecord` mapping with
//! atomic `putIfAbsent` and per-record exclusive mutation.
//!
//! `DashMap`'s own shard locking gives readers of *other* keys freedom from
//! writers; the `tokio::sync::Mutex` wrapping each record gives short-lived
//! exclusive mutation per record. Callers `get` a handle then
//! `.lock().await` it themselves, rather than holding a dashmap shard
//! guard across an await point.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::types::{NodeId, NodeRecord};

pub type RecordHandle = Arc<Mutex<NodeRecord>>;

#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: DashMap<NodeId, RecordHandle>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            nodes: DashMap::new(),
        }
    }

    /// Insert `record` only if no entry exists for its `NodeId`. Returns
    /// `true` on a fresh insert, `false` if an entry already existed - the
    /// existing handle is returned either way so callers can branch on the
    /// reconnect logic.
    pub fn put_if_absent(&self, record: NodeRecord) -> (bool, RecordHandle) {
        match self.nodes.entry(record.node_id.clone()) {
            Entry::Vacant(entry) => {
                let handle = Arc::new(Mutex::new(record));
                entry.insert(Arc::clone(&handle));
                (true, handle)
            }
            Entry::Occupied(entry) => (false, Arc::clone(entry.get())),
        }
    }

    /// Unconditionally overwrite the entry for `record.node_id`, used by
    /// the reconnect "replace" path.
    pub fn replace(&self, record: NodeRecord) -> RecordHandle {
        let handle = Arc::new(Mutex::new(record.clone()));
        self.nodes.insert(record.node_id, Arc::clone(&handle));
        handle
    }

    pub fn get(&self, node_id: &NodeId) -> Option<RecordHandle> {
        self.nodes
            .get(node_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn remove(&self, node_id: &NodeId) -> Option<RecordHandle> {
        self.nodes.remove(node_id).map(|(_, handle)| handle)
    }

    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.nodes.contains_key(node_id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Snapshot clone of every record, for read-mostly enumeration (fleet
    /// stats, dead-node scans). No iteration order is guaranteed.
    pub async fn snapshot(&self) -> Vec<NodeRecord> {
        let handles: Vec<RecordHandle> = self
            .nodes
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        let mut out = Vec::with_capacity(handles.len());
        for handle in handles {
            out.push(handle.lock().await.clone());
        }
        out
    }
}
