//! Decommission Watcher: a state-machine adapter over
//! `NodeRecord.state`. NTS calls `update` on every heartbeat and
//! `ready_to_decommission` only while the record is `Decommissioning`.
//! "Ready" means no containers of interest (here: no running containers
//! belonging to the node) remain, per configured policy.

use dashmap::DashMap;

use crate::types::{NodeId, NodeStatusReport};

#[derive(Debug, Clone, Copy, Default)]
struct DecommissionState {
    running_containers_of_interest: u32,
}

#[derive(Debug, Default)]
pub struct DecommissionWatcher {
    states: DashMap<NodeId, DecommissionState>,
}

impl DecommissionWatcher {
    pub fn new() -> Self {
        Self {
            states: DashMap::new(),
        }
    }

    /// Record the latest heartbeat's view of how many containers of
    /// interest the node is still running.
    pub fn update(&self, node_id: &NodeId, status: &NodeStatusReport) {
        let running = status
            .containers
            .iter()
            .filter(|c| c.state == crate::types::ContainerState::Running)
            .count() as u32;
        self.states.insert(
            node_id.clone(),
            DecommissionState {
                running_containers_of_interest: running,
            },
        );
    }

    /// Whether the node has drained enough to be safely decommissioned.
    /// A node with no tracked state (never heartbeated since entering
    /// DECOMMISSIONING) is not considered ready.
    pub fn check_ready_to_be_decommissioned(&self, node_id: &NodeId) -> bool {
        self.states
            .get(node_id)
            .map(|s| s.running_containers_of_interest == 0)
            .unwrap_or(false)
    }

    pub fn forget(&self, node_id: &NodeId) {
        self.states.remove(node_id);
    }
}
