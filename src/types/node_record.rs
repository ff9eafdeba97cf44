use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;

use super::{HeartbeatResponse, NodeId, ResourceCapability};

/// Node lifecycle state. Initial state is `New`; the three terminal
/// states must be removed from the registry before any new record with the
/// same `NodeId` is inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeState {
    New,
    Running,
    Unhealthy,
    Decommissioning,
    Decommissioned,
    Lost,
    Rebooted,
    Shutdown,
}

impl NodeState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            NodeState::Decommissioned | NodeState::Lost | NodeState::Shutdown
        )
    }
}

/// The registry entry for one node agent.
///
/// `lastResponseId` advances by exactly one on every successful heartbeat,
/// wrapping via `(x + 1) & 0x7fff_ffff`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub node_id: NodeId,
    pub http_port: u32,
    pub resolved_rack_path: String,
    pub nm_version: String,

    pub total_capability: ResourceCapability,
    pub physical_capability: ResourceCapability,
    pub capability_overridden: bool,

    pub state: NodeState,

    pub last_response_id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_response: Option<HeartbeatResponse>,
    #[serde(skip, default = "Instant::now")]
    pub last_ping_at: Instant,
    pub updated_capability_pending: bool,

    pub running_app_ids: HashSet<String>,
}

/// 31-bit response-id mask.
pub const RESPONSE_ID_MASK: u32 = 0x7fff_ffff;

impl NodeRecord {
    pub fn new(
        node_id: NodeId,
        http_port: u32,
        resolved_rack_path: String,
        nm_version: String,
        total_capability: ResourceCapability,
        physical_capability: ResourceCapability,
    ) -> Self {
        Self {
            node_id,
            http_port,
            resolved_rack_path,
            nm_version,
            total_capability,
            physical_capability,
            capability_overridden: false,
            state: NodeState::New,
            last_response_id: 0,
            last_response: None,
            last_ping_at: Instant::now(),
            updated_capability_pending: false,
            running_app_ids: HashSet::new(),
        }
    }

    /// Advance the response id by one, wrapping at the 31-bit boundary.
    pub fn advance_response_id(&mut self) -> u32 {
        self.last_response_id = (self.last_response_id + 1) & RESPONSE_ID_MASK;
        self.last_response_id
    }

    pub fn touch_ping(&mut self) {
        self.last_ping_at = Instant::now();
    }
}
