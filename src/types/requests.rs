use serde::{Deserialize, Serialize};

use super::{MasterKey, NodeId, ResourceCapability};

/// The agent's sole control channel: what it should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Normal,
    Shutdown,
    Resync,
}

/// Status of a single container as reported by the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerStatus {
    pub container_id: String,
    pub app_attempt_id: String,
    pub state: ContainerState,
    /// Set when this container is the AM master container for its app
    /// attempt - used to synthesize `ContainerFinished` events.
    #[serde(default)]
    pub is_am_container: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContainerState {
    Running,
    Complete,
}

/// Minimal per-heartbeat node status payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeStatusReport {
    pub node_id: NodeId,
    pub response_id: u32,
    #[serde(default)]
    pub containers: Vec<ContainerStatus>,
    #[serde(default)]
    pub healthy: bool,
    /// Signal feeding the pacing controller: containers added/updated
    /// since the previous heartbeat.
    #[serde(default)]
    pub pending_container_updates: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogAggregationReport {
    pub app_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppCollectorData {
    pub app_id: String,
    pub collector_addr: String,
    #[serde(default)]
    pub stamp: Option<CollectorStamp>,
}

/// `(clusterEpoch, monotonically increasing version)` stamp applied to
/// unstamped collector registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorStamp {
    pub cluster_epoch: i64,
    pub version: u64,
}

// ---------------------------------------------------------------------
// Register
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub node_id: NodeId,
    pub http_port: u32,
    pub capability: ResourceCapability,
    pub physical_capability: ResourceCapability,
    pub nm_version: String,
    pub node_status: NodeStatusReport,
    #[serde(default)]
    pub container_statuses: Vec<ContainerStatus>,
    #[serde(default)]
    pub running_apps: Vec<String>,
    #[serde(default)]
    pub node_labels: Option<Vec<String>>,
    #[serde(default)]
    pub node_attributes: Option<Vec<NodeAttribute>>,
    #[serde(default)]
    pub log_aggregation_reports: Option<Vec<LogAggregationReport>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAttribute {
    pub prefix: String,
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub action: Action,
    #[serde(default)]
    pub diagnostics: Option<String>,
    #[serde(default)]
    pub container_token_master_key: Option<MasterKey>,
    #[serde(default)]
    pub nm_token_master_key: Option<MasterKey>,
    #[serde(default)]
    pub resource: Option<ResourceCapability>,
    pub rm_identifier: i64,
    pub rm_version: String,
    pub are_node_labels_accepted_by_rm: bool,
    pub are_node_attributes_accepted_by_rm: bool,
}

// ---------------------------------------------------------------------
// Heartbeat
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    pub node_status: NodeStatusReport,
    #[serde(default)]
    pub node_labels: Option<Vec<String>>,
    #[serde(default)]
    pub node_attributes: Option<Vec<NodeAttribute>>,
    #[serde(default)]
    pub registering_collectors: Option<Vec<AppCollectorData>>,
    #[serde(default)]
    pub last_known_container_token_master_key_id: Option<i32>,
    #[serde(default)]
    pub last_known_nm_token_master_key_id: Option<i32>,
    #[serde(default)]
    pub token_sequence_no: u64,
    #[serde(default)]
    pub log_aggregation_reports: Option<Vec<LogAggregationReport>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartbeatResponse {
    pub response_id: u32,
    pub action: Action,
    #[serde(default)]
    pub diagnostics: Option<String>,
    #[serde(default)]
    pub container_token_master_key: Option<MasterKey>,
    #[serde(default)]
    pub nm_token_master_key: Option<MasterKey>,
    #[serde(default)]
    pub resource: Option<ResourceCapability>,
    pub next_heartbeat_interval_ms: u64,
    #[serde(default)]
    pub container_queuing_limit: Option<u32>,
    #[serde(default)]
    pub app_collectors: Option<Vec<AppCollectorData>>,
    #[serde(default)]
    pub system_credentials_for_apps: Option<Vec<AppCredential>>,
    pub token_sequence_no: u64,
    pub are_node_labels_accepted_by_rm: bool,
    pub are_node_attributes_accepted_by_rm: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppCredential {
    pub app_id: String,
    #[serde(with = "super::keys::hex_bytes")]
    pub credential_bytes: Vec<u8>,
}

// ---------------------------------------------------------------------
// Unregister
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnregisterRequest {
    pub node_id: NodeId,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnregisterResponse {}
