//! Wire and registry data types for the node tracker service.

mod capability;
mod keys;
mod node_id;
mod node_record;
mod pacing;
mod requests;

pub use capability::{DynamicResourceEntry, ResourceCapability};
pub use keys::{KeyStore, MasterKey, StaticKeyStore};
pub use node_id::NodeId;
pub use node_record::{NodeRecord, NodeState, RESPONSE_ID_MASK};
pub use pacing::{HeartbeatPacing, DEFAULT_HEARTBEAT_INTERVAL_MS};
pub use requests::{
    Action, AppCollectorData, AppCredential, CollectorStamp, ContainerState, ContainerStatus,
    HeartbeatRequest, HeartbeatResponse, LogAggregationReport, NodeAttribute, NodeStatusReport,
    RegisterRequest, RegisterResponse, UnregisterRequest, UnregisterResponse,
};
