//! Event Publisher: a fire-and-forget sink fed by every request handler.
//! Kept coroutine-free - no promise chains, a single-producer/
//! multi-consumer queue with fan-out is sufficient.

mod memory;
mod nats;

pub use memory::RecordingEventDispatcher;
pub use nats::NatsEventDispatcher;

use serde::Serialize;

use crate::types::{ContainerStatus, NodeId, NodeRecord, NodeStatusReport};

/// Every event NTS can publish, enumerated exhaustively.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum NodeEvent {
    NodeStarted {
        node_id: NodeId,
        container_statuses: Vec<ContainerStatus>,
        running_apps: Vec<String>,
        node_status: NodeStatusReport,
    },
    NodeReconnect {
        node_id: NodeId,
        record: Box<NodeRecord>,
        running_apps: Vec<String>,
        container_statuses: Vec<ContainerStatus>,
    },
    NodeStatus {
        node_id: NodeId,
        status: NodeStatusReport,
    },
    /// Covers `REBOOTING | DECOMMISSION | SHUTDOWN` - distinguished by
    /// `kind` rather than three enum variants, since they share one
    /// event family.
    NodeStatusEvent {
        node_id: NodeId,
        kind: NodeEventKind,
    },
    NodeRemoved {
        record: Box<NodeRecord>,
    },
    ContainerFinished {
        app_attempt_id: String,
        container_id: String,
    },
    /// Fired by the Liveness Monitor, not by a request handler.
    Expire {
        node_id: NodeId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeEventKind {
    Rebooting,
    Decommission,
    Shutdown,
}

/// Fire-and-forget sink port. Implementations must never panic into the
/// calling handler - failures are swallowed at this boundary; durability
/// is the concrete dispatcher's concern.
pub trait EventDispatcher: Send + Sync {
    fn handle(&self, event: NodeEvent);
}
