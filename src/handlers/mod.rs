//! Request orchestration for the three RPCs the node tracker service
//! exposes (Register, Heartbeat, Unregister). Each handler is a plain
//! async function over a [`Collaborators`] bundle so it can be driven
//! directly in tests without standing up the HTTP transport.

mod heartbeat;
mod register;
mod unregister;

pub use heartbeat::handle_heartbeat;
pub use register::handle_register;
pub use unregister::handle_unregister;

use std::sync::Arc;

use crate::admission::{AdmissionListManager, HostResolver};
use crate::config::ConfigManager;
use crate::decommission::DecommissionWatcher;
use crate::dynamic_resources::DynamicResourceTable;
use crate::events::EventDispatcher;
use crate::labels::{DelegatedNodeLabelsUpdater, NodeAttributesManager, NodeLabelManager};
use crate::liveness::LivenessMonitor;
use crate::ports::{ContainerTokenSecretManager, NMTokenSecretManager, RackResolver};
use crate::registry::NodeRegistry;

/// Every collaborator a handler needs (fleet registry, event bus,
/// metrics), grouped behind one `Arc`-cloneable handle shared by every
/// axum route.
#[derive(Clone)]
pub struct Collaborators {
    pub registry: Arc<NodeRegistry>,
    pub liveness: Arc<LivenessMonitor>,
    pub decommission: Arc<DecommissionWatcher>,
    pub dynamic_resources: Arc<DynamicResourceTable>,
    pub config: Arc<ConfigManager>,
    pub events: Arc<dyn EventDispatcher>,
    pub container_tokens: Arc<dyn ContainerTokenSecretManager>,
    pub nm_tokens: Arc<dyn NMTokenSecretManager>,
    pub rack_resolver: Arc<dyn RackResolver>,
    pub host_resolver: Arc<dyn HostResolver>,
    pub label_manager: Arc<dyn NodeLabelManager>,
    pub delegated_updater: Arc<dyn DelegatedNodeLabelsUpdater>,
    pub attributes_manager: Arc<dyn NodeAttributesManager>,
}

impl Collaborators {
    pub async fn admission_lists(&self) -> AdmissionListManager {
        let lists = self.config.admission_lists().await;
        AdmissionListManager::new(lists.include, lists.exclude)
    }
}

/// Fold per-field diagnostics produced along the way (admission, label and
/// attribute propagation) into the single free-text diagnostics string the
/// wire responses carry.
pub(crate) fn join_diagnostics(parts: Vec<Option<String>>) -> Option<String> {
    let joined = parts
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("; ");
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}
