//! Unregister: a node leaving the cluster voluntarily (clean shutdown,
//! not expiry). Idempotent - unregistering an unknown node is not an
//! error.

use metrics::counter;
use tracing::{info, instrument};

use crate::events::{NodeEvent, NodeEventKind};
use crate::types::{UnregisterRequest, UnregisterResponse};

use super::Collaborators;

#[instrument(skip(collaborators, request), fields(node_id = %request.node_id))]
pub async fn handle_unregister(
    collaborators: &Collaborators,
    request: UnregisterRequest,
) -> UnregisterResponse {
    let node_id = request.node_id;

    if collaborators.registry.remove(&node_id).is_some() {
        collaborators.liveness.unregister(&node_id);
        collaborators.decommission.forget(&node_id);
        info!(node_id = %node_id, "node unregistered");
        counter!("nts_nodes_unregistered_total", 1);
        collaborators.events.handle(NodeEvent::NodeStatusEvent {
            node_id: node_id.clone(),
            kind: NodeEventKind::Shutdown,
        });
    }

    UnregisterResponse::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::AlwaysResolves;
    use crate::config::{ConfigManager, NtsConfig};
    use crate::decommission::DecommissionWatcher;
    use crate::dynamic_resources::DynamicResourceTable;
    use crate::events::RecordingEventDispatcher;
    use crate::handlers::register::handle_register;
    use crate::labels::{InMemoryAttributesManager, InMemoryDelegatedUpdater, InMemoryLabelManager};
    use crate::liveness::LivenessMonitor;
    use crate::ports::{DefaultRackResolver, KeyStoreTokenManager};
    use crate::registry::NodeRegistry;
    use crate::types::{
        MasterKey, NodeId, NodeStatusReport, RegisterRequest, ResourceCapability, StaticKeyStore,
    };
    use std::sync::Arc;
    use std::time::Duration;

    fn make_collaborators() -> (Collaborators, Arc<RecordingEventDispatcher>) {
        let key_store = StaticKeyStore::new(MasterKey::new(1, vec![0xaa]));
        let token_manager = Arc::new(KeyStoreTokenManager::new(key_store));
        let dispatcher = Arc::new(RecordingEventDispatcher::new());
        let collaborators = Collaborators {
            registry: Arc::new(NodeRegistry::new()),
            liveness: Arc::new(LivenessMonitor::new(Duration::from_secs(60))),
            decommission: Arc::new(DecommissionWatcher::new()),
            dynamic_resources: Arc::new(DynamicResourceTable::new()),
            config: Arc::new(ConfigManager::new(NtsConfig::default())),
            events: dispatcher.clone(),
            container_tokens: token_manager.clone(),
            nm_tokens: token_manager,
            rack_resolver: Arc::new(DefaultRackResolver),
            host_resolver: Arc::new(AlwaysResolves),
            label_manager: Arc::new(InMemoryLabelManager::new()),
            delegated_updater: Arc::new(InMemoryDelegatedUpdater::new()),
            attributes_manager: Arc::new(InMemoryAttributesManager::new()),
        };
        (collaborators, dispatcher)
    }

    fn register_request(node_id: NodeId) -> RegisterRequest {
        RegisterRequest {
            node_id: node_id.clone(),
            http_port: 8042,
            capability: ResourceCapability::new(8192, 4),
            physical_capability: ResourceCapability::new(8192, 4),
            nm_version: "3.4.0".to_string(),
            node_status: NodeStatusReport {
                node_id,
                response_id: 0,
                containers: vec![],
                healthy: true,
                pending_container_updates: 0,
            },
            container_statuses: vec![],
            running_apps: vec![],
            node_labels: None,
            node_attributes: None,
            log_aggregation_reports: None,
        }
    }

    #[tokio::test]
    async fn test_unregister_removes_node_and_emits_shutdown_event() {
        let (collaborators, events) = make_collaborators();
        let id = NodeId::new("h1", 8041);
        handle_register(&collaborators, register_request(id.clone()), None).await;
        events.clear();

        handle_unregister(&collaborators, UnregisterRequest { node_id: id.clone() }).await;

        assert!(!collaborators.registry.contains(&id));
        assert!(events.events().iter().any(|e| matches!(
            e,
            NodeEvent::NodeStatusEvent {
                kind: NodeEventKind::Shutdown,
                ..
            }
        )));
    }

    #[tokio::test]
    async fn test_unregister_unknown_node_is_a_no_op() {
        let (collaborators, events) = make_collaborators();
        let id = NodeId::new("h1", 8041);
        handle_unregister(&collaborators, UnregisterRequest { node_id: id }).await;
        assert!(events.is_empty());
    }
}
