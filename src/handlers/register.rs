//! Register: admits a node into the cluster, or reconnects one that is
//! already known under the same `NodeId`.

use std::net::IpAddr;

use metrics::counter;
use tracing::{info, instrument};

use crate::admission::admit_register;
use crate::events::NodeEvent;
use crate::types::{
    Action, ContainerState, NodeId, NodeRecord, NodeState, RegisterRequest, RegisterResponse,
};

use super::{join_diagnostics, Collaborators};

/// Drop the cluster-wide gauge counting nodes in `state`, mirroring the
/// per-node decrement the resource manager applies when a record is
/// replaced outright rather than updated in place.
fn decrement_state_gauge(state: NodeState) {
    match state {
        NodeState::Running => metrics::decrement_gauge!("nts_running_nodes", 1.0),
        NodeState::Decommissioning => metrics::decrement_gauge!("nts_decommissioning_nodes", 1.0),
        _ => {}
    }
}

#[instrument(skip(collaborators, request), fields(node_id = %request.node_id))]
pub async fn handle_register(
    collaborators: &Collaborators,
    request: RegisterRequest,
    remote_ip: Option<IpAddr>,
) -> RegisterResponse {
    let node_id = request.node_id.clone();
    let admission = collaborators.config.admission().await;
    let admission_lists = collaborators.admission_lists().await;

    let already_decommissioning = match collaborators.registry.get(&node_id) {
        Some(handle) => handle.lock().await.state == NodeState::Decommissioning,
        None => false,
    };

    if let Err(failure) = admit_register(
        &admission,
        &node_id.host,
        remote_ip,
        &request.nm_version,
        collaborators.host_resolver.as_ref(),
        &admission_lists,
        already_decommissioning,
        &request.capability,
    ) {
        info!(node_id = %node_id, reason = %failure, "register rejected by admission policy");
        counter!("nts_registrations_rejected_total", 1);
        return RegisterResponse {
            action: Action::Shutdown,
            diagnostics: Some(failure.to_string()),
            container_token_master_key: None,
            nm_token_master_key: None,
            resource: None,
            rm_identifier: collaborators.config.server.rm_identifier,
            rm_version: env!("CARGO_PKG_VERSION").to_string(),
            are_node_labels_accepted_by_rm: false,
            are_node_attributes_accepted_by_rm: false,
        };
    }

    let rack_path = collaborators.rack_resolver.resolve(&node_id.host);
    let existing = collaborators.registry.get(&node_id);

    let mut record = NodeRecord::new(
        node_id.clone(),
        request.http_port,
        rack_path,
        request.nm_version.clone(),
        request.capability.clone(),
        request.physical_capability.clone(),
    );
    record.running_app_ids = request.running_apps.iter().cloned().collect();
    record.state = NodeState::Running;

    if let Some(existing_handle) = existing {
        collaborators.liveness.unregister(&node_id);
        let previous = existing_handle.lock().await.clone();

        let is_replace = request.running_apps.is_empty()
            && previous.state != NodeState::Decommissioning
            && previous.http_port != request.http_port;

        if is_replace {
            decrement_state_gauge(previous.state);
            collaborators.events.handle(NodeEvent::NodeRemoved {
                record: Box::new(previous),
            });
            collaborators.registry.replace(record.clone());
            collaborators.events.handle(NodeEvent::NodeStarted {
                node_id: node_id.clone(),
                container_statuses: vec![],
                running_apps: vec![],
                node_status: request.node_status.clone(),
            });
            counter!("nts_registrations_total", 1);
        } else {
            let mut guard = existing_handle.lock().await;
            guard.http_port = record.http_port;
            guard.resolved_rack_path = record.resolved_rack_path.clone();
            guard.nm_version = record.nm_version.clone();
            guard.total_capability = record.total_capability.clone();
            guard.physical_capability = record.physical_capability.clone();
            guard.capability_overridden = false;
            guard.state = NodeState::Running;
            guard.running_app_ids = record.running_app_ids.clone();
            guard.last_response_id = 0;
            guard.last_response = None;
            let updated = guard.clone();
            drop(guard);
            collaborators.events.handle(NodeEvent::NodeReconnect {
                node_id: node_id.clone(),
                record: Box::new(updated),
                running_apps: request.running_apps.clone(),
                container_statuses: request.container_statuses.clone(),
            });
            counter!("nts_reconnects_total", 1);
        }
    } else {
        collaborators.registry.put_if_absent(record.clone());
        collaborators.events.handle(NodeEvent::NodeStarted {
            node_id: node_id.clone(),
            container_statuses: request.container_statuses.clone(),
            running_apps: request.running_apps.clone(),
            node_status: request.node_status.clone(),
        });
        counter!("nts_registrations_total", 1);
    }
    collaborators.nm_tokens.remove_node_key(&node_id);
    collaborators.liveness.register(&node_id);

    if !collaborators.config.work_preserving_recovery_enabled().await {
        for container in &request.container_statuses {
            if container.is_am_container && container.state == ContainerState::Complete {
                collaborators.events.handle(NodeEvent::ContainerFinished {
                    app_attempt_id: container.app_attempt_id.clone(),
                    container_id: container.container_id.clone(),
                });
            }
        }
    }

    let override_capability = collaborators.dynamic_resources.lookup(&node_id);
    let resource = if let Some(ref handle) = collaborators.registry.get(&node_id) {
        let mut guard = handle.lock().await;
        if let Some(ref cap) = override_capability {
            guard.total_capability = cap.clone();
            guard.capability_overridden = true;
        }
        guard.total_capability.clone()
    } else {
        record.total_capability.clone()
    };

    let label_mode = collaborators.config.label_mode().await;
    let label_outcome = crate::labels::propagate_labels(
        label_mode,
        &node_id,
        request.node_labels.as_deref(),
        collaborators.label_manager.as_ref(),
        collaborators.delegated_updater.as_ref(),
    );
    let attribute_outcome = crate::labels::propagate_attributes(
        &node_id,
        request.node_attributes.as_deref(),
        collaborators.attributes_manager.as_ref(),
    );

    RegisterResponse {
        action: Action::Normal,
        diagnostics: join_diagnostics(vec![
            label_outcome.diagnostic.clone(),
            attribute_outcome.diagnostic.clone(),
        ]),
        container_token_master_key: Some(collaborators.container_tokens.current_key()),
        nm_token_master_key: Some(collaborators.nm_tokens.current_key()),
        resource: Some(resource),
        rm_identifier: collaborators.config.server.rm_identifier,
        rm_version: env!("CARGO_PKG_VERSION").to_string(),
        are_node_labels_accepted_by_rm: label_outcome.accepted,
        are_node_attributes_accepted_by_rm: attribute_outcome.accepted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::AlwaysResolves;
    use crate::config::{ConfigManager, NtsConfig};
    use crate::decommission::DecommissionWatcher;
    use crate::dynamic_resources::DynamicResourceTable;
    use crate::events::RecordingEventDispatcher;
    use crate::labels::{InMemoryAttributesManager, InMemoryDelegatedUpdater, InMemoryLabelManager};
    use crate::liveness::LivenessMonitor;
    use crate::ports::{DefaultRackResolver, KeyStoreTokenManager};
    use crate::registry::NodeRegistry;
    use crate::types::{MasterKey, NodeStatusReport, ResourceCapability, StaticKeyStore};
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
    async fn test_fresh_register_accepted() {
        let (collaborators, _events) = make_collaborators();
        let id = NodeId::new("h1", 8041);
        let response = handle_register(&collaborators, register_request(id.clone()), None).await;
        assert_eq!(response.action, Action::Normal);
        assert!(collaborators.registry.contains(&id));
        assert!(response.container_token_master_key.is_some());
    }

    #[tokio::test]
    async fn test_reconnect_emits_reconnect_event_not_started() {
        let (collaborators, events) = make_collaborators();
        let id = NodeId::new("h1", 8041);
        handle_register(&collaborators, register_request(id.clone()), None).await;
        events.clear();
        handle_register(&collaborators, register_request(id.clone()), None).await;

        let recorded = events.events();
        assert_eq!(recorded.len(), 1);
        assert!(matches!(recorded[0], NodeEvent::NodeReconnect { .. }));
    }

    #[tokio::test]
    async fn test_reconnect_with_new_port_and_no_running_apps_replaces_record() {
        let (collaborators, events) = make_collaborators();
        let id = NodeId::new("h1", 8041);
        handle_register(&collaborators, register_request(id.clone()), None).await;
        events.clear();

        let mut second = register_request(id.clone());
        second.http_port = 9999;
        handle_register(&collaborators, second, None).await;

        let recorded = events.events();
        assert_eq!(recorded.len(), 2);
        assert!(matches!(recorded[0], NodeEvent::NodeRemoved { .. }));
        assert!(matches!(recorded[1], NodeEvent::NodeStarted { .. }));

        let handle = collaborators.registry.get(&id).unwrap();
        assert_eq!(handle.lock().await.http_port, 9999);
    }

    #[tokio::test]
    async fn test_version_floor_rejects_register() {
        let mut config = NtsConfig::default();
        config.dynamic.admission.min_version = "99.0.0".to_string();
        let (mut collaborators, _events) = make_collaborators();
        collaborators.config = Arc::new(ConfigManager::new(config));

        let id = NodeId::new("h1", 8041);
        let response = handle_register(&collaborators, register_request(id.clone()), None).await;
        assert_eq!(response.action, Action::Shutdown);
        assert!(!collaborators.registry.contains(&id));
    }

    #[tokio::test]
    async fn test_dynamic_resource_override_reflected_in_response() {
        let (collaborators, _events) = make_collaborators();
        let id = NodeId::new("h1", 8041);
        collaborators
            .dynamic_resources
            .update(vec![crate::types::DynamicResourceEntry {
                node_id: id.clone(),
                memory_mb: 65536,
                vcores: 32,
            }]);

        let response = handle_register(&collaborators, register_request(id.clone()), None).await;
        let resource = response.resource.unwrap();
        assert_eq!(resource.memory_mb, 65536);
        assert_eq!(resource.vcores, 32);
    }
}
