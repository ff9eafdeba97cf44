//! Heartbeat: the per-node periodic check-in. Handles the duplicate
//! and out-of-sync response-id cases before doing any further work, then
//! runs admission, decommission-drain, label/attribute and pacing logic
//! against the locked record.

use metrics::counter;
use tracing::{info, instrument, warn};

use crate::admission::admit_heartbeat;
use crate::events::{NodeEvent, NodeEventKind};
use crate::pacing::{calculate_next_interval, PacingSignal};
use crate::types::{
    Action, ContainerState, HeartbeatRequest, HeartbeatResponse, NodeState, RESPONSE_ID_MASK,
};

use super::{join_diagnostics, Collaborators};

fn resync_response(diagnostic: impl Into<String>) -> HeartbeatResponse {
    HeartbeatResponse {
        response_id: 0,
        action: Action::Resync,
        diagnostics: Some(diagnostic.into()),
        container_token_master_key: None,
        nm_token_master_key: None,
        resource: None,
        next_heartbeat_interval_ms: crate::types::DEFAULT_HEARTBEAT_INTERVAL_MS,
        container_queuing_limit: None,
        app_collectors: None,
        system_credentials_for_apps: None,
        token_sequence_no: 0,
        are_node_labels_accepted_by_rm: false,
        are_node_attributes_accepted_by_rm: false,
    }
}

#[instrument(skip(collaborators, request), fields(node_id = %request.node_status.node_id))]
pub async fn handle_heartbeat(collaborators: &Collaborators, request: HeartbeatRequest) -> HeartbeatResponse {
    let node_id = request.node_status.node_id.clone();

    let Some(handle) = collaborators.registry.get(&node_id) else {
        warn!(node_id = %node_id, "heartbeat from unknown node, requesting resync");
        counter!("nts_heartbeats_unknown_node_total", 1);
        return resync_response("node is unknown to the resource manager, re-register");
    };

    let mut record = handle.lock().await;

    let reported = request.node_status.response_id;
    let expected = record.last_response_id;
    let previous = expected.wrapping_sub(1) & RESPONSE_ID_MASK;

    if reported == previous {
        if let Some(cached) = record.last_response.clone() {
            info!(node_id = %node_id, "duplicate heartbeat detected, resending cached response");
            counter!("nts_heartbeats_duplicate_total", 1);
            return cached;
        }
        // No cached response yet (first heartbeat after register) - fall
        // through and process normally.
    } else if reported != expected {
        warn!(
            node_id = %node_id,
            reported, expected, "heartbeat response id out of sync, requesting resync"
        );
        counter!("nts_heartbeats_resync_total", 1);
        collaborators.events.handle(NodeEvent::NodeStatusEvent {
            node_id: node_id.clone(),
            kind: NodeEventKind::Rebooting,
        });
        return resync_response(format!(
            "response id out of sync: resource manager expected {expected}, got {reported}"
        ));
    }

    let admission_lists = collaborators.admission_lists().await;
    if let Err(failure) = admit_heartbeat(&node_id.host, &admission_lists, record.state) {
        info!(node_id = %node_id, reason = %failure, "node evicted by admission policy on heartbeat");
        record.state = NodeState::Shutdown;
        let response_id = record.advance_response_id();
        let response = HeartbeatResponse {
            response_id,
            action: Action::Shutdown,
            diagnostics: Some(failure.to_string()),
            container_token_master_key: None,
            nm_token_master_key: None,
            resource: None,
            next_heartbeat_interval_ms: crate::types::DEFAULT_HEARTBEAT_INTERVAL_MS,
            container_queuing_limit: None,
            app_collectors: None,
            system_credentials_for_apps: None,
            token_sequence_no: request.token_sequence_no,
            are_node_labels_accepted_by_rm: false,
            are_node_attributes_accepted_by_rm: false,
        };
        record.last_response = Some(response.clone());
        collaborators.liveness.unregister(&node_id);
        return response;
    }

    collaborators.liveness.received_ping(&node_id);
    record.touch_ping();

    collaborators
        .decommission
        .update(&node_id, &request.node_status);

    for container in &request.node_status.containers {
        if container.is_am_container && container.state == ContainerState::Complete {
            collaborators.events.handle(NodeEvent::ContainerFinished {
                app_attempt_id: container.app_attempt_id.clone(),
                container_id: container.container_id.clone(),
            });
        }
    }

    if record.state == NodeState::Decommissioning
        && collaborators
            .decommission
            .check_ready_to_be_decommissioned(&node_id)
    {
        record.state = NodeState::Decommissioned;
        counter!("nts_nodes_decommissioned_total", 1);
        collaborators.events.handle(NodeEvent::NodeStatusEvent {
            node_id: node_id.clone(),
            kind: NodeEventKind::Decommission,
        });
        let finished_record = record.clone();
        drop(record);
        collaborators.registry.remove(&node_id);
        collaborators.liveness.unregister(&node_id);
        collaborators.decommission.forget(&node_id);
        collaborators
            .events
            .handle(NodeEvent::NodeRemoved {
                record: Box::new(finished_record),
            });
        return HeartbeatResponse {
            response_id: expected,
            action: Action::Shutdown,
            diagnostics: Some("node fully decommissioned".to_string()),
            container_token_master_key: None,
            nm_token_master_key: None,
            resource: None,
            next_heartbeat_interval_ms: crate::types::DEFAULT_HEARTBEAT_INTERVAL_MS,
            container_queuing_limit: None,
            app_collectors: None,
            system_credentials_for_apps: None,
            token_sequence_no: request.token_sequence_no,
            are_node_labels_accepted_by_rm: false,
            are_node_attributes_accepted_by_rm: false,
        };
    }

    if let Some(cap) = collaborators.dynamic_resources.lookup(&node_id) {
        if cap != record.total_capability {
            record.total_capability = cap;
            record.capability_overridden = true;
            record.updated_capability_pending = true;
        }
    }
    let resource_pending = record.updated_capability_pending;
    if resource_pending {
        record.updated_capability_pending = false;
    }

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

    collaborators
        .events
        .handle(NodeEvent::NodeStatus {
            node_id: node_id.clone(),
            status: request.node_status.clone(),
        });

    let pacing = collaborators.config.pacing().await;
    let signal = PacingSignal {
        pending_container_updates: request.node_status.pending_container_updates,
        idle_ticks: if request.node_status.pending_container_updates == 0 {
            1
        } else {
            0
        },
    };
    let next_interval = calculate_next_interval(&pacing, signal);

    let container_token_master_key = request
        .last_known_container_token_master_key_id
        .filter(|id| collaborators.container_tokens.is_known_key_id(*id))
        .is_none()
        .then(|| collaborators.container_tokens.current_key());
    let nm_token_master_key = request
        .last_known_nm_token_master_key_id
        .filter(|id| collaborators.nm_tokens.is_known_key_id(*id))
        .is_none()
        .then(|| collaborators.nm_tokens.current_key());

    let response_id = record.advance_response_id();
    let response = HeartbeatResponse {
        response_id,
        action: Action::Normal,
        diagnostics: join_diagnostics(vec![
            label_outcome.diagnostic.clone(),
            attribute_outcome.diagnostic.clone(),
        ]),
        container_token_master_key,
        nm_token_master_key,
        resource: if resource_pending {
            Some(record.total_capability.clone())
        } else {
            None
        },
        next_heartbeat_interval_ms: next_interval.as_millis() as u64,
        container_queuing_limit: None,
        app_collectors: request.registering_collectors.clone(),
        system_credentials_for_apps: None,
        token_sequence_no: request.token_sequence_no,
        are_node_labels_accepted_by_rm: label_outcome.accepted,
        are_node_attributes_accepted_by_rm: attribute_outcome.accepted,
    };
    record.last_response = Some(response.clone());
    response
}
