//! HTTP transport: the three node-facing RPCs, read-only fleet
//! introspection, and admin hot-reload endpoints, wired as one flat
//! `Router` with CORS + tracing layers and a single cloneable state.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use metrics::{counter, gauge};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::instrument;

use crate::config::AdmissionLists;
use crate::handlers::{handle_heartbeat, handle_register, handle_unregister, Collaborators};
use crate::types::{
    DynamicResourceEntry, HeartbeatPacing, HeartbeatRequest, NodeId, NodeRecord, RegisterRequest,
    UnregisterRequest,
};

pub fn build_router(collaborators: Collaborators) -> Router {
    Router::new()
        .route("/api/v1/nodes/register", post(register))
        .route("/api/v1/nodes/heartbeat", post(heartbeat))
        .route("/api/v1/nodes/unregister", post(unregister))
        .route("/api/v1/nodes", get(list_nodes))
        .route("/api/v1/nodes/:node_id", get(get_node))
        .route("/api/v1/fleet/stats", get(fleet_stats))
        .route("/api/v1/health", get(health))
        .route(
            "/api/v1/admin/dynamic-resources",
            post(update_dynamic_resources),
        )
        .route("/api/v1/admin/heartbeat-pacing", post(update_heartbeat_pacing))
        .route("/api/v1/admin/admission-lists", post(update_admission_lists))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(collaborators))
}

#[instrument(skip(state, request))]
async fn register(
    State(state): State<Arc<Collaborators>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(request): Json<RegisterRequest>,
) -> Json<crate::types::RegisterResponse> {
    let response = handle_register(&state, request, Some(addr.ip())).await;
    Json(response)
}

#[instrument(skip(state, request))]
async fn heartbeat(
    State(state): State<Arc<Collaborators>>,
    Json(request): Json<HeartbeatRequest>,
) -> Json<crate::types::HeartbeatResponse> {
    counter!("nts_heartbeats_total", 1);
    let response = handle_heartbeat(&state, request).await;
    Json(response)
}

#[instrument(skip(state, request))]
async fn unregister(
    State(state): State<Arc<Collaborators>>,
    Json(request): Json<UnregisterRequest>,
) -> Json<crate::types::UnregisterResponse> {
    counter!("nts_nodes_unregistered_total", 1);
    let response = handle_unregister(&state, request).await;
    Json(response)
}

async fn list_nodes(State(state): State<Arc<Collaborators>>) -> Json<Vec<NodeRecord>> {
    Json(state.registry.snapshot().await)
}

fn parse_node_id(raw: &str) -> Option<NodeId> {
    let (host, port) = raw.rsplit_once(':')?;
    let port: u32 = port.parse().ok()?;
    Some(NodeId::new(host.to_string(), port))
}

async fn get_node(
    State(state): State<Arc<Collaborators>>,
    Path(raw_node_id): Path<String>,
) -> Result<Json<NodeRecord>, StatusCode> {
    let node_id = parse_node_id(&raw_node_id).ok_or(StatusCode::BAD_REQUEST)?;
    let handle = state.registry.get(&node_id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(handle.lock().await.clone()))
}

#[derive(Debug, Serialize)]
struct FleetStats {
    total_nodes: usize,
    running_nodes: usize,
    decommissioning_nodes: usize,
    unhealthy_nodes: usize,
}

async fn fleet_stats(State(state): State<Arc<Collaborators>>) -> Json<FleetStats> {
    let snapshot = state.registry.snapshot().await;
    let stats = FleetStats {
        total_nodes: snapshot.len(),
        running_nodes: snapshot
            .iter()
            .filter(|n| n.state == crate::types::NodeState::Running)
            .count(),
        decommissioning_nodes: snapshot
            .iter()
            .filter(|n| n.state == crate::types::NodeState::Decommissioning)
            .count(),
        unhealthy_nodes: snapshot
            .iter()
            .filter(|n| n.state == crate::types::NodeState::Unhealthy)
            .count(),
    };
    gauge!("nts_registered_nodes", stats.total_nodes as f64);
    gauge!("nts_running_nodes", stats.running_nodes as f64);
    gauge!("nts_decommissioning_nodes", stats.decommissioning_nodes as f64);
    Json(stats)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn update_dynamic_resources(
    State(state): State<Arc<Collaborators>>,
    Json(entries): Json<Vec<DynamicResourceEntry>>,
) -> StatusCode {
    state.dynamic_resources.update(entries);
    StatusCode::NO_CONTENT
}

async fn update_heartbeat_pacing(
    State(state): State<Arc<Collaborators>>,
    Json(pacing): Json<HeartbeatPacing>,
) -> StatusCode {
    state.config.update_pacing(pacing).await;
    StatusCode::NO_CONTENT
}

async fn update_admission_lists(
    State(state): State<Arc<Collaborators>>,
    Json(lists): Json<AdmissionLists>,
) -> StatusCode {
    state.config.update_admission_lists(lists).await;
    StatusCode::NO_CONTENT
}
