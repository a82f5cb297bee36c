use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use relay_common::{NodeHeartbeat, NodeRegistration};
use serde::Serialize;
use utoipa::ToSchema;

use crate::config::is_http_address;
use crate::error::{ApiError, ApiErrorBody, FieldError};
use crate::routing::JoinOutcome;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/nodes/register", post(register_node))
        .route("/nodes/heartbeat", post(heartbeat))
        .route("/nodes", get(list_nodes))
        .route("/nodes/{node_id}", delete(deregister_node))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NodeResponse {
    pub node_id: String,
    pub address: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterNodeResponse {
    pub node_id: String,
    pub address: String,
    pub outcome: JoinOutcome,
}

// =========================================================================
// POST /api/v1/nodes/register
// =========================================================================

/// `POST /api/v1/nodes/register`: join or re-join a delivery node.
#[utoipa::path(
    post,
    path = "/api/v1/nodes/register",
    tag = "Nodes",
    request_body = NodeRegistration,
    responses(
        (status = 201, description = "Node added", body = RegisterNodeResponse),
        (status = 200, description = "Node renewed or moved", body = RegisterNodeResponse),
        (status = 400, description = "Validation error", body = ApiErrorBody),
    ),
)]
pub async fn register_node(
    State(state): State<AppState>,
    Json(body): Json<NodeRegistration>,
) -> Result<(StatusCode, Json<RegisterNodeResponse>), ApiError> {
    let mut errors: Vec<FieldError> = Vec::new();

    let node_id = body.node_id.trim().to_string();
    if node_id.is_empty() || node_id.len() > 128 {
        errors.push(FieldError {
            field: "node_id".into(),
            message: "node_id must be 1-128 characters".into(),
        });
    }

    let address = body.address.trim().trim_end_matches('/').to_string();
    if address.is_empty() {
        errors.push(FieldError {
            field: "address".into(),
            message: "address is required".into(),
        });
    } else if !is_http_address(&address) {
        errors.push(FieldError {
            field: "address".into(),
            message: "address must start with http:// or https://".into(),
        });
    }

    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    let outcome = state.discovery.join(&node_id, &address);
    let status = match outcome {
        JoinOutcome::Added => StatusCode::CREATED,
        JoinOutcome::Replaced | JoinOutcome::Renewed => StatusCode::OK,
    };

    Ok((
        status,
        Json(RegisterNodeResponse {
            node_id,
            address,
            outcome,
        }),
    ))
}

// =========================================================================
// POST /api/v1/nodes/heartbeat
// =========================================================================

/// `POST /api/v1/nodes/heartbeat`: renew a node's lease.
#[utoipa::path(
    post,
    path = "/api/v1/nodes/heartbeat",
    tag = "Nodes",
    request_body = NodeHeartbeat,
    responses(
        (status = 204, description = "Lease renewed"),
        (status = 404, description = "Unknown node; it must register again", body = ApiErrorBody),
    ),
)]
pub async fn heartbeat(
    State(state): State<AppState>,
    Json(body): Json<NodeHeartbeat>,
) -> Result<StatusCode, ApiError> {
    if !state.discovery.renew(body.node_id.trim()) {
        return Err(ApiError::not_found("Delivery node not registered"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// DELETE /api/v1/nodes/{node_id}
// =========================================================================

/// `DELETE /api/v1/nodes/{node_id}`: remove a node from routing.
#[utoipa::path(
    delete,
    path = "/api/v1/nodes/{node_id}",
    tag = "Nodes",
    params(("node_id" = String, Path, description = "Delivery node ID")),
    responses(
        (status = 204, description = "Node removed"),
        (status = 404, description = "Unknown node", body = ApiErrorBody),
    ),
)]
pub async fn deregister_node(
    State(state): State<AppState>,
    Path(node_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if !state.discovery.leave(node_id.trim()) {
        return Err(ApiError::not_found("Delivery node not registered"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// GET /api/v1/nodes
// =========================================================================

/// `GET /api/v1/nodes`: current routing snapshot, ordered by node ID.
#[utoipa::path(
    get,
    path = "/api/v1/nodes",
    tag = "Nodes",
    responses(
        (status = 200, description = "Routable delivery nodes", body = Vec<NodeResponse>),
    ),
)]
pub async fn list_nodes(State(state): State<AppState>) -> Json<Vec<NodeResponse>> {
    let nodes = state
        .routes
        .resolve_all()
        .iter()
        .map(|entry| NodeResponse {
            node_id: entry.node_id.clone(),
            address: entry.address.clone(),
        })
        .collect();
    Json(nodes)
}
