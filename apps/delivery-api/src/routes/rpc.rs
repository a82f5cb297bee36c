//! Delivery endpoint RPC surface called by the dispatch tier.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use relay_common::{BroadcastRequest, DeliveryAck, PushRequest};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/rpc/push", post(push))
        .route("/rpc/broadcast", post(broadcast))
}

// ---------------------------------------------------------------------------
// POST /rpc/push
// ---------------------------------------------------------------------------

/// `POST /rpc/push`: deliver a payload to specific local sessions.
///
/// Sessions that are no longer registered are skipped, not reported as errors.
#[utoipa::path(
    post,
    path = "/rpc/push",
    tag = "Delivery",
    request_body = PushRequest,
    responses(
        (status = 200, description = "Every listed session was attempted", body = DeliveryAck),
    ),
)]
pub async fn push(State(state): State<AppState>, Json(req): Json<PushRequest>) -> Json<DeliveryAck> {
    Json(
        state
            .endpoint
            .push(req.operation, &req.session_ids, req.payload),
    )
}

// ---------------------------------------------------------------------------
// POST /rpc/broadcast
// ---------------------------------------------------------------------------

/// `POST /rpc/broadcast`: deliver a payload to the listed sessions, or to
/// every local session when `session_ids` is empty.
#[utoipa::path(
    post,
    path = "/rpc/broadcast",
    tag = "Delivery",
    request_body = BroadcastRequest,
    responses(
        (status = 200, description = "Every addressed session was attempted", body = DeliveryAck),
    ),
)]
pub async fn broadcast(
    State(state): State<AppState>,
    Json(req): Json<BroadcastRequest>,
) -> Json<DeliveryAck> {
    Json(state.endpoint.broadcast(&req.session_ids, req.payload))
}
