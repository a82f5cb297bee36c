pub mod health;
pub mod nodes;

use axum::Router;
use utoipa::OpenApi;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/api/v1", nodes::router())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        nodes::register_node,
        nodes::heartbeat,
        nodes::deregister_node,
        nodes::list_nodes,
    ),
    components(
        schemas(
            health::HealthResponse,
            nodes::NodeResponse,
            nodes::RegisterNodeResponse,
            crate::routing::JoinOutcome,
            relay_common::NodeRegistration,
            relay_common::NodeHeartbeat,
            crate::error::ApiErrorBody,
            crate::error::ApiErrorDetail,
            crate::error::FieldError,
        )
    ),
    tags(
        (name = "Health", description = "Health check"),
        (name = "Nodes", description = "Delivery node discovery"),
    )
)]
pub struct ApiDoc;
