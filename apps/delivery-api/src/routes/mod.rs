pub mod health;
pub mod rpc;

use axum::Router;
use utoipa::OpenApi;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(rpc::router())
        .merge(crate::gateway::server::router())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        rpc::push,
        rpc::broadcast,
    ),
    components(
        schemas(
            health::HealthResponse,
            relay_common::PushRequest,
            relay_common::BroadcastRequest,
            relay_common::DeliveryAck,
        )
    ),
    tags(
        (name = "Health", description = "Health check"),
        (name = "Delivery", description = "Delivery endpoint called by the dispatch tier"),
    )
)]
pub struct ApiDoc;
