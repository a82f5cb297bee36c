#![allow(dead_code)]

use std::net::SocketAddr;

use axum::Router;
use delivery_api::config::Config;
use delivery_api::gateway::server::{new_session, SessionGuard};
use delivery_api::gateway::session::OutboundFrame;
use delivery_api::AppState;
use tokio::sync::mpsc;

/// Build the full application [`Router`] for a node with default config.
pub fn test_app(node_id: &str) -> (Router, AppState) {
    let state = AppState::new(Config::with_node_id(node_id));
    let app = delivery_api::routes::router().with_state(state.clone());
    (app, state)
}

/// Start an actual TCP server for the node. The server runs in the background.
pub async fn start_server(config: Config) -> (SocketAddr, AppState) {
    let state = AppState::new(config);
    let app = delivery_api::routes::router().with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, state)
}

/// Register a session directly, bypassing the WebSocket upgrade.
pub fn register_session(
    state: &AppState,
    session_id: &str,
) -> (SessionGuard, mpsc::Receiver<OutboundFrame>) {
    new_session(&state.sessions, session_id.to_string(), 16).expect("register test session")
}
