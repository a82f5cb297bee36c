#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use dispatch_api::client::HttpClientFactory;
use dispatch_api::config::Config;
use dispatch_api::AppState;
use parking_lot::Mutex;

pub const RPC_TIMEOUT: Duration = Duration::from_millis(500);

/// Build the dispatch [`Router`] with an HTTP client factory and no seeds.
pub fn test_app() -> (Router, AppState) {
    let state = test_state(Config::default());
    let app = dispatch_api::routes::router().with_state(state.clone());
    (app, state)
}

pub fn test_state(mut config: Config) -> AppState {
    config.rpc_timeout = RPC_TIMEOUT;
    let factory = HttpClientFactory::new(RPC_TIMEOUT).expect("http client");
    AppState::new(config, Arc::new(factory))
}

/// Start the dispatch API on a real TCP listener.
pub async fn start_dispatch(state: AppState) -> SocketAddr {
    let app = dispatch_api::routes::router().with_state(state);
    serve(app).await
}

/// RPC paths a delivery node has been called on, in arrival order.
pub type Calls = Arc<Mutex<Vec<String>>>;

/// A live delivery node: real delivery-api router on a TCP listener.
pub struct DeliveryNode {
    pub node_id: String,
    pub addr: SocketAddr,
    pub state: delivery_api::AppState,
    pub calls: Calls,
}

impl DeliveryNode {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Register a session directly, bypassing the WebSocket upgrade.
    pub fn session(
        &self,
        session_id: &str,
    ) -> (
        delivery_api::gateway::server::SessionGuard,
        tokio::sync::mpsc::Receiver<delivery_api::gateway::session::OutboundFrame>,
    ) {
        delivery_api::gateway::server::new_session(&self.state.sessions, session_id.to_string(), 16)
            .expect("register test session")
    }
}

async fn record(State(calls): State<Calls>, req: Request, next: Next) -> Response {
    if req.uri().path().starts_with("/rpc/") {
        calls.lock().push(req.uri().path().to_string());
    }
    next.run(req).await
}

pub async fn start_delivery_node(node_id: &str) -> DeliveryNode {
    let state = delivery_api::AppState::new(delivery_api::config::Config::with_node_id(node_id));
    let calls = Calls::default();
    let app = delivery_api::routes::router()
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(calls.clone(), record));
    let addr = serve(app).await;
    DeliveryNode {
        node_id: node_id.to_string(),
        addr,
        state,
        calls,
    }
}

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}
