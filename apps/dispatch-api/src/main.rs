use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dispatch_api::bus;
use dispatch_api::client::HttpClientFactory;
use dispatch_api::config::Config;
use dispatch_api::dispatcher::Dispatcher;
use dispatch_api::subscriber::EventSubscriber;
use dispatch_api::AppState;

#[tokio::main]
async fn main() {
    // Load .env file, falling back to the crate directory; env vars may be set externally.
    if dotenvy::dotenv().is_err() {
        let env_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(env_path);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let port = config.port;

    let factory = HttpClientFactory::new(config.rpc_timeout).expect("failed to build HTTP client");
    let state = AppState::new(config, Arc::new(factory));

    tracing::info!(
        seeds = state.routes.len(),
        ttl = ?state.config.node_ttl,
        rpc_timeout = ?state.config.rpc_timeout,
        "dispatch-api configured"
    );

    let sweeper = state
        .discovery
        .clone()
        .spawn_sweeper(state.config.sweep_interval);

    let mut consumers = Vec::new();
    match &state.config.redis_url {
        Some(redis_url) => {
            let client = redis::Client::open(redis_url.as_str()).expect("invalid REDIS_URL");
            let subscriber = Arc::new(EventSubscriber::new(
                Dispatcher::new(state.routes.clone(), state.config.rpc_timeout),
                state.config.topics.clone(),
            ));
            let topics = subscriber.topics().clone();
            for topic in [topics.push, topics.broadcast] {
                consumers.push(bus::spawn_consumer(
                    client.clone(),
                    topic,
                    subscriber.clone(),
                ));
            }
        }
        None => tracing::warn!("REDIS_URL not set, bus subscriber disabled"),
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(dispatch_api::routes::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "dispatch-api listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    for task in consumers {
        task.abort();
    }
    sweeper.abort();
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
