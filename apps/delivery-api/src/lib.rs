pub mod announcer;
pub mod config;
pub mod gateway;
pub mod routes;

use std::sync::Arc;

use config::Config;
use gateway::fanout::DeliveryEndpoint;
use gateway::registry::SessionRegistry;

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionRegistry>,
    pub endpoint: DeliveryEndpoint,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let sessions = Arc::new(SessionRegistry::new(config.node_id.clone()));
        Self {
            endpoint: DeliveryEndpoint::new(sessions.clone()),
            sessions,
            config: Arc::new(config),
        }
    }
}
