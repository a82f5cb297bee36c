pub mod bus;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod routes;
pub mod routing;
pub mod subscriber;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use client::ClientFactory;
use config::Config;
use routing::{Discovery, RoutingTable};

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub routes: Arc<RoutingTable>,
    pub discovery: Arc<Discovery>,
}

impl AppState {
    /// Build the routing table and discovery for `config`, joining its seeds.
    pub fn new(config: Config, factory: Arc<dyn ClientFactory>) -> Self {
        let routes = Arc::new(RoutingTable::new());
        let discovery = Arc::new(Discovery::new(routes.clone(), factory, config.node_ttl));
        for (node_id, address) in &config.seeds {
            discovery.seed(node_id, address);
        }
        Self {
            config: Arc::new(config),
            routes,
            discovery,
        }
    }
}
