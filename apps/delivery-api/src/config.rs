use std::time::Duration;

/// Delivery node configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cluster-unique identifier of this delivery node.
    pub node_id: String,
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Base URL the dispatch tier uses to reach this node's RPC endpoint.
    pub advertise_url: String,
    /// Dispatch API origin. The announcer is disabled when unset.
    pub dispatch_url: Option<String>,
    /// How often the node renews its registration with the dispatch tier.
    pub register_interval: Duration,
    /// Outbound frames buffered per connection before writes fail.
    pub session_queue_capacity: usize,
    /// Heartbeat interval advertised to clients (ms).
    pub heartbeat_interval_ms: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Panics with a descriptive message if a required variable is missing.
    pub fn from_env() -> Self {
        let mut config = Self::with_node_id(required_var("NODE_ID"));
        config.port = parsed_var("PORT").unwrap_or(config.port);
        config.advertise_url = std::env::var("ADVERTISE_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("http://127.0.0.1:{}", config.port));
        config.dispatch_url = std::env::var("DISPATCH_URL").ok().filter(|s| !s.is_empty());
        if let Some(secs) = positive_var("REGISTER_INTERVAL_SECS") {
            config.register_interval = Duration::from_secs(secs);
        }
        config.session_queue_capacity =
            positive_var("SESSION_QUEUE_CAPACITY").unwrap_or(config.session_queue_capacity);
        config.heartbeat_interval_ms =
            positive_var("HEARTBEAT_INTERVAL_MS").unwrap_or(config.heartbeat_interval_ms);
        config
    }

    /// Defaults for a node, without reading the environment.
    pub fn with_node_id(node_id: impl Into<String>) -> Self {
        let port = 4102;
        Self {
            node_id: node_id.into(),
            port,
            advertise_url: format!("http://127.0.0.1:{port}"),
            dispatch_url: None,
            register_interval: Duration::from_secs(15),
            session_queue_capacity: 256,
            heartbeat_interval_ms: 41250,
        }
    }
}

fn required_var(name: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| panic!("{name} env var is required"))
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Like [`parsed_var`], but a zero value falls back to the default.
fn positive_var<T: std::str::FromStr + PartialOrd + Default>(name: &str) -> Option<T> {
    parsed_var(name).filter(|v: &T| *v > T::default())
}
