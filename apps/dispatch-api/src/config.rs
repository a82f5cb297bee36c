use std::time::Duration;

use crate::bus::Topics;

/// Dispatch tier configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Redis connection string. The bus subscriber is disabled when unset.
    pub redis_url: Option<String>,
    /// Bus topics carrying push and broadcast events.
    pub topics: Topics,
    /// Upper bound on a single delivery endpoint call.
    pub rpc_timeout: Duration,
    /// How long a node stays routable without a heartbeat.
    pub node_ttl: Duration,
    /// How often expired leases are swept.
    pub sweep_interval: Duration,
    /// Delivery nodes joined at startup, as `(node_id, address)`.
    pub seeds: Vec<(String, String)>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 4101,
            redis_url: None,
            topics: Topics::default(),
            rpc_timeout: Duration::from_millis(3000),
            node_ttl: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(5),
            seeds: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Panics with a descriptive message if a variable is malformed.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.port = parsed_var("PORT").unwrap_or(config.port);
        config.redis_url = optional_var("REDIS_URL");
        if let Some(topic) = optional_var("PUSH_TOPIC") {
            config.topics.push = topic;
        }
        if let Some(topic) = optional_var("BROADCAST_TOPIC") {
            config.topics.broadcast = topic;
        }
        if let Some(ms) = positive_var("RPC_TIMEOUT_MS") {
            config.rpc_timeout = Duration::from_millis(ms);
        }
        if let Some(secs) = positive_var("NODE_TTL_SECS") {
            config.node_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = positive_var("SWEEP_INTERVAL_SECS") {
            config.sweep_interval = Duration::from_secs(secs);
        }
        if let Some(raw) = optional_var("DELIVERY_NODES") {
            config.seeds = parse_seeds(&raw)
                .unwrap_or_else(|e| panic!("DELIVERY_NODES is malformed: {e}"));
        }
        config
    }
}

/// Parse `n1=http://host:port,n2=http://other:port`.
pub fn parse_seeds(raw: &str) -> Result<Vec<(String, String)>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (node_id, address) = entry
                .split_once('=')
                .ok_or_else(|| format!("expected node_id=address, got {entry:?}"))?;
            let (node_id, address) = (node_id.trim(), address.trim());
            if node_id.is_empty() || address.is_empty() {
                return Err(format!("expected node_id=address, got {entry:?}"));
            }
            if !is_http_address(address) {
                return Err(format!("address for {node_id} must start with http:// or https://"));
            }
            Ok((node_id.to_string(), address.trim_end_matches('/').to_string()))
        })
        .collect()
}

/// Whether `address` is an `http://` or `https://` URL.
pub fn is_http_address(address: &str) -> bool {
    address.starts_with("http://") || address.starts_with("https://")
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Like [`parsed_var`], but a zero value falls back to the default.
fn positive_var(name: &str) -> Option<u64> {
    parsed_var(name).filter(|v| *v > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_parse_in_order() {
        let seeds = parse_seeds(" n1=http://a:1, n2=http://b:2 ,").unwrap();
        assert_eq!(
            seeds,
            vec![
                ("n1".to_string(), "http://a:1".to_string()),
                ("n2".to_string(), "http://b:2".to_string()),
            ]
        );
    }

    #[test]
    fn seeds_reject_non_http_addresses() {
        assert!(parse_seeds("n1=ftp://a:1").is_err());
        assert!(parse_seeds("n1=a:1").is_err());
        assert_eq!(
            parse_seeds("n1=https://a:1/").unwrap(),
            vec![("n1".to_string(), "https://a:1".to_string())]
        );
    }

    #[test]
    fn zero_intervals_fall_back_to_defaults() {
        std::env::set_var("SWEEP_INTERVAL_SECS", "0");
        std::env::set_var("NODE_TTL_SECS", "0");
        std::env::set_var("RPC_TIMEOUT_MS", "0");

        let config = Config::from_env();
        let defaults = Config::default();
        assert_eq!(config.sweep_interval, defaults.sweep_interval);
        assert_eq!(config.node_ttl, defaults.node_ttl);
        assert_eq!(config.rpc_timeout, defaults.rpc_timeout);

        std::env::set_var("SWEEP_INTERVAL_SECS", "2");
        assert_eq!(Config::from_env().sweep_interval, Duration::from_secs(2));
    }

    #[test]
    fn seeds_reject_missing_address() {
        assert!(parse_seeds("n1").is_err());
        assert!(parse_seeds("n1=").is_err());
        assert!(parse_seeds("").unwrap().is_empty());
    }
}
