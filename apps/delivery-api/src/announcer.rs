//! Keeps this node registered with the dispatch tier.
//!
//! Registers on startup, renews the lease every `register_interval`, and
//! deregisters on graceful shutdown. A heartbeat answered with `404` means
//! the dispatch tier expired the lease, so the node registers again.

use std::sync::Arc;
use std::time::Duration;

use relay_common::{NodeHeartbeat, NodeRegistration};
use reqwest::StatusCode;
use tokio::task::JoinHandle;

use crate::config::Config;

/// Per-request timeout for calls to the dispatch API.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, thiserror::Error)]
pub enum AnnounceError {
    #[error("dispatch api request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("dispatch api answered {0}")]
    Status(StatusCode),
}

/// Outcome of a lease renewal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Renewal {
    Renewed,
    /// The dispatch tier no longer knows this node.
    Unknown,
}

pub struct Announcer {
    http: reqwest::Client,
    dispatch_url: String,
    registration: NodeRegistration,
    interval: Duration,
}

impl Announcer {
    /// Build an announcer from config. Returns `None` when no dispatch URL is set.
    pub fn from_config(config: &Config) -> Result<Option<Self>, AnnounceError> {
        let Some(dispatch_url) = config.dispatch_url.as_deref() else {
            return Ok(None);
        };
        let registration = NodeRegistration {
            node_id: config.node_id.clone(),
            address: config.advertise_url.clone(),
        };
        Self::new(dispatch_url, registration, config.register_interval).map(Some)
    }

    pub fn new(
        dispatch_url: &str,
        registration: NodeRegistration,
        interval: Duration,
    ) -> Result<Self, AnnounceError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            dispatch_url: dispatch_url.trim_end_matches('/').to_string(),
            registration,
            interval,
        })
    }

    pub async fn register(&self) -> Result<(), AnnounceError> {
        let resp = self
            .http
            .post(format!("{}/api/v1/nodes/register", self.dispatch_url))
            .json(&self.registration)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(AnnounceError::Status(resp.status()));
        }
        tracing::info!(
            node_id = %self.registration.node_id,
            address = %self.registration.address,
            "registered with dispatch tier"
        );
        Ok(())
    }

    pub async fn heartbeat(&self) -> Result<Renewal, AnnounceError> {
        let resp = self
            .http
            .post(format!("{}/api/v1/nodes/heartbeat", self.dispatch_url))
            .json(&NodeHeartbeat {
                node_id: self.registration.node_id.clone(),
            })
            .send()
            .await?;
        match resp.status() {
            s if s.is_success() => Ok(Renewal::Renewed),
            StatusCode::NOT_FOUND => Ok(Renewal::Unknown),
            s => Err(AnnounceError::Status(s)),
        }
    }

    pub async fn deregister(&self) -> Result<(), AnnounceError> {
        let resp = self
            .http
            .delete(format!(
                "{}/api/v1/nodes/{}",
                self.dispatch_url, self.registration.node_id
            ))
            .send()
            .await?;
        match resp.status() {
            s if s.is_success() || s == StatusCode::NOT_FOUND => Ok(()),
            s => Err(AnnounceError::Status(s)),
        }
    }

    /// Run one renewal tick, registering again if the lease was lost.
    pub async fn renew(&self) -> Result<(), AnnounceError> {
        match self.heartbeat().await? {
            Renewal::Renewed => {
                tracing::debug!(node_id = %self.registration.node_id, "lease renewed");
                Ok(())
            }
            Renewal::Unknown => {
                tracing::warn!(
                    node_id = %self.registration.node_id,
                    "dispatch tier lost this node, registering again"
                );
                self.register().await
            }
        }
    }

    /// Register, then keep renewing until the task is aborted.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(error) = self.register().await {
                tracing::warn!(%error, "initial registration failed, retrying on next tick");
            }

            let mut ticker = tokio::time::interval(self.interval.max(MIN_INTERVAL));
            ticker.tick().await; // First tick fires immediately; skip it.
            loop {
                ticker.tick().await;
                if let Err(error) = self.renew().await {
                    tracing::warn!(
                        node_id = %self.registration.node_id,
                        %error,
                        "lease renewal failed"
                    );
                }
            }
        })
    }
}
