//! Client side of the delivery endpoint RPC.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use relay_common::{BroadcastRequest, DeliveryAck, PushRequest};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("delivery node answered {0}")]
    Status(reqwest::StatusCode),
    #[error("call timed out after {0:?}")]
    Timeout(Duration),
}

/// Remote handle to one delivery node's endpoint.
///
/// Implementations are shared by every dispatch task that resolves the node,
/// so they must be usable concurrently and never mutated after construction.
#[async_trait]
pub trait DeliveryClient: Send + Sync {
    async fn push(&self, req: &PushRequest) -> Result<DeliveryAck, ClientError>;
    async fn broadcast(&self, req: &BroadcastRequest) -> Result<DeliveryAck, ClientError>;
}

/// Builds the client for a node when discovery reports it.
pub trait ClientFactory: Send + Sync {
    fn connect(&self, node_id: &str, address: &str) -> Arc<dyn DeliveryClient>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// JSON-over-HTTP client for `POST /rpc/push` and `POST /rpc/broadcast`.
pub struct HttpDeliveryClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpDeliveryClient {
    pub fn new(address: &str, http: reqwest::Client) -> Self {
        Self {
            base_url: address.trim_end_matches('/').to_string(),
            http,
        }
    }

    async fn call<T: serde::Serialize + Sync>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<DeliveryAck, ClientError> {
        let resp = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ClientError::Status(resp.status()));
        }
        Ok(resp.json::<DeliveryAck>().await?)
    }
}

#[async_trait]
impl DeliveryClient for HttpDeliveryClient {
    async fn push(&self, req: &PushRequest) -> Result<DeliveryAck, ClientError> {
        self.call("/rpc/push", req).await
    }

    async fn broadcast(&self, req: &BroadcastRequest) -> Result<DeliveryAck, ClientError> {
        self.call("/rpc/broadcast", req).await
    }
}

/// Hands out [`HttpDeliveryClient`]s sharing one connection pool.
#[derive(Clone)]
pub struct HttpClientFactory {
    http: reqwest::Client,
}

impl HttpClientFactory {
    pub fn new(timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

impl ClientFactory for HttpClientFactory {
    fn connect(&self, _node_id: &str, address: &str) -> Arc<dyn DeliveryClient> {
        Arc::new(HttpDeliveryClient::new(address, self.http.clone()))
    }
}
