//! Fake delivery clients for unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use relay_common::{BroadcastRequest, DeliveryAck, PushRequest};
use tokio::sync::mpsc;

use crate::client::{ClientError, DeliveryClient};
use crate::routing::RoutingTable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Push(PushRequest),
    Broadcast(BroadcastRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Ok,
    Fail,
    /// Never answers.
    Hang,
}

/// Accepts every call and delivers nothing.
pub struct NullClient;

#[async_trait]
impl DeliveryClient for NullClient {
    async fn push(&self, _req: &PushRequest) -> Result<DeliveryAck, ClientError> {
        Ok(DeliveryAck::default())
    }

    async fn broadcast(&self, _req: &BroadcastRequest) -> Result<DeliveryAck, ClientError> {
        Ok(DeliveryAck::default())
    }
}

/// Records every call as `(node_id, call)` on a channel.
pub struct RecordingClient {
    node_id: String,
    behavior: Behavior,
    calls: mpsc::UnboundedSender<(String, Call)>,
}

impl RecordingClient {
    async fn answer(&self, call: Call) -> Result<DeliveryAck, ClientError> {
        let _ = self.calls.send((self.node_id.clone(), call));
        match self.behavior {
            Behavior::Ok => Ok(DeliveryAck {
                delivered: 1,
                ..DeliveryAck::default()
            }),
            Behavior::Fail => Err(ClientError::Status(reqwest::StatusCode::BAD_GATEWAY)),
            Behavior::Hang => std::future::pending().await,
        }
    }
}

#[async_trait]
impl DeliveryClient for RecordingClient {
    async fn push(&self, req: &PushRequest) -> Result<DeliveryAck, ClientError> {
        self.answer(Call::Push(req.clone())).await
    }

    async fn broadcast(&self, req: &BroadcastRequest) -> Result<DeliveryAck, ClientError> {
        self.answer(Call::Broadcast(req.clone())).await
    }
}

/// Routing table populated with one recording client per node.
pub fn recording_table(
    nodes: &[(&str, Behavior)],
) -> (Arc<RoutingTable>, mpsc::UnboundedReceiver<(String, Call)>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let table = Arc::new(RoutingTable::new());
    for (node_id, behavior) in nodes {
        let client = Arc::new(RecordingClient {
            node_id: node_id.to_string(),
            behavior: *behavior,
            calls: tx.clone(),
        });
        table.update(node_id, &format!("http://{node_id}"), client);
    }
    (table, rx)
}

/// Drain whatever calls have been recorded so far.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<(String, Call)>) -> Vec<(String, Call)> {
    let mut calls = Vec::new();
    while let Ok(call) = rx.try_recv() {
        calls.push(call);
    }
    calls
}
