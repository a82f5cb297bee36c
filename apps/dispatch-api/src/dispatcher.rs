//! Fan-out of decoded bus events to delivery nodes.
//!
//! Every remote call runs in its own task with a bounded timeout. The
//! dispatcher returns as soon as the tasks are spawned, so a slow or dead
//! node never holds up the subscriber loop or its sibling calls.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use relay_common::{BroadcastEvent, BroadcastRequest, DeliveryAck, PushEvent, PushRequest};
use tokio::task::JoinHandle;

use crate::client::ClientError;
use crate::error::RelayError;
use crate::routing::{RoutingEntry, RoutingTable};

/// Result of one remote call.
#[derive(Debug)]
pub struct Delivery {
    pub node_id: String,
    pub outcome: Result<DeliveryAck, RelayError>,
}

/// Handle to the tasks spawned for one event.
///
/// Dropping it detaches the tasks; they still run to completion.
#[derive(Debug, Default)]
pub struct FanOut {
    tasks: Vec<JoinHandle<Delivery>>,
}

impl FanOut {
    /// Number of remote calls issued.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for every call to finish.
    pub async fn join(self) -> Vec<Delivery> {
        let mut deliveries = Vec::with_capacity(self.tasks.len());
        for task in self.tasks {
            match task.await {
                Ok(delivery) => deliveries.push(delivery),
                Err(error) => tracing::error!(%error, "delivery task failed"),
            }
        }
        deliveries
    }
}

pub struct Dispatcher {
    routes: Arc<RoutingTable>,
    call_timeout: Duration,
}

impl Dispatcher {
    pub fn new(routes: Arc<RoutingTable>, call_timeout: Duration) -> Self {
        Self {
            routes,
            call_timeout,
        }
    }

    /// Send a targeted push to the node hosting its sessions.
    ///
    /// An unknown node drops the event. There is no retry.
    pub fn dispatch_push(&self, event: PushEvent) -> FanOut {
        let Some(entry) = self.routes.resolve(&event.node_id) else {
            tracing::warn!(
                node_id = %event.node_id,
                session_ids = ?event.session_ids,
                payload_bytes = event.payload.len(),
                "push dropped, node not in routing table"
            );
            return FanOut::default();
        };

        let req = PushRequest {
            operation: event.operation,
            session_ids: event.session_ids,
            payload: event.payload,
        };
        let timeout = self.call_timeout;
        let task = tokio::spawn(async move {
            let outcome = call(timeout, &entry.node_id, entry.client.push(&req)).await;
            if let Err(error) = &outcome {
                tracing::warn!(
                    node_id = %entry.node_id,
                    session_ids = ?req.session_ids,
                    payload_bytes = req.payload.len(),
                    %error,
                    "push failed"
                );
            }
            Delivery {
                node_id: entry.node_id.clone(),
                outcome,
            }
        });

        FanOut { tasks: vec![task] }
    }

    /// Broadcast to the nodes named by the event, or to every known node when
    /// it names none.
    ///
    /// A node whose filter is `null` or an empty list receives nothing.
    pub fn dispatch_broadcast(&self, event: BroadcastEvent) -> FanOut {
        let mut fan_out = FanOut::default();

        if event.nodes.is_empty() {
            for entry in self.routes.resolve_all() {
                let req = BroadcastRequest {
                    session_ids: Vec::new(),
                    payload: event.payload.clone(),
                };
                fan_out.tasks.push(self.spawn_broadcast(entry, req));
            }
            return fan_out;
        }

        for (node_id, filter) in event.nodes {
            let session_ids = match filter {
                Some(ids) if !ids.is_empty() => ids,
                _ => {
                    tracing::debug!(%node_id, "broadcast target has no sessions, skipping");
                    continue;
                }
            };
            let Some(entry) = self.routes.resolve(&node_id) else {
                tracing::debug!(%node_id, "broadcast target not in routing table, skipping");
                continue;
            };
            let req = BroadcastRequest {
                session_ids,
                payload: event.payload.clone(),
            };
            fan_out.tasks.push(self.spawn_broadcast(entry, req));
        }
        fan_out
    }

    fn spawn_broadcast(
        &self,
        entry: Arc<RoutingEntry>,
        req: BroadcastRequest,
    ) -> JoinHandle<Delivery> {
        let timeout = self.call_timeout;
        tokio::spawn(async move {
            let outcome = call(timeout, &entry.node_id, entry.client.broadcast(&req)).await;
            if let Err(error) = &outcome {
                tracing::warn!(
                    node_id = %entry.node_id,
                    payload_bytes = req.payload.len(),
                    %error,
                    "broadcast failed"
                );
            }
            Delivery {
                node_id: entry.node_id.clone(),
                outcome,
            }
        })
    }
}

async fn call<F>(timeout: Duration, node_id: &str, request: F) -> Result<DeliveryAck, RelayError>
where
    F: Future<Output = Result<DeliveryAck, ClientError>>,
{
    match tokio::time::timeout(timeout, request).await {
        Ok(Ok(ack)) => Ok(ack),
        Ok(Err(error)) => Err(RelayError::unreachable(node_id, error)),
        Err(_) => Err(RelayError::unreachable(node_id, ClientError::Timeout(timeout))),
    }
}
