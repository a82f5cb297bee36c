//! Keeps the routing table in step with the discovery feed.
//!
//! Every known node holds a lease. Joins and heartbeats renew it; the sweeper
//! removes nodes whose lease lapsed, which is how a crashed node that never
//! sent a leave drops out of the table. Statically seeded nodes hold pinned
//! leases that never lapse.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use utoipa::ToSchema;

use crate::client::ClientFactory;

use super::table::RoutingTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum JoinOutcome {
    /// First time this node was seen.
    Added,
    /// Known node at a new address; the entry was replaced.
    Replaced,
    /// Known node at the same address; only the lease was renewed.
    Renewed,
}

struct Lease {
    address: String,
    renewed_at: Instant,
    pinned: bool,
}

pub struct Discovery {
    table: Arc<RoutingTable>,
    factory: Arc<dyn ClientFactory>,
    ttl: Duration,
    // Held across every table mutation so joins, leaves and sweeps never interleave.
    leases: Mutex<HashMap<String, Lease>>,
}

impl Discovery {
    pub fn new(table: Arc<RoutingTable>, factory: Arc<dyn ClientFactory>, ttl: Duration) -> Self {
        Self {
            table,
            factory,
            ttl,
            leases: Mutex::new(HashMap::new()),
        }
    }

    pub fn join(&self, node_id: &str, address: &str) -> JoinOutcome {
        self.insert(node_id, address, false)
    }

    /// Join a node from static configuration. Its lease never expires, but a
    /// leave still removes it.
    pub fn seed(&self, node_id: &str, address: &str) -> JoinOutcome {
        self.insert(node_id, address, true)
    }

    fn insert(&self, node_id: &str, address: &str, pinned: bool) -> JoinOutcome {
        let mut leases = self.leases.lock();
        let now = Instant::now();

        if let Some(lease) = leases.get_mut(node_id) {
            if lease.address == address {
                lease.renewed_at = now;
                lease.pinned |= pinned;
                return JoinOutcome::Renewed;
            }
        }

        let client = self.factory.connect(node_id, address);
        let previous = self.table.update(node_id, address, client);
        leases.insert(
            node_id.to_string(),
            Lease {
                address: address.to_string(),
                renewed_at: now,
                pinned,
            },
        );

        if previous.is_some() {
            tracing::info!(%node_id, %address, "delivery node moved");
            JoinOutcome::Replaced
        } else {
            tracing::info!(%node_id, %address, "delivery node joined");
            JoinOutcome::Added
        }
    }

    /// Renew a lease. Returns `false` if the node is unknown.
    pub fn renew(&self, node_id: &str) -> bool {
        match self.leases.lock().get_mut(node_id) {
            Some(lease) => {
                lease.renewed_at = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Remove a node. Returns `false` if it was not known.
    pub fn leave(&self, node_id: &str) -> bool {
        let mut leases = self.leases.lock();
        leases.remove(node_id);
        let removed = self.table.remove(node_id).is_some();
        if removed {
            tracing::info!(%node_id, "delivery node left");
        }
        removed
    }

    /// Remove every node whose lease is older than the TTL. Returns their IDs.
    pub fn sweep_expired(&self) -> Vec<String> {
        let mut leases = self.leases.lock();
        let now = Instant::now();
        let expired: Vec<String> = leases
            .iter()
            .filter(|(_, lease)| !lease.pinned && now.duration_since(lease.renewed_at) >= self.ttl)
            .map(|(node_id, _)| node_id.clone())
            .collect();

        for node_id in &expired {
            leases.remove(node_id);
            self.table.remove(node_id);
            tracing::warn!(%node_id, ttl = ?self.ttl, "delivery node lease expired");
        }
        expired
    }

    /// Run [`sweep_expired`](Self::sweep_expired) every `interval` until aborted.
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
            loop {
                ticker.tick().await;
                self.sweep_expired();
            }
        })
    }
}
