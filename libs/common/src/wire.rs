//! Bus envelopes and delivery RPC bodies shared by the dispatch tier and the
//! delivery nodes.
//!
//! Everything here is JSON. Opaque payload bytes travel as standard base64
//! strings and are held as [`Bytes`] so fan-out clones stay cheap.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// Bus envelopes
// ---------------------------------------------------------------------------

/// A targeted push: deliver `payload` to `session_ids`, all hosted on `node_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushEvent {
    /// Application-level message kind. Passed through verbatim.
    pub operation: i32,
    /// Delivery node currently hosting the target sessions.
    pub node_id: String,
    #[serde(default)]
    pub session_ids: Vec<String>,
    #[serde(with = "base64_bytes")]
    pub payload: Bytes,
}

/// A broadcast, either to selected sessions on selected nodes or, when
/// `nodes` is empty, to every session on every known node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastEvent {
    /// Node ID to an optional session filter.
    #[serde(default)]
    pub nodes: BTreeMap<String, Option<Vec<String>>>,
    #[serde(with = "base64_bytes")]
    pub payload: Bytes,
}

impl PushEvent {
    pub fn from_slice(body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(body)
    }

    pub fn to_vec(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

impl BroadcastEvent {
    pub fn from_slice(body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(body)
    }

    pub fn to_vec(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

// ---------------------------------------------------------------------------
// Delivery endpoint RPC
// ---------------------------------------------------------------------------

/// Body of `POST /rpc/push`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PushRequest {
    pub operation: i32,
    #[serde(default)]
    pub session_ids: Vec<String>,
    #[serde(with = "base64_bytes")]
    #[schema(value_type = String, format = Byte)]
    pub payload: Bytes,
}

/// Body of `POST /rpc/broadcast`. An empty `session_ids` means every session
/// registered on the node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BroadcastRequest {
    #[serde(default)]
    pub session_ids: Vec<String>,
    #[serde(with = "base64_bytes")]
    #[schema(value_type = String, format = Byte)]
    pub payload: Bytes,
}

/// Per-request delivery counts returned by a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeliveryAck {
    /// Frames queued onto a live connection.
    pub delivered: usize,
    /// Session IDs not registered on the node.
    pub skipped: usize,
    /// Connections whose outbound queue was full or closed.
    pub failed: usize,
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Body of `POST /api/v1/nodes/register`, sent by a delivery node joining
/// the cluster and renewing its lease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NodeRegistration {
    pub node_id: String,
    /// Base URL of the node's delivery endpoint.
    pub address: String,
}

/// Body of `POST /api/v1/nodes/heartbeat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NodeHeartbeat {
    pub node_id: String,
}

/// Serde adapter storing [`Bytes`] as a standard base64 string.
pub mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}
