//! Frames written to clients over WebSocket.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use serde_json::Value;

use super::session::OutboundFrame;

/// Event names written to clients.
pub struct EventName;

impl EventName {
    pub const HELLO: &'static str = "HELLO";
    pub const PUSH: &'static str = "PUSH";
    pub const BROADCAST: &'static str = "BROADCAST";
}

/// A message sent from the node to the client.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub op: Option<i32>,
    pub t: &'static str,
    pub d: Value,
}

impl GatewayMessage {
    /// First frame after upgrade, telling the client its session ID.
    pub fn hello(session_id: &str, node_id: &str, heartbeat_interval_ms: u64) -> Self {
        Self {
            op: None,
            t: EventName::HELLO,
            d: serde_json::json!({
                "session_id": session_id,
                "node_id": node_id,
                "heartbeat_interval": heartbeat_interval_ms,
            }),
        }
    }
}

impl From<&OutboundFrame> for GatewayMessage {
    fn from(frame: &OutboundFrame) -> Self {
        match frame {
            OutboundFrame::Push { operation, payload } => Self {
                op: Some(*operation),
                t: EventName::PUSH,
                d: Value::String(STANDARD.encode(payload)),
            },
            OutboundFrame::Broadcast { payload } => Self {
                op: None,
                t: EventName::BROADCAST,
                d: Value::String(STANDARD.encode(payload)),
            },
        }
    }
}
