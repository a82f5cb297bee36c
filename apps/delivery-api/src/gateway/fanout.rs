//! Delivery endpoint: turns push/broadcast RPCs into writes on local sessions.
//!
//! Writes go through [`ConnectionHandle::try_write`], so one stalled client
//! never delays the other sessions addressed by the same request.

use std::sync::Arc;

use bytes::Bytes;
use relay_common::DeliveryAck;

use super::registry::SessionRegistry;
use super::session::{ConnectionHandle, OutboundFrame};

#[derive(Clone)]
pub struct DeliveryEndpoint {
    sessions: Arc<SessionRegistry>,
}

impl DeliveryEndpoint {
    pub fn new(sessions: Arc<SessionRegistry>) -> Self {
        Self { sessions }
    }

    /// Deliver `payload` to each listed session. Unknown sessions are skipped.
    pub fn push(&self, operation: i32, session_ids: &[String], payload: Bytes) -> DeliveryAck {
        let frame = OutboundFrame::Push { operation, payload };
        let ack = self.deliver_to(session_ids, &frame);
        tracing::debug!(
            node_id = %self.sessions.node_id(),
            operation,
            delivered = ack.delivered,
            skipped = ack.skipped,
            failed = ack.failed,
            "push handled"
        );
        ack
    }

    /// Deliver `payload` to the listed sessions, or to every local session
    /// when the filter is empty.
    pub fn broadcast(&self, session_ids: &[String], payload: Bytes) -> DeliveryAck {
        let frame = OutboundFrame::Broadcast { payload };
        let ack = if session_ids.is_empty() {
            let mut ack = DeliveryAck::default();
            for (session_id, handle) in self.sessions.snapshot() {
                write_one(&mut ack, &session_id, &handle, &frame);
            }
            ack
        } else {
            self.deliver_to(session_ids, &frame)
        };
        tracing::debug!(
            node_id = %self.sessions.node_id(),
            filtered = !session_ids.is_empty(),
            delivered = ack.delivered,
            skipped = ack.skipped,
            failed = ack.failed,
            "broadcast handled"
        );
        ack
    }

    fn deliver_to(&self, session_ids: &[String], frame: &OutboundFrame) -> DeliveryAck {
        let mut ack = DeliveryAck::default();
        for session_id in session_ids {
            match self.sessions.lookup(session_id) {
                Some(handle) => write_one(&mut ack, session_id, &handle, frame),
                None => {
                    // Disconnected between routing and delivery.
                    tracing::debug!(%session_id, "session not found, skipping");
                    ack.skipped += 1;
                }
            }
        }
        ack
    }
}

fn write_one(ack: &mut DeliveryAck, session_id: &str, handle: &ConnectionHandle, frame: &OutboundFrame) {
    match handle.try_write(frame.clone()) {
        Ok(()) => ack.delivered += 1,
        Err(error) => {
            tracing::debug!(%session_id, %error, "session write failed");
            ack.failed += 1;
        }
    }
}
