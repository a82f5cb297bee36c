//! Per-connection outbound handle.
//!
//! The Session Registry owns one [`ConnectionHandle`] per live WebSocket. The
//! handle is the sending half of a bounded queue; the connection's own task
//! drains the receiving half onto the socket, so a slow client only ever
//! fills its own queue.

use bytes::Bytes;
use tokio::sync::mpsc;

/// A frame waiting to be written to a client connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// Targeted push, tagged with the opaque application operation.
    Push { operation: i32, payload: Bytes },
    /// Broadcast payload, no operation tag.
    Broadcast { payload: Bytes },
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum WriteError {
    #[error("outbound queue is full")]
    Full,
    #[error("connection is closed")]
    Closed,
}

/// Writable handle to a single client connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    tx: mpsc::Sender<OutboundFrame>,
}

/// Create a connection handle and the receiver its writer task drains.
pub fn channel(capacity: usize) -> (ConnectionHandle, mpsc::Receiver<OutboundFrame>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ConnectionHandle { tx }, rx)
}

impl ConnectionHandle {
    /// Queue a frame without waiting. Never blocks the caller.
    pub fn try_write(&self, frame: OutboundFrame) -> Result<(), WriteError> {
        self.tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => WriteError::Full,
            mpsc::error::TrySendError::Closed(_) => WriteError::Closed,
        })
    }

    /// Whether both handles write to the same connection.
    pub fn same_connection(&self, other: &ConnectionHandle) -> bool {
        self.tx.same_channel(&other.tx)
    }
}
