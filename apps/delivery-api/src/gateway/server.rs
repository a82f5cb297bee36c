//! WebSocket upgrade handler and per-connection event loop.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use relay_common::id::{prefix, prefixed_ulid};
use tokio::sync::mpsc;
use tokio::time;

use crate::AppState;

use super::events::GatewayMessage;
use super::registry::{RegistryError, SessionRegistry};
use super::session::{self, ConnectionHandle, OutboundFrame};

/// Close codes (4000-range for application-level).
const CLOSE_UNKNOWN_ERROR: u16 = 4000;
const CLOSE_SESSION_TIMEOUT: u16 = 4009;

const REGISTER_ATTEMPTS: usize = 3;

pub fn router() -> Router<AppState> {
    Router::new().route("/gateway", get(ws_upgrade))
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

/// Removes the session from the registry however the connection ends.
pub struct SessionGuard {
    sessions: Arc<SessionRegistry>,
    session_id: String,
    handle: ConnectionHandle,
}

impl SessionGuard {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.sessions.remove_connection(&self.session_id, &self.handle);
    }
}

/// Register a connection under `session_id` and return the guard that
/// unregisters it plus the queue the writer drains.
pub fn new_session(
    sessions: &Arc<SessionRegistry>,
    session_id: String,
    queue_capacity: usize,
) -> Result<(SessionGuard, mpsc::Receiver<OutboundFrame>), RegistryError> {
    let (handle, outbound_rx) = session::channel(queue_capacity);
    sessions.register(session_id.clone(), handle.clone())?;
    let guard = SessionGuard {
        sessions: sessions.clone(),
        session_id,
        handle,
    };
    Ok((guard, outbound_rx))
}

/// Register under a newly generated ID, regenerating on collision.
fn register_fresh(
    sessions: &Arc<SessionRegistry>,
    queue_capacity: usize,
) -> Option<(String, SessionGuard, mpsc::Receiver<OutboundFrame>)> {
    for _ in 0..REGISTER_ATTEMPTS {
        let session_id = prefixed_ulid(prefix::SESSION);
        match new_session(sessions, session_id.clone(), queue_capacity) {
            Ok((guard, outbound_rx)) => return Some((session_id, guard, outbound_rx)),
            Err(error) => tracing::warn!(%session_id, %error, "session id collision, regenerating"),
        }
    }
    None
}

async fn handle_connection(socket: WebSocket, state: AppState) {
    let (mut ws_tx, ws_rx) = socket.split();

    let Some((session_id, guard, outbound_rx)) =
        register_fresh(&state.sessions, state.config.session_queue_capacity)
    else {
        let _ = send_close(&mut ws_tx, CLOSE_UNKNOWN_ERROR, "Session registration failed").await;
        return;
    };

    tracing::info!(
        %session_id,
        node_id = %state.config.node_id,
        "gateway session established"
    );

    let hello = GatewayMessage::hello(
        &session_id,
        &state.config.node_id,
        state.config.heartbeat_interval_ms,
    );
    if send_json(&mut ws_tx, &hello).await.is_ok() {
        let deadline = heartbeat_deadline(state.config.heartbeat_interval_ms);
        run_session(&session_id, ws_tx, ws_rx, outbound_rx, deadline).await;
    }

    drop(guard);
    tracing::info!(%session_id, "gateway session ended");
}

/// Time a client may stay silent: one and a half advertised intervals, never zero.
fn heartbeat_deadline(interval_ms: u64) -> Duration {
    Duration::from_millis((interval_ms.saturating_mul(3) / 2).max(1))
}

/// Main session loop: drain the outbound queue, watch the socket, enforce heartbeat.
async fn run_session(
    session_id: &str,
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut ws_rx: SplitStream<WebSocket>,
    mut outbound_rx: mpsc::Receiver<OutboundFrame>,
    heartbeat_deadline: Duration,
) {
    let mut heartbeat_timer = time::interval(heartbeat_deadline);
    heartbeat_timer.tick().await; // First tick fires immediately; skip it.
    let mut got_heartbeat = true;

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => got_heartbeat = true,
                    Some(Err(e)) => {
                        tracing::debug!(?e, %session_id, "ws read error");
                        break;
                    }
                }
            }

            frame = outbound_rx.recv() => {
                let Some(frame) = frame else { break };
                if send_json(&mut ws_tx, &GatewayMessage::from(&frame)).await.is_err() {
                    break;
                }
            }

            _ = heartbeat_timer.tick() => {
                if !got_heartbeat {
                    tracing::debug!(%session_id, "heartbeat timeout, closing connection");
                    let _ = send_close(&mut ws_tx, CLOSE_SESSION_TIMEOUT, "Heartbeat timeout").await;
                    break;
                }
                got_heartbeat = false;
            }
        }
    }
}

async fn send_json(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    msg: &GatewayMessage,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    ws_tx.send(Message::Text(json.into())).await
}

/// Send a WebSocket close frame with a code and reason.
async fn send_close(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    code: u16,
    reason: &str,
) -> Result<(), axum::Error> {
    let close_msg = Message::Close(Some(axum::extract::ws::CloseFrame {
        code,
        reason: reason.to_string().into(),
    }));
    ws_tx.send(close_msg).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropping_guard_unregisters_session() {
        let sessions = Arc::new(SessionRegistry::new("n1"));
        let (guard, _rx) = new_session(&sessions, "s1".to_string(), 4).unwrap();
        assert_eq!(guard.session_id(), "s1");
        assert!(sessions.lookup("s1").is_some());

        drop(guard);
        assert!(sessions.lookup("s1").is_none());
    }

    #[test]
    fn new_session_rejects_duplicate_id() {
        let sessions = Arc::new(SessionRegistry::new("n1"));
        let (_guard, _rx) = new_session(&sessions, "s1".to_string(), 4).unwrap();
        let err = new_session(&sessions, "s1".to_string(), 4)
            .err()
            .expect("duplicate id must be rejected");
        assert_eq!(err, RegistryError::DuplicateSession("s1".to_string()));
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn heartbeat_deadline_is_never_zero() {
        assert_eq!(heartbeat_deadline(1000), Duration::from_millis(1500));
        assert_eq!(heartbeat_deadline(0), Duration::from_millis(1));
        assert!(heartbeat_deadline(u64::MAX) > Duration::ZERO);
    }

    #[test]
    fn register_fresh_generates_session_ids() {
        let sessions = Arc::new(SessionRegistry::new("n1"));
        let (a, _guard_a, _rx_a) = register_fresh(&sessions, 4).unwrap();
        let (b, _guard_b, _rx_b) = register_fresh(&sessions, 4).unwrap();
        assert!(a.starts_with("ses_"));
        assert_ne!(a, b);
        assert_eq!(sessions.len(), 2);
    }
}
