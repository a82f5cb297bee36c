//! Integration tests for the delivery endpoint RPC surface.

mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use bytes::Bytes;
use delivery_api::gateway::session::OutboundFrame;
use relay_common::DeliveryAck;

// =========================================================================
// POST /rpc/push
// =========================================================================

#[tokio::test]
async fn push_delivers_to_registered_session() {
    let (app, state) = common::test_app("n1");
    let (_guard, mut rx) = common::register_session(&state, "s1");
    let server = TestServer::new(app).unwrap();

    let resp = server
        .post("/rpc/push")
        .json(&serde_json::json!({
            "operation": 1,
            "session_ids": ["s1"],
            "payload": "aGk="
        }))
        .await;

    resp.assert_status_ok();
    let ack: DeliveryAck = resp.json();
    assert_eq!(ack, DeliveryAck { delivered: 1, skipped: 0, failed: 0 });

    assert_eq!(
        rx.try_recv().unwrap(),
        OutboundFrame::Push {
            operation: 1,
            payload: Bytes::from_static(b"hi"),
        }
    );
}

#[tokio::test]
async fn push_skips_unknown_sessions_without_error() {
    let (app, state) = common::test_app("n1");
    let (_guard, mut rx) = common::register_session(&state, "s1");
    let server = TestServer::new(app).unwrap();

    let resp = server
        .post("/rpc/push")
        .json(&serde_json::json!({
            "operation": 2,
            "session_ids": ["gone", "s1", "also_gone"],
            "payload": "eA=="
        }))
        .await;

    resp.assert_status_ok();
    let ack: DeliveryAck = resp.json();
    assert_eq!(ack.delivered, 1);
    assert_eq!(ack.skipped, 2);
    assert!(rx.try_recv().is_ok());
}

#[tokio::test]
async fn push_rejects_malformed_body() {
    let (app, _state) = common::test_app("n1");
    let server = TestServer::new(app).unwrap();

    let resp = server
        .post("/rpc/push")
        .json(&serde_json::json!({ "session_ids": ["s1"], "payload": "not base64!" }))
        .expect_failure()
        .await;

    assert!(resp.status_code().is_client_error());
}

// =========================================================================
// POST /rpc/broadcast
// =========================================================================

#[tokio::test]
async fn broadcast_without_filter_reaches_every_session() {
    let (app, state) = common::test_app("n1");
    let (_g1, mut rx1) = common::register_session(&state, "s1");
    let (_g2, mut rx2) = common::register_session(&state, "s2");
    let server = TestServer::new(app).unwrap();

    let resp = server
        .post("/rpc/broadcast")
        .json(&serde_json::json!({ "payload": "aGVsbG8=" }))
        .await;

    resp.assert_status_ok();
    let ack: DeliveryAck = resp.json();
    assert_eq!(ack.delivered, 2);

    let expected = OutboundFrame::Broadcast {
        payload: Bytes::from_static(b"hello"),
    };
    assert_eq!(rx1.try_recv().unwrap(), expected);
    assert_eq!(rx2.try_recv().unwrap(), expected);
}

#[tokio::test]
async fn broadcast_with_filter_reaches_only_listed_sessions() {
    let (app, state) = common::test_app("n1");
    let (_g1, mut rx1) = common::register_session(&state, "s1");
    let (_g2, mut rx2) = common::register_session(&state, "s2");
    let server = TestServer::new(app).unwrap();

    let resp = server
        .post("/rpc/broadcast")
        .json(&serde_json::json!({ "session_ids": ["s2"], "payload": "aGVsbG8=" }))
        .await;

    resp.assert_status(StatusCode::OK);
    let ack: DeliveryAck = resp.json();
    assert_eq!(ack, DeliveryAck { delivered: 1, skipped: 0, failed: 0 });
    assert!(rx1.try_recv().is_err());
    assert!(rx2.try_recv().is_ok());
}

#[tokio::test]
async fn dropped_session_is_skipped_by_later_push() {
    let (app, state) = common::test_app("n1");
    let (guard, _rx) = common::register_session(&state, "s1");
    drop(guard);
    let server = TestServer::new(app).unwrap();

    let resp = server
        .post("/rpc/push")
        .json(&serde_json::json!({ "operation": 1, "session_ids": ["s1"], "payload": "" }))
        .await;

    let ack: DeliveryAck = resp.json();
    assert_eq!(ack, DeliveryAck { delivered: 0, skipped: 1, failed: 0 });
}

// =========================================================================
// GET /health
// =========================================================================

#[tokio::test]
async fn health_reports_node_and_session_count() {
    let (app, state) = common::test_app("n7");
    let (_guard, _rx) = common::register_session(&state, "s1");
    let server = TestServer::new(app).unwrap();

    let resp = server.get("/health").await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["node_id"], "n7");
    assert_eq!(body["sessions"], 1);
}
