//! End-to-end gateway tests using real WebSocket and HTTP clients.

use std::sync::Arc;
use std::time::Duration;

use beacon_gateway::plugin_fn;
use futures_util::SinkExt;
use integration_tests::*;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await.unwrap();

    let response = server.get("/health").await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.unwrap(), "OK");

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_health_stats() {
    let server = TestServer::start().await.unwrap();
    server
        .gateway()
        .plugins()
        .register("lights", plugin_fn(|_| {}))
        .unwrap();

    let _subscribed = server.connect_subscribed().await.unwrap();
    let _idle = server.connect().await.unwrap();
    server.wait_for_connections(2).await.unwrap();

    let response = server.get("/health/stats").await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let stats: Value = response.json().await.unwrap();
    assert_eq!(
        stats,
        json!({"connections": 2, "subscribers": 1, "plugins": 1})
    );

    server.stop().await.unwrap();
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn test_subscribe_success_response() {
    let server = TestServer::start().await.unwrap();
    let mut ws = server.connect().await.unwrap();

    send_json(
        &mut ws,
        &json!({"type": "invoke", "id": 1, "name": "subscribe-events"}),
    )
    .await
    .unwrap();

    let reply = recv_json(&mut ws).await.unwrap();
    assert_eq!(reply, json!({"type": "response", "id": 1, "name": "success"}));
    server.wait_for_subscribers(1).await.unwrap();

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_second_subscribe_is_rejected() {
    let server = TestServer::start().await.unwrap();
    let mut ws = server.connect_subscribed().await.unwrap();

    send_json(
        &mut ws,
        &json!({"type": "invoke", "id": 2, "name": "subscribe-events"}),
    )
    .await
    .unwrap();

    let reply = recv_json(&mut ws).await.unwrap();
    assert_eq!(
        reply,
        json!({"type": "response", "id": 2, "name": "error", "data": "socket already subscribed"})
    );

    // Still subscribed and still open
    let report = server.gateway().broadcaster().broadcast("ping", json!(1));
    assert_eq!(report.delivered, 1);
    let event = recv_json(&mut ws).await.unwrap();
    assert_eq!(event["name"], "ping");

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_registration_timeout_closes_with_4000() {
    let server = TestServer::start_with_config(short_registration_config(200))
        .await
        .unwrap();
    let mut ws = server.connect().await.unwrap();

    let (code, reason) = recv_close(&mut ws).await.unwrap();
    assert_eq!(code, 4000);
    assert_eq!(reason, "Registration timed out");

    server.wait_for_connections(0).await.unwrap();

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_subscribed_connection_survives_registration_window() {
    let server = TestServer::start_with_config(short_registration_config(200))
        .await
        .unwrap();
    let mut ws = server.connect_subscribed().await.unwrap();

    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(server.gateway().state().connection_manager().connection_count(), 1);
    server.gateway().broadcaster().broadcast("still-here", Value::Null);
    let event = recv_json(&mut ws).await.unwrap();
    assert_eq!(event["name"], "still-here");

    server.stop().await.unwrap();
}

// ============================================================================
// Invalid frames
// ============================================================================

#[tokio::test]
async fn test_malformed_frame_closes_with_4006() {
    let server = TestServer::start().await.unwrap();
    let mut ws = server.connect().await.unwrap();

    ws.send(Message::Text("{not json".to_string())).await.unwrap();

    let (code, reason) = recv_close(&mut ws).await.unwrap();
    assert_eq!(code, 4006);
    assert!(!reason.is_empty());
    assert!(reason.len() <= 123);

    server.wait_for_connections(0).await.unwrap();

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_wrong_typed_invoke_field_closes_with_4006() {
    let server = TestServer::start().await.unwrap();

    for frame in [
        json!({"type": "invoke", "id": 1, "name": 5}),
        json!({"type": "invoke", "id": 2, "name": "plugin", "pluginName": 5}),
    ] {
        let mut ws = server.connect().await.unwrap();
        send_json(&mut ws, &frame).await.unwrap();

        let (code, reason) = recv_close(&mut ws).await.unwrap();
        assert_eq!(code, 4006);
        assert!(reason.contains("invalid type"), "unexpected reason: {reason}");
    }

    server.wait_for_connections(0).await.unwrap();

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_binary_frames_are_parsed_as_json() {
    let server = TestServer::start().await.unwrap();
    let mut ws = server.connect().await.unwrap();

    let frame = json!({"type": "invoke", "id": "bin", "name": "subscribe-events"});
    ws.send(Message::Binary(frame.to_string().into_bytes()))
        .await
        .unwrap();

    let reply = recv_json(&mut ws).await.unwrap();
    assert_eq!(reply, json!({"type": "response", "id": "bin", "name": "success"}));

    ws.send(Message::Binary(vec![0xff, 0x00])).await.unwrap();
    let (code, _) = recv_close(&mut ws).await.unwrap();
    assert_eq!(code, 4006);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_bad_client_does_not_affect_others() {
    let server = TestServer::start().await.unwrap();
    let mut good = server.connect_subscribed().await.unwrap();
    let mut bad = server.connect_subscribed().await.unwrap();

    bad.send(Message::Text("garbage".to_string())).await.unwrap();
    let (code, _) = recv_close(&mut bad).await.unwrap();
    assert_eq!(code, 4006);
    server.wait_for_subscribers(1).await.unwrap();

    let report = server.gateway().broadcaster().broadcast("after", json!({"ok": true}));
    assert_eq!(report.delivered, 1);
    let event = recv_json(&mut good).await.unwrap();
    assert_eq!(
        event,
        json!({"type": "event", "name": "after", "data": {"ok": true}})
    );

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_non_invoke_frames_are_ignored() {
    let server = TestServer::start().await.unwrap();
    let mut ws = server.connect().await.unwrap();

    send_json(&mut ws, &json!({"type": "response", "id": 1, "name": "success"}))
        .await
        .unwrap();
    send_json(&mut ws, &json!([1, 2, 3])).await.unwrap();
    assert_silent(&mut ws, Duration::from_millis(200)).await.unwrap();

    // The connection is still usable
    send_json(
        &mut ws,
        &json!({"type": "invoke", "id": 9, "name": "subscribe-events"}),
    )
    .await
    .unwrap();
    let reply = recv_json(&mut ws).await.unwrap();
    assert_eq!(reply["name"], "success");

    server.stop().await.unwrap();
}

// ============================================================================
// Commands
// ============================================================================

#[tokio::test]
async fn test_unknown_command() {
    let server = TestServer::start().await.unwrap();
    let mut ws = server.connect().await.unwrap();

    send_json(&mut ws, &json!({"type": "invoke", "id": 3, "name": "reboot"}))
        .await
        .unwrap();

    let reply = recv_json(&mut ws).await.unwrap();
    assert_eq!(
        reply,
        json!({"type": "response", "id": 3, "name": "error", "data": "unknown command invocation"})
    );

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_plugin_errors() {
    let server = TestServer::start().await.unwrap();
    let mut ws = server.connect().await.unwrap();

    send_json(&mut ws, &json!({"type": "invoke", "id": 1, "name": "plugin"}))
        .await
        .unwrap();
    assert_eq!(
        recv_json(&mut ws).await.unwrap(),
        json!({"type": "response", "id": 1, "name": "error", "data": "Must specify pluginName"})
    );

    send_json(
        &mut ws,
        &json!({"type": "invoke", "id": 2, "name": "plugin", "pluginName": "missing"}),
    )
    .await
    .unwrap();
    assert_eq!(
        recv_json(&mut ws).await.unwrap(),
        json!({"type": "response", "id": 2, "name": "error", "data": "Unknown plugin name specified"})
    );

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_plugin_is_invoked_case_insensitively() {
    let server = TestServer::start().await.unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel::<Value>();
    server
        .gateway()
        .plugins()
        .register(
            "foo",
            plugin_fn(move |data| {
                let _ = tx.send(data);
            }),
        )
        .unwrap();

    let mut ws = server.connect().await.unwrap();
    send_json(
        &mut ws,
        &json!({"type": "invoke", "id": 1, "name": "plugin", "pluginName": "Foo", "data": {"level": 3}}),
    )
    .await
    .unwrap();

    let data = tokio::time::timeout(RECV_TIMEOUT, rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(data, json!({"level": 3}));

    // Invoked once, and no response frame for a known plugin
    assert_silent(&mut ws, Duration::from_millis(200)).await.unwrap();
    assert!(rx.try_recv().is_err());

    server.stop().await.unwrap();
}

// ============================================================================
// Broadcast
// ============================================================================

#[tokio::test]
async fn test_broadcast_reaches_only_subscribers() {
    let server = TestServer::start().await.unwrap();

    let mut subscribers = Vec::new();
    for _ in 0..3 {
        subscribers.push(server.connect_subscribed().await.unwrap());
    }
    let mut idle = server.connect().await.unwrap();
    server.wait_for_subscribers(3).await.unwrap();

    let report = server
        .gateway()
        .broadcaster()
        .broadcast("test", json!({"value": 1}));
    assert_eq!(report.delivered, 3);

    for ws in &mut subscribers {
        assert_eq!(
            recv_json(ws).await.unwrap(),
            json!({"type": "event", "name": "test", "data": {"value": 1}})
        );
    }
    assert_silent(&mut idle, Duration::from_millis(200)).await.unwrap();

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_client_close_removes_subscriber() {
    let server = TestServer::start().await.unwrap();
    let mut ws = server.connect_subscribed().await.unwrap();
    server.wait_for_subscribers(1).await.unwrap();

    ws.close(None).await.unwrap();
    server.wait_for_connections(0).await.unwrap();
    server.wait_for_subscribers(0).await.unwrap();

    let report = server.gateway().broadcaster().broadcast("gone", Value::Null);
    assert_eq!(report.delivered, 0);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_events_keep_order_per_connection() {
    let server = TestServer::start().await.unwrap();
    let mut ws = server.connect_subscribed().await.unwrap();
    let broadcaster = Arc::clone(server.gateway().broadcaster());

    for i in 0..20 {
        broadcaster.broadcast("seq", json!(i));
    }
    for i in 0..20 {
        let event = recv_json(&mut ws).await.unwrap();
        assert_eq!(event["data"], json!(i));
    }

    server.stop().await.unwrap();
}

// ============================================================================
// Shutdown
// ============================================================================

#[tokio::test]
async fn test_shutdown_clears_state() {
    let server = TestServer::start().await.unwrap();
    server
        .gateway()
        .plugins()
        .register("lights", plugin_fn(|_| {}))
        .unwrap();
    let _ws = server.connect_subscribed().await.unwrap();

    let state = server.gateway().state().clone();
    server.stop().await.unwrap();

    assert!(!state.broadcaster().is_running());
    assert!(state.plugins().is_empty());
    assert_eq!(state.connection_manager().connection_count(), 0);
}
