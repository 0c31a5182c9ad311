//! End-to-end relay tests
//!
//! Each test spins up an in-process relay on an ephemeral port and drives it
//! with real WebSocket clients.

use anyhow::Result;
use futures_util::SinkExt;
use integration_tests::{
    assert_silent, join_envelope, recv_close_code, recv_envelope, send_join, send_json, test_config,
    TestRelay,
};
use serde_json::json;
use tokio_tungstenite::tungstenite::Message;

#[tokio::test]
async fn health_endpoint_returns_ok() -> Result<()> {
    let relay = TestRelay::start().await?;

    let response = reqwest::get(format!("{}/health", relay.base_url())).await?;
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await?, "OK");

    Ok(())
}

#[tokio::test]
async fn join_with_valid_credentials_receives_ack() -> Result<()> {
    let relay = TestRelay::start().await?;
    let credentials = relay.create_session();

    let mut ws = relay.connect().await?;
    send_join(&mut ws, &credentials.id, &credentials.token, "producer").await?;

    let ack = recv_envelope(&mut ws).await?;
    assert_eq!(ack["type"], "joinAck");
    assert_eq!(ack["sessionId"], credentials.id);
    assert_eq!(ack["payload"]["status"], "connected");
    assert!(ack["payload"]["connectionId"].is_string());
    assert_eq!(ack["protocolVersion"], "1.0.0");

    Ok(())
}

#[tokio::test]
async fn join_with_wrong_token_closes_with_4003() -> Result<()> {
    let relay = TestRelay::start().await?;
    let credentials = relay.create_session();

    let mut ws = relay.connect().await?;
    send_join(&mut ws, &credentials.id, "not-the-token", "producer").await?;

    assert_eq!(recv_close_code(&mut ws).await?, 4003);
    Ok(())
}

#[tokio::test]
async fn join_with_unknown_session_closes_with_4003() -> Result<()> {
    let relay = TestRelay::start().await?;

    let mut ws = relay.connect().await?;
    send_join(&mut ws, "no-such-session", "token", "consumer").await?;

    assert_eq!(recv_close_code(&mut ws).await?, 4003);
    Ok(())
}

#[tokio::test]
async fn join_with_unknown_role_closes_with_4003() -> Result<()> {
    let relay = TestRelay::start().await?;
    let credentials = relay.create_session();

    let mut ws = relay.connect().await?;
    send_join(&mut ws, &credentials.id, &credentials.token, "spectator").await?;

    assert_eq!(recv_close_code(&mut ws).await?, 4003);
    Ok(())
}

#[tokio::test]
async fn second_join_on_same_connection_closes_with_4001() -> Result<()> {
    let relay = TestRelay::start().await?;
    let credentials = relay.create_session();

    let mut ws = relay.connect_joined(&credentials, "producer").await?;
    send_join(&mut ws, &credentials.id, &credentials.token, "producer").await?;

    assert_eq!(recv_close_code(&mut ws).await?, 4001);
    Ok(())
}

#[tokio::test]
async fn producer_capacity_is_enforced() -> Result<()> {
    let mut config = test_config();
    config.session.max_producers = 1;
    let relay = TestRelay::start_with_config(config).await?;
    let credentials = relay.create_session();

    let _first = relay.connect_joined(&credentials, "producer").await?;

    let mut second = relay.connect().await?;
    send_join(&mut second, &credentials.id, &credentials.token, "producer").await?;
    assert_eq!(recv_close_code(&mut second).await?, 4003);

    Ok(())
}

#[tokio::test]
async fn event_routes_to_consumers_only() -> Result<()> {
    let relay = TestRelay::start().await?;
    let credentials = relay.create_session();

    let mut producer = relay.connect_joined(&credentials, "producer").await?;
    let mut other_producer = relay.connect_joined(&credentials, "producer").await?;
    let mut consumer = relay.connect_joined(&credentials, "consumer").await?;

    send_json(
        &mut producer,
        &json!({
            "type": "event",
            "sessionId": credentials.id,
            "sourceRole": "producer",
            "protocolVersion": "1.0.0",
            "payload": {"kind": "reload"},
        }),
    )
    .await?;

    let received = recv_envelope(&mut consumer).await?;
    assert_eq!(received["type"], "event");
    assert_eq!(received["payload"]["kind"], "reload");
    // Missing timestamps are stamped by the relay
    assert!(received["timestamp"].is_i64());

    // Other producers must not see the event
    assert_silent(&mut other_producer).await?;

    Ok(())
}

#[tokio::test]
async fn data_fans_out_to_everyone_except_sender() -> Result<()> {
    let relay = TestRelay::start().await?;
    let credentials = relay.create_session();

    let mut sender = relay.connect_joined(&credentials, "producer").await?;
    let mut other_producer = relay.connect_joined(&credentials, "producer").await?;
    let mut consumer = relay.connect_joined(&credentials, "consumer").await?;

    send_json(
        &mut sender,
        &json!({
            "type": "data",
            "sessionId": credentials.id,
            "protocolVersion": "1.0.0",
            "payload": {"chunk": 1},
        }),
    )
    .await?;

    assert_eq!(recv_envelope(&mut consumer).await?["payload"]["chunk"], 1);
    assert_eq!(
        recv_envelope(&mut other_producer).await?["payload"]["chunk"],
        1
    );
    assert_silent(&mut sender).await?;

    Ok(())
}

#[tokio::test]
async fn events_do_not_leak_across_sessions() -> Result<()> {
    let relay = TestRelay::start().await?;
    let first = relay.create_session();
    let second = relay.create_session();

    let mut producer = relay.connect_joined(&first, "producer").await?;
    let mut outsider = relay.connect_joined(&second, "consumer").await?;

    send_json(
        &mut producer,
        &json!({
            "type": "event",
            "sessionId": first.id,
            "protocolVersion": "1.0.0",
            "payload": {"kind": "ping"},
        }),
    )
    .await?;

    assert_silent(&mut outsider).await?;
    Ok(())
}

#[tokio::test]
async fn no_join_within_deadline_closes_with_4002() -> Result<()> {
    let mut config = test_config();
    config.limits.join_timeout_ms = 200;
    let relay = TestRelay::start_with_config(config).await?;

    let mut ws = relay.connect().await?;
    assert_eq!(recv_close_code(&mut ws).await?, 4002);

    Ok(())
}

#[tokio::test]
async fn oversized_message_closes_with_4004() -> Result<()> {
    let mut config = test_config();
    config.limits.max_message_bytes = 1024;
    let relay = TestRelay::start_with_config(config).await?;
    let credentials = relay.create_session();

    let mut ws = relay.connect_joined(&credentials, "producer").await?;

    // The envelope never parses; size is checked first
    let big = "x".repeat(2048);
    ws.send(Message::Text(big)).await?;

    assert_eq!(recv_close_code(&mut ws).await?, 4004);
    Ok(())
}

#[tokio::test]
async fn rate_limit_violation_closes_with_4005() -> Result<()> {
    let mut config = test_config();
    config.limits.rate_max_per_window = 3;
    config.limits.rate_window_ms = 60_000;
    let relay = TestRelay::start_with_config(config).await?;
    let credentials = relay.create_session();

    // The join consumes one slot of the window
    let mut ws = relay.connect_joined(&credentials, "producer").await?;

    let ping = json!({"type": "ping", "protocolVersion": "1.0.0"});
    send_json(&mut ws, &ping).await?;
    send_json(&mut ws, &ping).await?;
    send_json(&mut ws, &ping).await?;

    assert_eq!(recv_close_code(&mut ws).await?, 4005);
    Ok(())
}

#[tokio::test]
async fn binary_frame_closes_with_4001() -> Result<()> {
    let relay = TestRelay::start().await?;
    let credentials = relay.create_session();

    let mut ws = relay.connect_joined(&credentials, "producer").await?;
    ws.send(Message::Binary(vec![0x01, 0x02, 0x03])).await?;

    assert_eq!(recv_close_code(&mut ws).await?, 4001);
    Ok(())
}

#[tokio::test]
async fn malformed_json_closes_with_4001() -> Result<()> {
    let relay = TestRelay::start().await?;
    let credentials = relay.create_session();

    let mut ws = relay.connect_joined(&credentials, "producer").await?;
    ws.send(Message::Text("{not json".to_string())).await?;

    assert_eq!(recv_close_code(&mut ws).await?, 4001);
    Ok(())
}

#[tokio::test]
async fn message_before_join_closes_with_4001() -> Result<()> {
    let relay = TestRelay::start().await?;

    let mut ws = relay.connect().await?;
    send_json(
        &mut ws,
        &json!({
            "type": "event",
            "protocolVersion": "1.0.0",
            "payload": {},
        }),
    )
    .await?;

    assert_eq!(recv_close_code(&mut ws).await?, 4001);
    Ok(())
}

#[tokio::test]
async fn ping_is_answered_with_pong() -> Result<()> {
    let relay = TestRelay::start().await?;
    let credentials = relay.create_session();

    let mut ws = relay.connect_joined(&credentials, "consumer").await?;
    send_json(&mut ws, &json!({"type": "ping", "protocolVersion": "1.0.0"})).await?;

    let pong = recv_envelope(&mut ws).await?;
    assert_eq!(pong["type"], "pong");

    Ok(())
}

#[tokio::test]
async fn close_frame_carries_error_envelope_first() -> Result<()> {
    let relay = TestRelay::start().await?;
    let credentials = relay.create_session();

    let mut ws = relay.connect().await?;
    send_join(&mut ws, &credentials.id, "wrong", "producer").await?;

    // An error envelope precedes the close frame
    let error = recv_envelope(&mut ws).await?;
    assert_eq!(error["type"], "error");
    assert_eq!(error["payload"]["code"], 4003);

    assert_eq!(recv_close_code(&mut ws).await?, 4003);
    Ok(())
}

#[tokio::test]
async fn disconnect_frees_capacity() -> Result<()> {
    let mut config = test_config();
    config.session.max_consumers = 1;
    let relay = TestRelay::start_with_config(config).await?;
    let credentials = relay.create_session();

    let first = relay.connect_joined(&credentials, "consumer").await?;
    drop(first);

    // Give the server a moment to observe the disconnect
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let mut second = relay.connect().await?;
    send_join(&mut second, &credentials.id, &credentials.token, "consumer").await?;
    let ack = recv_envelope(&mut second).await?;
    assert_eq!(ack["type"], "joinAck");

    Ok(())
}

#[tokio::test]
async fn join_envelope_shape_matches_wire_format() {
    let envelope = join_envelope("sess", "tok", "producer");
    assert_eq!(envelope["type"], "join");
    assert_eq!(envelope["payload"]["role"], "producer");
    assert_eq!(envelope["protocolVersion"], "1.0.0");
}
