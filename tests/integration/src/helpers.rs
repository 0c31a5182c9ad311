//! Test helpers for integration tests
//!
//! Provides utilities for spawning an in-process relay server, minting
//! sessions, and exchanging envelopes over real WebSocket connections.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use relay_common::RelayConfig;
use relay_gateway::session::SessionCredentials;
use relay_gateway::{create_app, RelayState};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// WebSocket client stream type used by the tests
pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Timeout applied to every expected receive
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Window in which we assert that no message arrives
const SILENCE_WINDOW: Duration = Duration::from_millis(300);

/// Test relay instance that manages lifecycle
pub struct TestRelay {
    pub addr: SocketAddr,
    pub state: RelayState,
    _handle: JoinHandle<()>,
}

impl TestRelay {
    /// Start a relay with the default test configuration
    pub async fn start() -> Result<Self> {
        Self::start_with_config(test_config()).await
    }

    /// Start a relay with custom config
    pub async fn start_with_config(config: RelayConfig) -> Result<Self> {
        let state = RelayState::new(config);
        state.start_background_tasks();

        let app = create_app(state.clone());

        // Ephemeral port keeps parallel tests from colliding
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Ok(Self {
            addr,
            state,
            _handle: handle,
        })
    }

    /// Base URL for HTTP endpoints
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// WebSocket URL for the relay endpoint
    pub fn ws_url(&self) -> String {
        format!("ws://{}/relay", self.addr)
    }

    /// Mint a fresh session directly against the store
    pub fn create_session(&self) -> SessionCredentials {
        self.state.sessions().create()
    }

    /// Open a raw WebSocket connection to the relay
    pub async fn connect(&self) -> Result<WsClient> {
        let (ws, _) = connect_async(self.ws_url()).await?;
        Ok(ws)
    }

    /// Open a connection and complete the join handshake for `role`
    pub async fn connect_joined(
        &self,
        credentials: &SessionCredentials,
        role: &str,
    ) -> Result<WsClient> {
        let mut ws = self.connect().await?;
        send_join(&mut ws, &credentials.id, &credentials.token, role).await?;
        let ack = recv_envelope(&mut ws).await?;
        anyhow::ensure!(
            ack["type"] == "joinAck",
            "expected joinAck, got: {ack}"
        );
        Ok(ws)
    }
}

/// Test configuration with liveness probing pushed out of the way
pub fn test_config() -> RelayConfig {
    let mut config = RelayConfig::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    // Keep the health monitor and sweeper quiet during short tests
    config.limits.ping_interval_ms = 60_000;
    config.limits.pong_timeout_ms = 60_000;
    config.session.sweep_interval_secs = 600;
    config
}

/// Send an arbitrary JSON value as a text frame
pub async fn send_json(ws: &mut WsClient, value: &Value) -> Result<()> {
    ws.send(Message::Text(value.to_string())).await?;
    Ok(())
}

/// Build a join envelope
pub fn join_envelope(session_id: &str, token: &str, role: &str) -> Value {
    json!({
        "type": "join",
        "sessionId": session_id,
        "protocolVersion": "1.0.0",
        "payload": {
            "sessionId": session_id,
            "token": token,
            "role": role,
        },
    })
}

/// Send a join envelope
pub async fn send_join(ws: &mut WsClient, session_id: &str, token: &str, role: &str) -> Result<()> {
    send_json(ws, &join_envelope(session_id, token, role)).await
}

/// Receive the next text frame as parsed JSON
pub async fn recv_envelope(ws: &mut WsClient) -> Result<Value> {
    let deadline = tokio::time::sleep(RECV_TIMEOUT);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            () = &mut deadline => anyhow::bail!("timed out waiting for an envelope"),
            msg = ws.next() => match msg {
                Some(Ok(Message::Text(text))) => return Ok(serde_json::from_str(&text)?),
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(other)) => anyhow::bail!("unexpected frame: {other:?}"),
                Some(Err(e)) => return Err(e.into()),
                None => anyhow::bail!("connection closed while waiting for an envelope"),
            },
        }
    }
}

/// Read frames until the server closes the connection; returns the close code
///
/// Error envelopes sent ahead of the close frame are skipped.
pub async fn recv_close_code(ws: &mut WsClient) -> Result<u16> {
    let deadline = tokio::time::sleep(RECV_TIMEOUT);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            () = &mut deadline => anyhow::bail!("timed out waiting for a close frame"),
            msg = ws.next() => match msg {
                Some(Ok(Message::Close(Some(frame)))) => return Ok(frame.code.into()),
                Some(Ok(Message::Close(None))) => anyhow::bail!("close frame carried no code"),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => anyhow::bail!("connection ended without a close frame"),
            },
        }
    }
}

/// Assert that no text frame arrives within the silence window
pub async fn assert_silent(ws: &mut WsClient) -> Result<()> {
    let outcome = tokio::time::timeout(SILENCE_WINDOW, ws.next()).await;
    match outcome {
        Err(_) => Ok(()),
        Ok(Some(Ok(Message::Text(text)))) => anyhow::bail!("unexpected message: {text}"),
        Ok(other) => anyhow::bail!("unexpected frame: {other:?}"),
    }
}
