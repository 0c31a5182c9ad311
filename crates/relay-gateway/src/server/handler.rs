//! WebSocket handler
//!
//! Runs the per-connection protocol state machine: origin check, join phase
//! under a deadline, then the authenticated message loop with size and rate
//! checks ahead of parsing.

use crate::connection::{Connection, ConnectionState, OutboundFrame};
use crate::handlers::MessageDispatcher;
use crate::protocol::{CloseCode, Envelope};
use crate::server::RelayState;
use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Channel buffer size for outgoing frames
const OUTBOUND_BUFFER_SIZE: usize = 256;

/// Headroom above the protocol size ceiling for the transport-level cap.
/// Frames between the ceiling and the cap still arrive, so they can be
/// refused with a message-too-large close instead of a bare transport error.
const TRANSPORT_SIZE_SLACK: usize = 64 * 1024;

/// WebSocket relay handler
pub async fn relay_handler(
    State(state): State<RelayState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let origin = headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    if !state.handshake().origin_allowed(origin.as_deref()) {
        tracing::warn!(origin = ?origin, "Connection rejected: origin not allowed");
        return StatusCode::FORBIDDEN.into_response();
    }

    let transport_cap = state
        .config()
        .limits
        .max_message_bytes
        .saturating_add(TRANSPORT_SIZE_SLACK);

    ws.max_message_size(transport_cap)
        .max_frame_size(transport_cap)
        .on_upgrade(|socket| handle_socket(state, socket))
        .into_response()
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(state: RelayState, socket: WebSocket) {
    let connection_id = uuid::Uuid::new_v4().to_string();

    let (tx, rx) = mpsc::channel::<OutboundFrame>(OUTBOUND_BUFFER_SIZE);
    let connection = Connection::new(connection_id.clone(), tx);
    state.registry().track(Arc::clone(&connection));

    tracing::info!(connection_id = %connection_id, "WebSocket connection established");

    let (ws_sink, ws_stream) = socket.split();

    let send_task = tokio::spawn(write_loop(ws_sink, rx, connection_id.clone()));

    let state_recv = state.clone();
    let connection_recv = Arc::clone(&connection);
    let mut recv_task = tokio::spawn(async move {
        read_loop(&state_recv, &connection_recv, ws_stream).await
    });

    // Wait for either side to finish
    tokio::select! {
        result = &mut recv_task => {
            if let Ok(Some(close_code)) = result {
                tracing::debug!(
                    connection_id = %connection_id,
                    close_code = %close_code,
                    "Connection closing"
                );
                // The writer drains the close frame and exits on its own
                connection.close(close_code);
            }
        }
        _ = send_task => {
            // A server-initiated close is terminal; stop reading so frames
            // racing the close are never dispatched
            recv_task.abort();
            tracing::debug!(connection_id = %connection_id, "Writer ended");
        }
    }

    cleanup_connection(&state, &connection);
}

/// Drain outbound frames to the socket; a close frame ends the loop
async fn write_loop(
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<OutboundFrame>,
    connection_id: String,
) {
    while let Some(frame) = rx.recv().await {
        match frame {
            OutboundFrame::Envelope(envelope) => {
                let Ok(json) = envelope.to_json() else {
                    continue;
                };
                if ws_sink.send(Message::Text(json)).await.is_err() {
                    tracing::warn!(
                        connection_id = %connection_id,
                        "Failed to write to WebSocket"
                    );
                    break;
                }
            }
            OutboundFrame::Close(code) => {
                // Best-effort final error envelope before the close frame
                if let Ok(json) = Envelope::error(code, code.description()).to_json() {
                    let _ = ws_sink.send(Message::Text(json)).await;
                }
                let _ = ws_sink
                    .send(Message::Close(Some(CloseFrame {
                        code: code.as_u16(),
                        reason: code.description().into(),
                    })))
                    .await;
                break;
            }
        }
    }

    let _ = ws_sink.close().await;
}

/// Process inbound frames until the connection ends or must be closed
async fn read_loop(
    state: &RelayState,
    connection: &Arc<Connection>,
    mut ws_stream: impl futures_util::Stream<Item = Result<Message, axum::Error>> + Unpin,
) -> Option<CloseCode> {
    let join_deadline = tokio::time::Instant::now() + state.handshake().join_timeout();

    loop {
        // The join deadline applies until a join attempt has been processed;
        // a failed attempt closes the connection on its own.
        let msg = if connection.is_joined() {
            ws_stream.next().await
        } else {
            match tokio::time::timeout_at(join_deadline, ws_stream.next()).await {
                Ok(msg) => msg,
                Err(_) => {
                    tracing::info!(
                        connection_id = %connection.id(),
                        "No join within the deadline"
                    );
                    return Some(CloseCode::JoinTimeout);
                }
            }
        };

        let Some(msg) = msg else {
            return None;
        };

        match msg {
            Ok(Message::Text(text)) => {
                if let Some(close_code) = handle_text_frame(state, connection, text.as_str()).await
                {
                    return Some(close_code);
                }
            }
            Ok(Message::Binary(_)) => {
                tracing::debug!(
                    connection_id = %connection.id(),
                    "Binary frames not supported"
                );
                return Some(CloseCode::ProtocolViolation);
            }
            Ok(Message::Ping(_)) => {
                // Pong is sent automatically by axum
                tracing::trace!(connection_id = %connection.id(), "Transport ping");
            }
            Ok(Message::Pong(_)) => {
                connection.record_liveness();
            }
            Ok(Message::Close(_)) => {
                tracing::info!(connection_id = %connection.id(), "Client closed connection");
                return None;
            }
            Err(e) => {
                tracing::warn!(
                    connection_id = %connection.id(),
                    error = %e,
                    "WebSocket error"
                );
                return Some(CloseCode::UnknownError);
            }
        }
    }
}

/// Size check, rate limit, parse, dispatch — strictly in that order
async fn handle_text_frame(
    state: &RelayState,
    connection: &Arc<Connection>,
    text: &str,
) -> Option<CloseCode> {
    // A close already requested for this connection is terminal
    if !connection.is_open() {
        tracing::trace!(
            connection_id = %connection.id(),
            "Frame after close dropped"
        );
        return None;
    }

    // Size ceiling applies before the frame is ever parsed
    if text.len() > state.config().limits.max_message_bytes {
        tracing::warn!(
            connection_id = %connection.id(),
            size = text.len(),
            "Message exceeds size ceiling"
        );
        return Some(CloseCode::MessageTooLarge);
    }

    if !state.rate_limiter().check(connection.id()) {
        tracing::warn!(
            connection_id = %connection.id(),
            "Rate limit exceeded"
        );
        return Some(CloseCode::RateLimitExceeded);
    }

    let envelope = match Envelope::from_json(text) {
        Ok(env) => env,
        Err(e) => {
            tracing::debug!(
                connection_id = %connection.id(),
                error = %e,
                "Failed to parse envelope"
            );
            return Some(CloseCode::ProtocolViolation);
        }
    };

    tracing::trace!(
        connection_id = %connection.id(),
        kind = %envelope.kind,
        "Envelope received"
    );

    match MessageDispatcher::dispatch(state, connection, envelope).await {
        Ok(code) => code,
        Err(e) => {
            tracing::warn!(
                connection_id = %connection.id(),
                error = %e,
                "Handler error"
            );
            Some(e.to_close_code())
        }
    }
}

/// Remove a connection from every table on disconnect
fn cleanup_connection(state: &RelayState, connection: &Arc<Connection>) {
    tracing::info!(
        connection_id = %connection.id(),
        session_id = ?connection.session_id(),
        age_ms = connection.age().as_millis() as u64,
        "Cleaning up connection"
    );

    connection.set_state(ConnectionState::Disconnected);
    state.registry().remove(connection.id());
    state.rate_limiter().forget(connection.id());
}
