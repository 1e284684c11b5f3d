//! WebSocket handler
//!
//! Handles WebSocket connections and message processing.

use crate::connection::{Connection, Outbound};
use crate::handlers::MessageDispatcher;
use crate::server::GatewayState;
use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// How the read half of a socket stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecvOutcome {
    /// Client sent a close frame
    ClientClosed,
    /// Stream ended without a close frame
    StreamEnded,
    /// We queued a close frame; the writer should flush it
    ForcedClose,
    /// Transport failure
    TransportError,
}

/// WebSocket gateway handler
pub async fn gateway_handler(
    State(state): State<GatewayState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(state: GatewayState, socket: WebSocket) {
    let connection_id = Uuid::new_v4().to_string();
    let protocol = &state.config().protocol;
    let close_grace = protocol.close_grace();

    let (tx, rx) = mpsc::channel::<Outbound>(protocol.outbound_buffer.max(1));
    let connection = state.connection_manager().accept(connection_id.clone(), tx);

    tracing::info!(connection_id = %connection_id, "WebSocket connection established");

    let mut shutdown = state.shutdown_signal();
    let (ws_sink, ws_stream) = socket.split();

    let mut send_task = tokio::spawn(write_outbound(connection_id.clone(), ws_sink, rx));
    let mut recv_task = tokio::spawn(read_inbound(state.clone(), connection.clone(), ws_stream));

    tokio::select! {
        result = &mut recv_task => {
            match result {
                Ok(RecvOutcome::ForcedClose) => {
                    // Give the writer a moment to flush the close frame
                    if tokio::time::timeout(close_grace, &mut send_task).await.is_err() {
                        tracing::debug!(
                            connection_id = %connection_id,
                            "Close frame not flushed in time"
                        );
                        send_task.abort();
                    }
                }
                Ok(outcome) => {
                    tracing::debug!(
                        connection_id = %connection_id,
                        outcome = ?outcome,
                        "Receive task ended"
                    );
                    send_task.abort();
                }
                Err(e) => {
                    tracing::warn!(
                        connection_id = %connection_id,
                        error = %e,
                        "Receive task failed"
                    );
                    send_task.abort();
                }
            }
        }
        _ = &mut send_task => {
            tracing::debug!(connection_id = %connection_id, "Send task ended");
            recv_task.abort();
        }
        _ = wait_for_shutdown(&mut shutdown) => {
            tracing::debug!(connection_id = %connection_id, "Server shutting down");
            recv_task.abort();
            send_task.abort();
        }
    }

    state.connection_manager().on_close(&connection_id);

    tracing::info!(
        connection_id = %connection_id,
        lifetime_ms = connection.age().as_millis(),
        "WebSocket connection closed"
    );
}

/// Read frames until the client leaves or a frame forces a close
async fn read_inbound(
    state: GatewayState,
    connection: Arc<Connection>,
    mut stream: SplitStream<WebSocket>,
) -> RecvOutcome {
    while let Some(msg) = stream.next().await {
        if !connection.is_open() {
            return RecvOutcome::ForcedClose;
        }

        let raw = match msg {
            Ok(Message::Text(text)) => text.into_bytes(),
            Ok(Message::Binary(data)) => data,
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
            Ok(Message::Close(frame)) => {
                tracing::info!(
                    connection_id = %connection.id(),
                    code = frame.as_ref().map(|f| f.code),
                    "Client closed connection"
                );
                return RecvOutcome::ClientClosed;
            }
            Err(e) => {
                tracing::warn!(
                    connection_id = %connection.id(),
                    error = %e,
                    "WebSocket error"
                );
                return RecvOutcome::TransportError;
            }
        };

        if let Err(e) = MessageDispatcher::dispatch(&state, &connection, &raw).await {
            let code = e.to_close_code();
            tracing::debug!(
                connection_id = %connection.id(),
                close_code = %code,
                error = %e,
                "Closing connection due to error"
            );
            connection.close(code, &e.to_string());
            return RecvOutcome::ForcedClose;
        }
    }

    RecvOutcome::StreamEnded
}

/// Drain the outbound queue into the socket; a close frame ends the writer
async fn write_outbound(
    connection_id: String,
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Outbound>,
) {
    while let Some(outbound) = rx.recv().await {
        let (message, last) = match outbound {
            Outbound::Frame(json) => (Message::Text(json), false),
            Outbound::Close { code, reason } => (
                Message::Close(Some(CloseFrame {
                    code,
                    reason: reason.into(),
                })),
                true,
            ),
        };

        if let Err(e) = sink.send(message).await {
            tracing::warn!(
                connection_id = %connection_id,
                error = %e,
                "Failed to send message to WebSocket"
            );
            return;
        }

        if last {
            break;
        }
    }

    let _ = sink.close().await;
}

async fn wait_for_shutdown(signal: &mut tokio::sync::watch::Receiver<bool>) {
    if signal.wait_for(|stopping| *stopping).await.is_err() {
        // Sender dropped with the state; nothing will ever signal
        std::future::pending::<()>().await;
    }
}
