//! Frame handlers
//!
//! Parses inbound frames and routes `invoke` commands to their handlers.

mod error;
mod plugin;
mod subscribe;

pub use error::{HandlerError, HandlerResult, InvokeError};
pub use plugin::PluginInvokeHandler;
pub use subscribe::SubscribeHandler;

use crate::connection::Connection;
use crate::protocol::{GatewayMessage, InboundFrame, InvokeCommand};
use crate::server::GatewayState;
use std::sync::Arc;

/// What a successful invoke handler wants sent back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeOutcome {
    /// Reply with `response{name: "success"}`
    Success,
    /// Send nothing
    NoReply,
}

/// Dispatch incoming client frames to appropriate handlers
pub struct MessageDispatcher;

impl MessageDispatcher {
    /// Handle one raw frame from a connection
    ///
    /// `Err` means the frame was a protocol violation and the connection must be closed.
    /// Client mistakes are answered with an error response and return `Ok`.
    pub async fn dispatch(
        state: &GatewayState,
        connection: &Arc<Connection>,
        raw: &[u8],
    ) -> HandlerResult<()> {
        let invoke = match InboundFrame::parse(raw)? {
            InboundFrame::Invoke(invoke) => invoke,
            InboundFrame::Ignored(kind) => {
                tracing::trace!(
                    connection_id = %connection.id(),
                    frame_type = ?kind,
                    "Ignoring non-invoke frame"
                );
                return Ok(());
            }
        };

        let command = InvokeCommand::from_name(invoke.name.as_deref());
        let id = invoke.id.clone();

        tracing::trace!(
            connection_id = %connection.id(),
            id = %id,
            command = %command,
            "Received invoke"
        );

        let outcome = match command {
            InvokeCommand::SubscribeEvents => SubscribeHandler::handle(state, connection),
            InvokeCommand::Plugin => PluginInvokeHandler::handle(state, connection, invoke),
            InvokeCommand::Unknown => Err(InvokeError::UnknownCommand),
        };

        let reply = match outcome {
            Ok(InvokeOutcome::Success) => GatewayMessage::success(id),
            Ok(InvokeOutcome::NoReply) => return Ok(()),
            Err(e) if e.is_reportable() => {
                tracing::debug!(
                    connection_id = %connection.id(),
                    id = %id,
                    error = %e,
                    "Invoke rejected"
                );
                GatewayMessage::error(id, e.to_string())
            }
            Err(_) => return Ok(()),
        };

        connection.send(&reply).await?;
        Ok(())
    }
}
