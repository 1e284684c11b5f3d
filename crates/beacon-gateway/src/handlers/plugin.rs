//! `plugin` handler

use super::{InvokeError, InvokeOutcome};
use crate::connection::Connection;
use crate::protocol::InvokeRequest;
use crate::server::GatewayState;
use std::sync::Arc;

/// Handles `plugin` invokes
pub struct PluginInvokeHandler;

impl PluginInvokeHandler {
    /// Look up the named plugin and hand it the frame's data
    ///
    /// The handler runs on its own task. No response is sent when it is found; the
    /// client only hears back about missing or unknown plugin names.
    pub fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
        invoke: InvokeRequest,
    ) -> Result<InvokeOutcome, InvokeError> {
        let plugin_name = match invoke.plugin_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => return Err(InvokeError::MissingPluginName),
        };

        let entry = state
            .plugins()
            .lookup(plugin_name)
            .ok_or(InvokeError::UnknownPlugin)?;

        tracing::debug!(
            connection_id = %connection.id(),
            plugin = %entry.name,
            "Dispatching plugin invocation"
        );

        let handler = entry.handler;
        let plugin = entry.name;
        let data = invoke.data;
        let task = tokio::spawn(async move { handler.invoke(data).await });

        // Observe the task only to log a panic; the client is never told.
        tokio::spawn(async move {
            if let Err(e) = task.await {
                tracing::warn!(plugin = %plugin, error = %e, "Plugin handler failed");
            }
        });

        Ok(InvokeOutcome::NoReply)
    }
}
