//! `subscribe-events` handler

use super::{InvokeError, InvokeOutcome};
use crate::connection::Connection;
use crate::server::GatewayState;
use std::sync::Arc;

/// Handles `subscribe-events` invokes
pub struct SubscribeHandler;

impl SubscribeHandler {
    /// Give the connection the `events` role
    pub fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
    ) -> Result<InvokeOutcome, InvokeError> {
        state.connection_manager().subscribe_events(connection)?;

        tracing::info!(
            connection_id = %connection.id(),
            registered_after_ms = connection.age().as_millis(),
            "Client subscribed to events"
        );

        Ok(InvokeOutcome::Success)
    }
}
