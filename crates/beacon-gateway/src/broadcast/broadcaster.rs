//! Event broadcaster
//!
//! Fans one serialized event frame out to every connection subscribed to events.

use crate::connection::ConnectionManager;
use crate::protocol::GatewayMessage;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Outcome of a single broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    /// Frames queued for delivery
    pub delivered: usize,
    /// Subscribers whose transport was not open
    pub skipped: usize,
    /// Subscribers whose queue rejected the frame
    pub failed: usize,
}

/// Pushes event frames to every `events` connection
pub struct Broadcaster {
    /// Connection manager for finding subscribers
    connection_manager: Arc<ConnectionManager>,
    /// Set while the server is listening
    running: AtomicBool,
}

impl Broadcaster {
    /// Create a new broadcaster; it stays inert until [`Broadcaster::start`]
    pub fn new(connection_manager: Arc<ConnectionManager>) -> Self {
        Self {
            connection_manager,
            running: AtomicBool::new(false),
        }
    }

    /// Enable delivery (called once the listener is bound). Idempotent.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::trace!("Broadcaster already running");
            return;
        }
        tracing::info!("Broadcaster started");
    }

    /// Disable delivery
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            tracing::info!("Broadcaster stopped");
        }
    }

    /// Check if the broadcaster is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Send `{type: "event", name, data}` to every subscribed connection
    ///
    /// A no-op before the server starts. Each recipient is independent: a closed or
    /// backed-up connection is logged and counted, never propagated.
    pub fn broadcast(&self, event_name: &str, payload: Value) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        if !self.is_running() {
            tracing::trace!(event = %event_name, "Broadcaster not running, event dropped");
            return report;
        }

        let json = match GatewayMessage::event(event_name, payload).to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(event = %event_name, error = %e, "Failed to serialize event");
                return report;
            }
        };

        for connection in self.connection_manager.event_subscribers() {
            if !connection.is_open() {
                report.skipped += 1;
                continue;
            }

            match connection.try_send_text(json.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        connection_id = %connection.id(),
                        event = %event_name,
                        error = %e,
                        "Failed to deliver event"
                    );
                }
            }
        }

        tracing::trace!(
            event = %event_name,
            delivered = report.delivered,
            skipped = report.skipped,
            failed = report.failed,
            "Event broadcast"
        );

        report
    }
}

impl std::fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster")
            .field("running", &self.is_running())
            .finish()
    }
}
