//! Connection manager
//!
//! Tracks every live connection and the subset subscribed to events, using DashMap for
//! thread-safe access.

use super::{Connection, ConnectionState, LifecycleError, Outbound};
use dashmap::DashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::mpsc;

/// Manages all active WebSocket connections
pub struct ConnectionManager {
    /// Active connections by connection ID
    connections: DashMap<String, Arc<Connection>>,

    /// Connections with `Role::Events`, by connection ID
    event_subscribers: DashMap<String, Arc<Connection>>,

    /// How long a connection may stay unregistered
    registration_timeout: Duration,
}

impl ConnectionManager {
    /// Create a new connection manager
    #[must_use]
    pub fn new(registration_timeout: Duration) -> Self {
        Self {
            connections: DashMap::new(),
            event_subscribers: DashMap::new(),
            registration_timeout,
        }
    }

    /// Create a new connection manager wrapped in Arc
    #[must_use]
    pub fn new_shared(registration_timeout: Duration) -> Arc<Self> {
        Arc::new(Self::new(registration_timeout))
    }

    /// Get the registration window
    pub fn registration_timeout(&self) -> Duration {
        self.registration_timeout
    }

    /// Track a freshly accepted connection and start its registration watchdog
    ///
    /// If the connection has not subscribed when the window elapses it is closed with
    /// `CloseCode::RegistrationTimeout` and dropped from tracking.
    pub fn accept(self: &Arc<Self>, id: String, sender: mpsc::Sender<Outbound>) -> Arc<Connection> {
        let connection = Connection::new(id.clone(), sender);
        self.connections.insert(id.clone(), connection.clone());

        let manager: Weak<Self> = Arc::downgrade(self);
        let weak_connection = Arc::downgrade(&connection);
        let timeout = self.registration_timeout;

        let watchdog = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;

            let Some(connection) = weak_connection.upgrade() else {
                return;
            };
            if connection.expire_registration() {
                tracing::info!(
                    connection_id = %connection.id(),
                    timeout_ms = timeout.as_millis(),
                    "Registration timed out"
                );
                if let Some(manager) = manager.upgrade() {
                    manager.on_close(connection.id());
                }
            }
        });
        connection.arm_watchdog(watchdog);

        tracing::debug!(connection_id = %id, "Connection accepted");

        connection
    }

    /// Give a connection the `events` role
    ///
    /// Rejected with `AlreadySubscribed` if the role was already set.
    pub fn subscribe_events(&self, connection: &Arc<Connection>) -> Result<(), LifecycleError> {
        connection.promote_to_events()?;

        let id = connection.id().to_string();
        self.event_subscribers.insert(id.clone(), connection.clone());

        // `on_close` marks the connection closed before removing it, so a close racing
        // with this insert is always observed here.
        if connection.state() == ConnectionState::Closed {
            self.event_subscribers.remove(&id);
            return Err(LifecycleError::Closed);
        }

        tracing::debug!(connection_id = %id, "Connection subscribed to events");

        Ok(())
    }

    /// Forget a connection, whatever its role. Safe to call repeatedly.
    pub fn on_close(&self, id: &str) {
        let tracked = self.connections.get(id).map(|c| c.clone());
        if let Some(connection) = &tracked {
            connection.mark_closed();
        }

        let removed = self.connections.remove(id).is_some();
        let was_subscriber = self.event_subscribers.remove(id).is_some();

        if removed {
            tracing::debug!(
                connection_id = %id,
                was_subscriber = was_subscriber,
                "Connection removed"
            );
        }
    }

    /// Check if a connection is tracked
    pub fn has_connection(&self, id: &str) -> bool {
        self.connections.contains_key(id)
    }

    /// Check if a connection is subscribed to events
    pub fn is_subscriber(&self, id: &str) -> bool {
        self.event_subscribers.contains_key(id)
    }

    /// Snapshot of all event subscribers
    pub fn event_subscribers(&self) -> Vec<Arc<Connection>> {
        self.event_subscribers.iter().map(|r| r.clone()).collect()
    }

    /// Get the total number of tracked connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Get the number of event subscribers
    pub fn subscriber_count(&self) -> usize {
        self.event_subscribers.len()
    }

    /// Drop every connection, cancelling pending watchdogs
    pub fn clear(&self) -> usize {
        let ids: Vec<String> = self.connections.iter().map(|r| r.key().clone()).collect();
        let count = ids.len();

        for id in ids {
            self.on_close(&id);
        }

        if count > 0 {
            tracing::info!(count = count, "Cleared tracked connections");
        }

        count
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connections", &self.connections.len())
            .field("event_subscribers", &self.event_subscribers.len())
            .field("registration_timeout", &self.registration_timeout)
            .finish()
    }
}
