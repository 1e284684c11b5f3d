//! Gateway state
//!
//! Application state for the gateway server.

use crate::broadcast::Broadcaster;
use crate::connection::ConnectionManager;
use crate::plugins::PluginRegistry;
use beacon_common::AppConfig;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

/// Point-in-time counts reported by `/health/stats`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GatewayStats {
    pub connections: usize,
    pub subscribers: usize,
    pub plugins: usize,
}

/// Gateway application state
///
/// Holds all shared dependencies for the gateway server. Cloning is cheap.
#[derive(Clone)]
pub struct GatewayState {
    /// Connection manager for WebSocket connections
    connection_manager: Arc<ConnectionManager>,
    /// Plugin handlers addressable by `pluginName`
    plugins: Arc<PluginRegistry>,
    /// Event fan-out to subscribed connections
    broadcaster: Arc<Broadcaster>,
    /// Application configuration
    config: Arc<AppConfig>,
    /// Flips to `true` once the server is shutting down
    shutdown: Arc<watch::Sender<bool>>,
}

impl GatewayState {
    /// Create a new gateway state with an empty plugin registry
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        let connection_manager =
            ConnectionManager::new_shared(config.protocol.registration_timeout());
        let broadcaster = Arc::new(Broadcaster::new(connection_manager.clone()));

        Self {
            connection_manager,
            plugins: Arc::new(PluginRegistry::new("plugin")),
            broadcaster,
            config: Arc::new(config),
            shutdown: Arc::new(watch::Sender::new(false)),
        }
    }

    /// Get the connection manager
    pub fn connection_manager(&self) -> &Arc<ConnectionManager> {
        &self.connection_manager
    }

    /// Get the plugin registry
    pub fn plugins(&self) -> &Arc<PluginRegistry> {
        &self.plugins
    }

    /// Get the broadcaster
    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }

    /// Get the application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Watch for server shutdown; live sockets end when this flips to `true`
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Check if shutdown has begun
    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Snapshot connection, subscriber and plugin counts
    pub fn stats(&self) -> GatewayStats {
        GatewayStats {
            connections: self.connection_manager.connection_count(),
            subscribers: self.connection_manager.subscriber_count(),
            plugins: self.plugins.len(),
        }
    }

    /// Stop broadcasting and release every connection and plugin
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
        self.broadcaster.stop();
        let dropped = self.connection_manager.clear();
        self.plugins.clear();
        tracing::info!(connections = dropped, "Gateway state cleared");
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("connection_manager", &self.connection_manager)
            .field("plugins", &self.plugins.names())
            .field("broadcaster", &self.broadcaster)
            .field("config", &"AppConfig")
            .finish()
    }
}
