//! Gateway server setup
//!
//! Provides the main WebSocket server configuration and routes.

mod handler;
mod state;

pub use handler::gateway_handler;
pub use state::{GatewayState, GatewayStats};

use crate::broadcast::Broadcaster;
use crate::plugins::PluginRegistry;
use axum::{extract::State, routing::get, Json, Router};
use beacon_common::{AppConfig, AppError};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/gateway", get(gateway_handler))
        .route("/health", get(health_check))
        .route("/health/stats", get(health_stats))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Connection and plugin counts
async fn health_stats(State(state): State<GatewayState>) -> Json<GatewayStats> {
    Json(state.stats())
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Create `GatewayState` from configuration
#[must_use]
pub fn create_gateway_state(config: AppConfig) -> GatewayState {
    tracing::info!(
        registration_timeout_ms = config.protocol.registration_timeout_ms,
        outbound_buffer = config.protocol.outbound_buffer,
        "Creating gateway state"
    );
    GatewayState::new(config)
}

/// Bind the configured listener address
pub async fn bind(config: &AppConfig) -> Result<TcpListener, AppError> {
    let addr = config.gateway.address();
    TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::bind(&addr, e))
}

/// Serve the gateway on `listener` until `shutdown` resolves
///
/// The broadcaster is started here if the caller has not already started it. When `shutdown` resolves, live sockets
/// are told to stop and the connection set and plugin table are cleared.
pub async fn serve<F>(listener: TcpListener, state: GatewayState, shutdown: F) -> Result<(), AppError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr().map_err(AppError::Serve)?;
    tracing::info!("Gateway listening on ws://{}/gateway", addr);

    state.broadcaster().start();

    let app = create_app(state.clone());
    let stopping = state.clone();

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("Shutdown requested");
            stopping.shutdown();
        })
        .await
        .map_err(AppError::Serve);

    // Covers the error path where the shutdown future never ran
    state.shutdown();
    tracing::info!("Gateway stopped");

    result
}

/// Run the complete gateway server with configuration until Ctrl-C
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let listener = bind(&config).await?;
    let state = create_gateway_state(config);
    serve(listener, state, ctrl_c()).await
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Handle to a gateway running in the background
///
/// Lets in-process producers reach the broadcaster and plugin registry of a live server.
pub struct GatewayServer {
    local_addr: SocketAddr,
    state: GatewayState,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<(), AppError>>,
}

impl GatewayServer {
    /// Bind the configured address and start serving on a background task
    pub async fn start(config: AppConfig) -> Result<Self, AppError> {
        let listener = bind(&config).await?;
        let local_addr = listener.local_addr().map_err(AppError::Serve)?;
        let state = create_gateway_state(config);

        // Live as soon as the handle is returned, not when the serve task is first polled
        state.broadcaster().start();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(serve(listener, state.clone(), async move {
            let _ = shutdown_rx.await;
        }));

        Ok(Self {
            local_addr,
            state,
            shutdown_tx: Some(shutdown_tx),
            task,
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Shared gateway state
    pub fn state(&self) -> &GatewayState {
        &self.state
    }

    /// Broadcaster for pushing events to subscribed connections
    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        self.state.broadcaster()
    }

    /// Plugin registry for installing handlers
    pub fn plugins(&self) -> &Arc<PluginRegistry> {
        self.state.plugins()
    }

    /// Stop the server and wait for it to finish
    pub async fn shutdown(mut self) -> Result<(), AppError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        match (&mut self.task).await {
            Ok(result) => result,
            Err(e) => Err(AppError::internal(e)),
        }
    }
}

impl std::fmt::Debug for GatewayServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayServer")
            .field("local_addr", &self.local_addr)
            .field("state", &self.state)
            .finish()
    }
}
