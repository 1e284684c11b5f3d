//! Test helpers for integration tests
//!
//! Provides utilities for spawning test servers, opening WebSocket clients, and exchanging
//! JSON frames.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use beacon_common::AppConfig;
use beacon_gateway::GatewayServer;
use futures_util::{SinkExt, StreamExt};
use reqwest::{Client, Response};
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// How long a helper waits for the server before failing the test
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Client side of a gateway socket
pub type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    server: GatewayServer,
}

impl TestServer {
    /// Start a new test server on an ephemeral port
    pub async fn start() -> Result<Self> {
        Self::start_with_config(test_config()).await
    }

    /// Start a test server with custom config
    pub async fn start_with_config(config: AppConfig) -> Result<Self> {
        let server = GatewayServer::start(config).await?;
        let addr = server.local_addr();

        let client = Client::builder().timeout(RECV_TIMEOUT).build()?;

        Ok(Self {
            addr,
            client,
            server,
        })
    }

    /// The running gateway
    pub fn gateway(&self) -> &GatewayServer {
        &self.server
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the WebSocket URL for the gateway
    pub fn ws_url(&self) -> String {
        format!("ws://{}/gateway", self.addr)
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    /// Open a WebSocket connection to the gateway
    pub async fn connect(&self) -> Result<WsStream> {
        let (ws, _) = connect_async(self.ws_url())
            .await
            .context("WebSocket handshake failed")?;
        Ok(ws)
    }

    /// Open a connection and subscribe it to events
    pub async fn connect_subscribed(&self) -> Result<WsStream> {
        let mut ws = self.connect().await?;
        send_json(
            &mut ws,
            &serde_json::json!({"type": "invoke", "id": "sub", "name": "subscribe-events"}),
        )
        .await?;

        let reply = recv_json(&mut ws).await?;
        if reply["name"] != "success" {
            bail!("subscribe failed: {reply}");
        }
        Ok(ws)
    }

    /// Poll until the gateway tracks `expected` subscribers
    pub async fn wait_for_subscribers(&self, expected: usize) -> Result<()> {
        let manager = self.server.state().connection_manager().clone();
        tokio::time::timeout(RECV_TIMEOUT, async move {
            while manager.subscriber_count() != expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .with_context(|| format!("never reached {expected} subscribers"))
    }

    /// Poll until the gateway tracks `expected` connections
    pub async fn wait_for_connections(&self, expected: usize) -> Result<()> {
        let manager = self.server.state().connection_manager().clone();
        tokio::time::timeout(RECV_TIMEOUT, async move {
            while manager.connection_count() != expected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .with_context(|| format!("never reached {expected} connections"))
    }

    /// Stop the server
    pub async fn stop(self) -> Result<()> {
        self.server.shutdown().await?;
        Ok(())
    }
}

/// Create a test configuration: loopback, ephemeral port, short timings
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::local_ephemeral();
    config.protocol.registration_timeout_ms = 5_000;
    config.protocol.close_grace_ms = 500;
    config
}

/// Test configuration with a short registration window
pub fn short_registration_config(window_ms: u64) -> AppConfig {
    let mut config = test_config();
    config.protocol.registration_timeout_ms = window_ms;
    config
}

/// Send a JSON value as a text frame
pub async fn send_json(ws: &mut WsStream, value: &Value) -> Result<()> {
    ws.send(Message::Text(value.to_string())).await?;
    Ok(())
}

/// Receive the next data frame and parse it as JSON
pub async fn recv_json(ws: &mut WsStream) -> Result<Value> {
    loop {
        let msg = tokio::time::timeout(RECV_TIMEOUT, ws.next())
            .await
            .context("timed out waiting for a frame")?
            .context("stream ended")??;

        match msg {
            Message::Text(text) => return Ok(serde_json::from_str(&text)?),
            Message::Binary(data) => return Ok(serde_json::from_slice(&data)?),
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            Message::Close(frame) => bail!("connection closed: {frame:?}"),
        }
    }
}

/// Wait for the server to close the socket and return its close code and reason
pub async fn recv_close(ws: &mut WsStream) -> Result<(u16, String)> {
    loop {
        let msg = tokio::time::timeout(RECV_TIMEOUT, ws.next())
            .await
            .context("timed out waiting for close")?
            .context("stream ended without a close frame")??;

        match msg {
            Message::Close(Some(frame)) => {
                return Ok((u16::from(frame.code), frame.reason.into_owned()));
            }
            Message::Close(None) => bail!("close frame without a code"),
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            other => bail!("expected close frame, got {other:?}"),
        }
    }
}

/// Assert that no data frame arrives within `window`
pub async fn assert_silent(ws: &mut WsStream, window: Duration) -> Result<()> {
    match tokio::time::timeout(window, ws.next()).await {
        Err(_) => Ok(()),
        Ok(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => Ok(()),
        Ok(other) => bail!("expected silence, got {other:?}"),
    }
}
