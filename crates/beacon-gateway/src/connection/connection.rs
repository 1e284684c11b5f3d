//! Individual WebSocket connection
//!
//! Represents a single WebSocket connection, its role, and its transport state.

use super::LifecycleError;
use crate::protocol::{truncate_reason, CloseCode, GatewayMessage};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

/// Subscription role declared by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Accepted, no `subscribe-events` yet
    Unset,
    /// Receives event broadcasts
    Events,
}

/// Transport state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Frames can be queued
    Open,
    /// A close frame has been queued; nothing else will be sent
    Closing,
    /// Removed from tracking
    Closed,
}

/// Item on a connection's outbound queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Serialized JSON text frame
    Frame(String),
    /// Close the socket with this code and reason
    Close { code: u16, reason: String },
}

/// Failure to queue a frame for a connection
#[derive(Debug, Error)]
pub enum SendError {
    #[error("connection is not open")]
    NotOpen,

    #[error("outbound queue is full")]
    QueueFull,

    #[error("connection writer has gone away")]
    Disconnected,

    #[error("failed to serialize frame: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Role, transport state and registration watchdog, guarded together so that
/// subscribe, timeout and close transitions never interleave
struct Lifecycle {
    role: Role,
    state: ConnectionState,
    watchdog: Option<JoinHandle<()>>,
}

/// A single WebSocket connection
pub struct Connection {
    /// Unique connection ID
    id: String,

    lifecycle: Mutex<Lifecycle>,

    /// Channel to the socket writer task
    sender: mpsc::Sender<Outbound>,

    /// Connection creation time
    created_at: Instant,
}

impl Connection {
    /// Create a new connection
    pub fn new(id: String, sender: mpsc::Sender<Outbound>) -> Arc<Self> {
        Arc::new(Self {
            id,
            lifecycle: Mutex::new(Lifecycle {
                role: Role::Unset,
                state: ConnectionState::Open,
                watchdog: None,
            }),
            sender,
            created_at: Instant::now(),
        })
    }

    /// Get the connection ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the current role
    pub fn role(&self) -> Role {
        self.lifecycle.lock().role
    }

    /// Get the current transport state
    pub fn state(&self) -> ConnectionState {
        self.lifecycle.lock().state
    }

    /// Whether frames can currently be delivered
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open && !self.sender.is_closed()
    }

    /// Whether the registration watchdog is still armed
    pub fn has_pending_registration(&self) -> bool {
        self.lifecycle.lock().watchdog.is_some()
    }

    /// Get connection age
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Arm the registration watchdog
    ///
    /// If the connection already left the `Unset`/`Open` state the timer is cancelled at once.
    pub(crate) fn arm_watchdog(&self, handle: JoinHandle<()>) {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.role == Role::Unset && lifecycle.state == ConnectionState::Open {
            if let Some(previous) = lifecycle.watchdog.replace(handle) {
                previous.abort();
            }
        } else {
            handle.abort();
        }
    }

    /// Move from `Unset` to `Events`, cancelling the watchdog
    pub(crate) fn promote_to_events(&self) -> Result<(), LifecycleError> {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.state != ConnectionState::Open {
            return Err(LifecycleError::Closed);
        }
        if lifecycle.role != Role::Unset {
            return Err(LifecycleError::AlreadySubscribed);
        }
        lifecycle.role = Role::Events;
        if let Some(watchdog) = lifecycle.watchdog.take() {
            watchdog.abort();
        }
        Ok(())
    }

    /// Called by the watchdog when the registration window elapses
    ///
    /// Returns `true` if the connection was still unregistered and is now closing.
    pub(crate) fn expire_registration(&self) -> bool {
        let mut lifecycle = self.lifecycle.lock();
        // The watchdog is the running task; detach rather than abort it.
        drop(lifecycle.watchdog.take());
        if lifecycle.role != Role::Unset || lifecycle.state != ConnectionState::Open {
            return false;
        }
        lifecycle.state = ConnectionState::Closing;
        drop(lifecycle);

        let code = CloseCode::RegistrationTimeout;
        self.queue_close(code.as_u16(), code.description());
        true
    }

    /// Queue a close frame and stop accepting outbound frames
    ///
    /// Returns `false` if the connection was already closing or closed.
    pub fn close(&self, code: CloseCode, reason: &str) -> bool {
        {
            let mut lifecycle = self.lifecycle.lock();
            if lifecycle.state != ConnectionState::Open {
                return false;
            }
            lifecycle.state = ConnectionState::Closing;
            if let Some(watchdog) = lifecycle.watchdog.take() {
                watchdog.abort();
            }
        }

        self.queue_close(code.as_u16(), reason);
        true
    }

    /// Mark the connection as gone. Idempotent.
    pub(crate) fn mark_closed(&self) {
        let mut lifecycle = self.lifecycle.lock();
        lifecycle.state = ConnectionState::Closed;
        if let Some(watchdog) = lifecycle.watchdog.take() {
            watchdog.abort();
        }
    }

    fn queue_close(&self, code: u16, reason: &str) {
        let close = Outbound::Close {
            code,
            reason: truncate_reason(reason).to_string(),
        };

        match self.sender.try_send(close) {
            Ok(()) => {}
            Err(TrySendError::Full(close)) => {
                // Writer is backed up; deliver the close once it drains.
                let sender = self.sender.clone();
                tokio::spawn(async move {
                    let _ = sender.send(close).await;
                });
            }
            Err(TrySendError::Closed(_)) => {
                tracing::trace!(connection_id = %self.id, "Writer gone before close frame");
            }
        }
    }

    /// Send a message to this connection, waiting for queue space
    pub async fn send(&self, message: &GatewayMessage) -> Result<(), SendError> {
        if self.state() != ConnectionState::Open {
            return Err(SendError::NotOpen);
        }
        let json = message.to_json()?;
        self.sender
            .send(Outbound::Frame(json))
            .await
            .map_err(|_| SendError::Disconnected)
    }

    /// Queue an already serialized frame without waiting
    pub fn try_send_text(&self, json: String) -> Result<(), SendError> {
        if self.state() != ConnectionState::Open {
            return Err(SendError::NotOpen);
        }
        self.sender
            .try_send(Outbound::Frame(json))
            .map_err(|e| match e {
                TrySendError::Full(_) => SendError::QueueFull,
                TrySendError::Closed(_) => SendError::Disconnected,
            })
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lifecycle = self.lifecycle.lock();
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("role", &lifecycle.role)
            .field("state", &lifecycle.state)
            .field("created_at", &self.created_at)
            .finish()
    }
}
