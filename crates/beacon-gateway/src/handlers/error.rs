//! Handler error types

use crate::connection::{LifecycleError, SendError};
use crate::protocol::{CloseCode, FrameError};
use thiserror::Error;

/// Failure that is fatal for the connection the frame arrived on
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Frame could not be parsed
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// Reply could not be queued
    #[error("failed to send response: {0}")]
    Send(#[from] SendError),
}

impl HandlerError {
    /// Close code to end the connection with
    pub fn to_close_code(&self) -> CloseCode {
        match self {
            Self::Frame(_) | Self::Send(_) => CloseCode::InvalidFrame,
        }
    }
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;

/// Client mistake, reported back in an error response; the connection stays open
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvokeError {
    #[error("socket already subscribed")]
    AlreadySubscribed,

    #[error("Must specify pluginName")]
    MissingPluginName,

    #[error("Unknown plugin name specified")]
    UnknownPlugin,

    #[error("unknown command invocation")]
    UnknownCommand,

    /// Connection began closing while the frame was handled; nobody to answer
    #[error("socket closed")]
    ConnectionClosed,
}

impl InvokeError {
    /// Whether an error response should be sent for this error
    pub fn is_reportable(&self) -> bool {
        !matches!(self, Self::ConnectionClosed)
    }
}

impl From<LifecycleError> for InvokeError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::AlreadySubscribed => Self::AlreadySubscribed,
            LifecycleError::Closed => Self::ConnectionClosed,
        }
    }
}
