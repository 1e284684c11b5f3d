//! Gateway message format
//!
//! Inbound frames are JSON objects discriminated by `type`. Only `invoke` is actionable;
//! the server emits `response` and `event` frames.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// An `invoke` request sent by a client
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InvokeRequest {
    /// Correlation token, echoed verbatim in the response (string or number)
    #[serde(default)]
    pub id: Value,

    /// Command name
    #[serde(default)]
    pub name: Option<String>,

    /// Target plugin for `plugin` invokes
    #[serde(rename = "pluginName", default)]
    pub plugin_name: Option<String>,

    /// Command argument
    #[serde(default)]
    pub data: Value,
}

/// A parsed inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// `type: "invoke"`
    Invoke(InvokeRequest),
    /// Any other `type` (or none); carries the type for logging
    Ignored(Option<String>),
}

/// Why an inbound frame could not be parsed
#[derive(Debug, Error)]
pub enum FrameError {
    /// Payload is not JSON
    #[error("{0}")]
    Malformed(#[source] serde_json::Error),

    /// `invoke` frame whose fields have the wrong shape
    #[error("invalid invoke frame: {0}")]
    InvalidInvoke(#[source] serde_json::Error),
}

impl InboundFrame {
    /// Parse raw frame bytes (text or binary frames alike)
    pub fn parse(raw: &[u8]) -> Result<Self, FrameError> {
        let value: Value = serde_json::from_slice(raw).map_err(FrameError::Malformed)?;

        match value.get("type").and_then(Value::as_str) {
            Some("invoke") => serde_json::from_value(value)
                .map(Self::Invoke)
                .map_err(FrameError::InvalidInvoke),
            other => Ok(Self::Ignored(other.map(str::to_owned))),
        }
    }
}

/// Outcome carried in a response's `name` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Server-to-client message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GatewayMessage {
    /// Reply to an `invoke`, correlated by `id`
    Response {
        id: Value,
        name: ResponseStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },

    /// Unsolicited broadcast
    Event {
        name: String,
        data: Value,
    },
}

impl GatewayMessage {
    /// Create a success response
    #[must_use]
    pub fn success(id: Value) -> Self {
        Self::Response {
            id,
            name: ResponseStatus::Success,
            data: None,
        }
    }

    /// Create an error response with a message
    #[must_use]
    pub fn error(id: Value, message: impl Into<String>) -> Self {
        Self::Response {
            id,
            name: ResponseStatus::Error,
            data: Some(Value::String(message.into())),
        }
    }

    /// Create an event frame
    #[must_use]
    pub fn event(name: impl Into<String>, data: Value) -> Self {
        Self::Event {
            name: name.into(),
            data,
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl std::fmt::Display for GatewayMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Response { id, name, .. } => {
                write!(f, "GatewayMessage(response, id={id}, name={name:?})")
            }
            Self::Event { name, .. } => write!(f, "GatewayMessage(event, name={name})"),
        }
    }
}
