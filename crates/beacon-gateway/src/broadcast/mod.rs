//! Event broadcasting
//!
//! Fans events from in-process producers out to subscribed WebSocket connections.

mod broadcaster;

pub use broadcaster::{BroadcastReport, Broadcaster};
