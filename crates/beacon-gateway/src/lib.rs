//! # beacon-gateway
//!
//! WebSocket gateway that tracks client connections, routes their `invoke` commands to
//! built-in handlers and plugins, and broadcasts events to subscribed clients.

pub mod broadcast;
pub mod connection;
pub mod handlers;
pub mod plugins;
pub mod protocol;
pub mod server;

pub use broadcast::{BroadcastReport, Broadcaster};
pub use plugins::{plugin_fn, PluginHandler, PluginRegistry};
pub use server::{create_app, create_gateway_state, run, serve, GatewayServer, GatewayState};
