//! Connection management
//!
//! Tracks WebSocket connections, their roles, and the registration handshake.

mod connection;
mod error;
mod manager;

pub use connection::{Connection, ConnectionState, Outbound, Role, SendError};
pub use error::LifecycleError;
pub use manager::ConnectionManager;
