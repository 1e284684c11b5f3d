//! Lifecycle error types

use thiserror::Error;

/// Rejected lifecycle transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// The connection already declared its role
    #[error("socket already subscribed")]
    AlreadySubscribed,

    /// The connection is closing or gone
    #[error("socket closed")]
    Closed,
}
