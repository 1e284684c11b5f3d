//! Gateway protocol definitions
//!
//! Defines the frame formats, invoke commands, and close codes.

mod close_codes;
mod commands;
mod messages;

pub use close_codes::{truncate_reason, CloseCode, MAX_CLOSE_REASON_BYTES};
pub use commands::InvokeCommand;
pub use messages::{FrameError, GatewayMessage, InboundFrame, InvokeRequest, ResponseStatus};
