//! WebSocket close codes
//!
//! Defines gateway-specific close codes for WebSocket connections.

/// Longest close reason a WebSocket close frame can carry (125-byte payload minus the code)
pub const MAX_CLOSE_REASON_BYTES: usize = 123;

/// Gateway WebSocket close codes
///
/// Both codes are fatal for the connection they are sent on and for nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CloseCode {
    /// No `subscribe-events` invoke arrived within the registration window
    RegistrationTimeout = 4000,
    /// Frame could not be parsed, or handling it failed unexpectedly
    InvalidFrame = 4006,
}

impl CloseCode {
    /// Create a `CloseCode` from a raw u16 value
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            4000 => Some(Self::RegistrationTimeout),
            4006 => Some(Self::InvalidFrame),
            _ => None,
        }
    }

    /// Get the raw u16 value
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Get the default close reason for this code
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::RegistrationTimeout => "Registration timed out",
            Self::InvalidFrame => "Invalid frame",
        }
    }

    /// Get the name of this close code
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::RegistrationTimeout => "RegistrationTimeout",
            Self::InvalidFrame => "InvalidFrame",
        }
    }
}

impl std::fmt::Display for CloseCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.as_u16(), self.description())
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}

/// Cut a close reason down to what fits in a close frame, on a char boundary
#[must_use]
pub fn truncate_reason(reason: &str) -> &str {
    if reason.len() <= MAX_CLOSE_REASON_BYTES {
        return reason;
    }
    let mut end = MAX_CLOSE_REASON_BYTES;
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    &reason[..end]
}
