//! Invoke command names

/// Command named by an `invoke` frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvokeCommand {
    /// `subscribe-events`: register the connection for event broadcasts
    SubscribeEvents,
    /// `plugin`: hand `data` to a registered plugin handler
    Plugin,
    /// Anything else, including a missing name
    Unknown,
}

impl InvokeCommand {
    pub const SUBSCRIBE_EVENTS: &'static str = "subscribe-events";
    pub const PLUGIN: &'static str = "plugin";

    /// Resolve a command from the frame's `name` field (exact match)
    #[must_use]
    pub fn from_name(name: Option<&str>) -> Self {
        match name {
            Some(Self::SUBSCRIBE_EVENTS) => Self::SubscribeEvents,
            Some(Self::PLUGIN) => Self::Plugin,
            _ => Self::Unknown,
        }
    }

    /// Wire name, if the command is known
    #[must_use]
    pub const fn as_str(self) -> Option<&'static str> {
        match self {
            Self::SubscribeEvents => Some(Self::SUBSCRIBE_EVENTS),
            Self::Plugin => Some(Self::PLUGIN),
            Self::Unknown => None,
        }
    }
}

impl std::fmt::Display for InvokeCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str().unwrap_or("unknown"))
    }
}
