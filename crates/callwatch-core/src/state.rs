//! Liveness state of a channel session.

use std::fmt;

/// Where a [`RealtimeClient`](crate::RealtimeClient) is in its lifecycle.
///
/// ```text
/// Disconnected ─connect─▶ Connecting ─▶ Open ─▶ Closed ─backoff─▶ Connecting
///                              │                   │
///                              └──── failure ──────┤
///                                                  ▼
///                                              Exhausted
/// ```
///
/// `disconnect()` returns to `Disconnected` from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelState {
    /// No session.
    #[default]
    Disconnected,
    /// Dialing the endpoint.
    Connecting,
    /// Socket open, messages flowing.
    Open,
    /// Socket lost; a reconnect is scheduled.
    Closed,
    /// Reconnect attempts exhausted. Terminal until the next `connect`.
    Exhausted,
}

impl ChannelState {
    /// Whether messages can be sent.
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, ChannelState::Open)
    }

    /// Whether the session will not make progress on its own.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChannelState::Disconnected | ChannelState::Exhausted)
    }

    /// Lowercase name, used as a metrics label.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelState::Disconnected => "disconnected",
            ChannelState::Connecting => "connecting",
            ChannelState::Open => "open",
            ChannelState::Closed => "closed",
            ChannelState::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_predicates() {
        assert_eq!(ChannelState::default(), ChannelState::Disconnected);
        assert!(ChannelState::Open.is_open());
        assert!(!ChannelState::Closed.is_open());
        assert!(ChannelState::Exhausted.is_terminal());
        assert!(!ChannelState::Connecting.is_terminal());
        assert_eq!(ChannelState::Exhausted.to_string(), "exhausted");
    }
}
