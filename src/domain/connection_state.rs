//! Lifecycle of the adapter's remote connection.

use std::fmt;

/// Connection state tracked by the adapter.
///
/// Transitions: `Disconnected → Connecting → Connected → Authenticated?
/// → Loaded → Closed`. Errors never transition; `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection has been established.
    #[default]
    Disconnected,
    /// A connection attempt is in progress.
    Connecting,
    /// The transport is up; no load has run yet.
    Connected,
    /// `AUTH` succeeded; the load is about to run.
    Authenticated,
    /// The initial load completed and `connected` was emitted.
    Loaded,
    /// The connection was released; no further events are processed.
    Closed,
}

impl ConnectionState {
    /// Returns `true` once the transport is up and before it is closed.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Connected | Self::Authenticated | Self::Loaded)
    }

    /// Returns `true` for the terminal state.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Authenticated => "authenticated",
            Self::Loaded => "loaded",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}
