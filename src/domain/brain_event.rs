//! Events exchanged between the brain and the persistence adapter.
//!
//! The brain publishes [`BrainEvent::Save`] and [`BrainEvent::Close`];
//! the adapter publishes [`BrainEvent::Connected`] once the initial load
//! has populated the brain.

use serde::Serialize;
use serde_json::Value;

/// Event carried by the [`super::EventBus`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BrainEvent {
    /// The brain wants its state persisted.
    Save {
        /// Snapshot or partial payload. `None` is treated as `{}`.
        data: Option<Value>,
    },

    /// The host is shutting down; the connection must be released.
    Close,

    /// The adapter finished populating the brain.
    Connected,
}

impl BrainEvent {
    /// Builds a save event from a payload.
    #[must_use]
    pub fn save(data: Value) -> Self {
        Self::Save { data: Some(data) }
    }

    /// Returns the event name as a static string slice.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Save { .. } => "save",
            Self::Close => "close",
            Self::Connected => "connected",
        }
    }
}
