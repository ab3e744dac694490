//! Domain layer: the brain, its events, and the connection lifecycle.
//!
//! This module contains the brain interface with its in-memory
//! implementation, the event bus the brain and the adapter talk over,
//! and the state machine of the remote connection.

pub mod brain;
pub mod brain_event;
pub mod connection_state;
pub mod event_bus;

pub use brain::{Brain, MemoryBrain};
pub use brain_event::BrainEvent;
pub use connection_state::ConnectionState;
pub use event_bus::EventBus;
