//! # redis-brain
//!
//! Redis persistence for a chat bot's in-memory brain.
//!
//! On startup the adapter loads the last persisted snapshot into the
//! brain, then mirrors every `save` event back into Redis until the brain
//! emits `close`. Two wire formats are supported: a whole-brain JSON
//! string under `<prefix>:storage`, and a RedisJSON document under
//! `<prefix>:JSONstorage` written one field at a time, with a one-time
//! migration from the former to the latter.
//!
//! ## Architecture
//!
//! ```text
//! MemoryBrain (domain/)
//!     │  save / close
//!     ├── EventBus (domain/)
//!     │  connected
//!     ├── BrainPersistenceAdapter (service/)
//!     │
//!     ├── RemoteStore (persistence/)
//!     │
//!     └── Redis (TCP or Unix socket)
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
