//! Persistence layer: the remote key-value store behind the brain.
//!
//! Provides the [`RemoteStore`] trait the adapter talks to, the key
//! naming scheme, a Redis implementation and an in-memory one.

pub mod keys;
pub mod memory;
pub mod redis;
pub mod store;

pub use self::keys::StorageKeys;
pub use self::memory::{MemoryStore, StoreCommand};
pub use self::redis::RedisStore;
pub use self::store::{JsonPath, RemoteStore};
