//! Remote store interface consumed by the adapter.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::BrainError;

/// Location inside a RedisJSON document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonPath {
    /// The whole document.
    Root,
    /// One top-level field.
    Field(String),
}

impl JsonPath {
    /// Renders the path in RedisJSON's JSONPath syntax. Field names are
    /// quoted so dots and brackets inside them stay literal.
    #[must_use]
    pub fn to_redis_path(&self) -> String {
        match self {
            Self::Root => "$".to_string(),
            Self::Field(name) => format!("$[{}]", Value::String(name.clone())),
        }
    }
}

/// Async key-value store with RedisJSON support.
///
/// Implementations must be thread-safe (`Send + Sync`) and map their
/// backend failures into [`BrainError`], reporting refused connections as
/// [`BrainError::ConnectionRefused`] and rejected credentials as
/// [`BrainError::Authentication`].
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    /// Opens the transport. Success is the "connect" signal.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint cannot be reached.
    async fn connect(&self) -> Result<(), BrainError>;

    /// Authenticates the open connection.
    ///
    /// # Errors
    ///
    /// Returns [`BrainError::Authentication`] if the secret is rejected.
    async fn auth(&self, secret: &str) -> Result<(), BrainError>;

    /// Reads a string key. `Ok(None)` if the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    async fn get(&self, key: &str) -> Result<Option<String>, BrainError>;

    /// Overwrites a string key.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    async fn set(&self, key: &str, value: &str) -> Result<(), BrainError>;

    /// Reads a whole JSON document as serialized text. `Ok(None)` if the
    /// key does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    async fn json_get(&self, key: &str) -> Result<Option<String>, BrainError>;

    /// Writes `value` at `path` of the JSON document under `key`,
    /// creating an empty root object first when a field is written to a
    /// missing document.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage operation fails.
    async fn json_set(&self, key: &str, path: &JsonPath, value: &Value) -> Result<(), BrainError>;

    /// Closes the connection. Closing twice is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails to shut down cleanly.
    async fn quit(&self) -> Result<(), BrainError>;
}
