//! Adapter error types.
//!
//! [`BrainError`] is the central error type for the crate. Store
//! implementations translate their backend failures into it so the
//! adapter can apply one policy to every transport.

/// Error enum shared by configuration, stores and the adapter.
///
/// # Handling Policy
///
/// | Variant             | Adapter reaction                        |
/// |---------------------|-----------------------------------------|
/// | `InvalidUrl`        | returned from configuration resolution  |
/// | `ConnectionRefused` | swallowed                               |
/// | `Authentication`    | logged, initial load halted             |
/// | `Store`             | logged, non-fatal                       |
/// | `NotConnected`      | logged, non-fatal                       |
/// | `Snapshot`          | aborts the load or save that hit it     |
/// | `MissingStorageKey` | logged, save dropped                    |
#[derive(Debug, thiserror::Error)]
pub enum BrainError {
    /// The connection URL could not be parsed.
    #[error("invalid redis url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The remote store refused the connection.
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    /// The remote store rejected the credentials.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Any other remote store or transport failure.
    #[error("store error: {0}")]
    Store(String),

    /// An operation was issued before a connection was established or
    /// after it was closed.
    #[error("not connected to the remote store")]
    NotConnected,

    /// A persisted snapshot or save payload is not valid JSON.
    #[error("malformed snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// A JSON-format save payload did not name the field to persist.
    #[error("storageKey is required for saving JSON data")]
    MissingStorageKey,
}

impl BrainError {
    /// Returns `true` for the transient "connection refused" condition
    /// that is expected while the client is still reconnecting.
    #[must_use]
    pub const fn is_connection_refused(&self) -> bool {
        matches!(self, Self::ConnectionRefused(_))
    }

    /// Returns a short static label for structured log fields.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidUrl(_) => "invalid_url",
            Self::ConnectionRefused(_) => "connection_refused",
            Self::Authentication(_) => "authentication",
            Self::Store(_) => "store",
            Self::NotConnected => "not_connected",
            Self::Snapshot(_) => "snapshot",
            Self::MissingStorageKey => "missing_storage_key",
        }
    }
}

impl From<redis::RedisError> for BrainError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() {
            Self::ConnectionRefused(err.to_string())
        } else if err.kind() == redis::ErrorKind::AuthenticationFailed {
            Self::Authentication(err.to_string())
        } else {
            Self::Store(err.to_string())
        }
    }
}
