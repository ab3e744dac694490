//! Remote key names derived from the key prefix.

/// Suffix of the text-format key.
pub const TEXT_SUFFIX: &str = "storage";

/// Suffix of the JSON-format key.
pub const JSON_SUFFIX: &str = "JSONstorage";

/// The two keys a brain can be persisted under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    /// `<prefix>:storage`, holding one opaque JSON string.
    pub text: String,
    /// `<prefix>:JSONstorage`, holding a RedisJSON document.
    pub json: String,
}

impl StorageKeys {
    /// Builds both keys for `prefix`.
    #[must_use]
    pub fn new(prefix: &str) -> Self {
        Self {
            text: format!("{prefix}:{TEXT_SUFFIX}"),
            json: format!("{prefix}:{JSON_SUFFIX}"),
        }
    }
}
