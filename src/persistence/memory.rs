//! In-memory implementation of the remote store.
//!
//! [`MemoryStore`] keeps string keys and JSON documents in hash maps and
//! records every command it receives, so callers can assert on the exact
//! traffic an adapter produced without a Redis server.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use super::store::{JsonPath, RemoteStore};
use crate::error::BrainError;

/// A command received by a [`MemoryStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCommand {
    /// Transport connect.
    Connect,
    /// `AUTH secret`.
    Auth(String),
    /// `GET key`.
    Get(String),
    /// `SET key value`.
    Set {
        /// Target key.
        key: String,
        /// Serialized value.
        value: String,
    },
    /// `JSON.GET key`.
    JsonGet(String),
    /// `JSON.SET key path value`.
    JsonSet {
        /// Target key.
        key: String,
        /// Target path.
        path: JsonPath,
        /// Written value.
        value: Value,
    },
    /// `QUIT`.
    Quit,
}

#[derive(Debug, Default)]
struct Inner {
    strings: HashMap<String, String>,
    documents: HashMap<String, Value>,
    commands: Vec<StoreCommand>,
    connected: bool,
    refusals_left: usize,
    failing_writes: bool,
}

/// How [`MemoryStore::connect`] fails, if at all.
#[derive(Debug, Clone, Default)]
enum ConnectFailure {
    #[default]
    None,
    Refused,
    Other(String),
}

/// Hash-map backed [`RemoteStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    connect_failure: ConnectFailure,
    secret: Option<String>,
}

impl MemoryStore {
    /// Creates an empty store that accepts any connection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a string key.
    #[must_use]
    pub fn with_string(mut self, key: &str, value: &str) -> Self {
        self.inner
            .get_mut()
            .strings
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Seeds a JSON document.
    #[must_use]
    pub fn with_document(mut self, key: &str, value: Value) -> Self {
        self.inner
            .get_mut()
            .documents
            .insert(key.to_string(), value);
        self
    }

    /// Only `AUTH` with `secret` succeeds.
    #[must_use]
    pub fn with_secret(mut self, secret: &str) -> Self {
        self.secret = Some(secret.to_string());
        self
    }

    /// Every connect attempt is refused.
    #[must_use]
    pub fn refusing_connections(mut self) -> Self {
        self.connect_failure = ConnectFailure::Refused;
        self
    }

    /// The first `count` connect attempts are refused; later ones succeed.
    #[must_use]
    pub fn refusing_first_connections(mut self, count: usize) -> Self {
        self.inner.get_mut().refusals_left = count;
        self
    }

    /// Every connect attempt fails with a generic transport error.
    #[must_use]
    pub fn failing_connections(mut self, reason: &str) -> Self {
        self.connect_failure = ConnectFailure::Other(reason.to_string());
        self
    }

    /// Makes `SET` and `JSON.SET` fail until switched off again.
    pub async fn fail_writes(&self, failing: bool) {
        self.inner.lock().await.failing_writes = failing;
    }

    /// Returns every command received so far, in order.
    pub async fn commands(&self) -> Vec<StoreCommand> {
        self.inner.lock().await.commands.clone()
    }

    /// Returns the current value of a string key.
    pub async fn string(&self, key: &str) -> Option<String> {
        self.inner.lock().await.strings.get(key).cloned()
    }

    /// Returns the current JSON document under a key.
    pub async fn document(&self, key: &str) -> Option<Value> {
        self.inner.lock().await.documents.get(key).cloned()
    }

    /// Returns `true` while a connection is open.
    pub async fn is_connected(&self) -> bool {
        self.inner.lock().await.connected
    }
}

impl Inner {
    fn ensure_connected(&self) -> Result<(), BrainError> {
        if self.connected {
            Ok(())
        } else {
            Err(BrainError::NotConnected)
        }
    }

    fn ensure_writable(&self) -> Result<(), BrainError> {
        self.ensure_connected()?;
        if self.failing_writes {
            return Err(BrainError::Store("READONLY replica".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn connect(&self) -> Result<(), BrainError> {
        let mut inner = self.inner.lock().await;
        inner.commands.push(StoreCommand::Connect);
        if inner.refusals_left > 0 {
            inner.refusals_left -= 1;
            return Err(BrainError::ConnectionRefused(
                "connect ECONNREFUSED".to_string(),
            ));
        }
        match &self.connect_failure {
            ConnectFailure::None => {
                inner.connected = true;
                Ok(())
            }
            ConnectFailure::Refused => Err(BrainError::ConnectionRefused(
                "connect ECONNREFUSED".to_string(),
            )),
            ConnectFailure::Other(reason) => Err(BrainError::Store(reason.clone())),
        }
    }

    async fn auth(&self, secret: &str) -> Result<(), BrainError> {
        let mut inner = self.inner.lock().await;
        inner.commands.push(StoreCommand::Auth(secret.to_string()));
        inner.ensure_connected()?;
        match &self.secret {
            Some(expected) if expected == secret => Ok(()),
            _ => Err(BrainError::Authentication("WRONGPASS".to_string())),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>, BrainError> {
        let mut inner = self.inner.lock().await;
        inner.commands.push(StoreCommand::Get(key.to_string()));
        inner.ensure_connected()?;
        Ok(inner.strings.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), BrainError> {
        let mut inner = self.inner.lock().await;
        inner.commands.push(StoreCommand::Set {
            key: key.to_string(),
            value: value.to_string(),
        });
        inner.ensure_writable()?;
        inner.strings.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn json_get(&self, key: &str) -> Result<Option<String>, BrainError> {
        let mut inner = self.inner.lock().await;
        inner.commands.push(StoreCommand::JsonGet(key.to_string()));
        inner.ensure_connected()?;
        inner
            .documents
            .get(key)
            .map(serde_json::to_string)
            .transpose()
            .map_err(BrainError::from)
    }

    async fn json_set(&self, key: &str, path: &JsonPath, value: &Value) -> Result<(), BrainError> {
        let mut inner = self.inner.lock().await;
        inner.commands.push(StoreCommand::JsonSet {
            key: key.to_string(),
            path: path.clone(),
            value: value.clone(),
        });
        inner.ensure_writable()?;
        match path {
            JsonPath::Root => {
                inner.documents.insert(key.to_string(), value.clone());
            }
            JsonPath::Field(field) => {
                let document = inner
                    .documents
                    .entry(key.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                let Value::Object(map) = document else {
                    return Err(BrainError::Store(format!(
                        "document at {key} is not an object"
                    )));
                };
                map.insert(field.clone(), value.clone());
            }
        }
        Ok(())
    }

    async fn quit(&self) -> Result<(), BrainError> {
        let mut inner = self.inner.lock().await;
        inner.commands.push(StoreCommand::Quit);
        inner.connected = false;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    use super::*;

    #[tokio::test]
    async fn operations_require_connection() {
        let store = MemoryStore::new();
        assert_err!(store.get("k").await);
        assert_ok!(store.connect().await);
        assert!(matches!(store.get("k").await, Ok(None)));
    }

    #[tokio::test]
    async fn seeded_values_are_readable() {
        let store = MemoryStore::new()
            .with_string("hubot:storage", "{\"a\":1}")
            .with_document("hubot:JSONstorage", json!({"b": 2}));
        assert_ok!(store.connect().await);

        let Ok(Some(text)) = store.get("hubot:storage").await else {
            panic!("expected text value");
        };
        assert_eq!(text, "{\"a\":1}");

        let Ok(Some(doc)) = store.json_get("hubot:JSONstorage").await else {
            panic!("expected document");
        };
        assert_eq!(doc, "{\"b\":2}");
    }

    #[tokio::test]
    async fn field_write_creates_document() {
        let store = MemoryStore::new();
        assert_ok!(store.connect().await);

        let path = JsonPath::Field("k".to_string());
        assert!(store.json_set("doc", &path, &json!({"x": 1})).await.is_ok());
        assert!(
            store
                .json_set("doc", &JsonPath::Field("j".to_string()), &json!(2))
                .await
                .is_ok()
        );

        assert_eq!(store.document("doc").await, Some(json!({"k": {"x": 1}, "j": 2})));
    }

    #[tokio::test]
    async fn auth_checks_secret() {
        let store = MemoryStore::new().with_secret("hunter2");
        assert_ok!(store.connect().await);
        assert!(matches!(
            store.auth("nope").await,
            Err(BrainError::Authentication(_))
        ));
        assert_ok!(store.auth("hunter2").await);
    }

    #[tokio::test]
    async fn refused_connections_are_typed() {
        let store = MemoryStore::new().refusing_connections();
        let Err(err) = store.connect().await else {
            panic!("expected refusal");
        };
        assert!(err.is_connection_refused());
        assert!(!store.is_connected().await);
    }

    #[tokio::test]
    async fn quit_twice_is_fine() {
        let store = MemoryStore::new();
        assert_ok!(store.connect().await);
        assert_ok!(store.quit().await);
        assert_ok!(store.quit().await);
        assert!(!store.is_connected().await);
    }

    #[tokio::test]
    async fn refuses_only_first_connections() {
        let store = MemoryStore::new().refusing_first_connections(2);
        assert_err!(store.connect().await);
        assert_err!(store.connect().await);
        assert_ok!(store.connect().await);
        assert!(store.is_connected().await);
    }

    #[tokio::test]
    async fn failing_writes_can_be_toggled() {
        let store = MemoryStore::new();
        assert_ok!(store.connect().await);

        store.fail_writes(true).await;
        assert_err!(store.set("k", "1").await);
        assert_err!(store.json_set("doc", &JsonPath::Root, &json!({})).await);
        assert_eq!(store.string("k").await, None);

        store.fail_writes(false).await;
        assert_ok!(store.set("k", "2").await);
        assert_eq!(store.string("k").await.as_deref(), Some("2"));
    }
}
