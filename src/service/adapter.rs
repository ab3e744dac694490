//! Brain persistence adapter: loads the brain once, then mirrors saves.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::config::{BrainConfig, ConnectionConfig, DataFormat};
use crate::domain::brain::STORAGE_KEY_FIELD;
use crate::domain::{Brain, BrainEvent, ConnectionState, EventBus};
use crate::error::BrainError;
use crate::persistence::{JsonPath, RemoteStore, StorageKeys};

/// Connects a [`Brain`] to a [`RemoteStore`].
///
/// Owns the resolved configuration and the store handle. Driven either
/// step by step ([`connect`](Self::connect), [`on_save`](Self::on_save),
/// [`on_close`](Self::on_close)) or by [`run`](Self::run), which consumes
/// brain events from the [`EventBus`] until `close`.
///
/// Auto-save on the brain is switched off on construction and only
/// switched back on by a completed text-format load. The adapter
/// subscribes to the bus on construction, so saves published while the
/// initial load is still running queue up behind it.
#[derive(Debug)]
pub struct BrainPersistenceAdapter<S, B> {
    connection: ConnectionConfig,
    data_format: DataFormat,
    migrate: bool,
    keys: StorageKeys,
    store: Arc<S>,
    brain: Arc<B>,
    event_bus: EventBus,
    events: broadcast::Receiver<BrainEvent>,
    reconnect_delay: Duration,
    state: ConnectionState,
}

/// What woke the event loop.
enum Step {
    Event(Result<BrainEvent, broadcast::error::RecvError>),
    Reconnect,
}

impl<S: RemoteStore, B: Brain> BrainPersistenceAdapter<S, B> {
    /// Creates the adapter and disables auto-save on the brain.
    #[must_use]
    pub fn new(config: &BrainConfig, store: Arc<S>, brain: Arc<B>, event_bus: EventBus) -> Self {
        let connection = config.connection.clone();

        match connection.source {
            Some(var) => tracing::info!(var, "discovered redis from environment variable"),
            None => tracing::info!(url = %connection.url, "using default redis endpoint"),
        }
        if !connection.ready_check {
            tracing::info!("turning off redis ready checks");
        }

        brain.set_auto_save(false);

        Self {
            keys: StorageKeys::new(&connection.key_prefix),
            connection,
            data_format: config.data_format,
            migrate: config.migrate,
            store,
            brain,
            events: event_bus.subscribe(),
            event_bus,
            reconnect_delay: Duration::from_millis(config.reconnect_delay_ms),
            state: ConnectionState::Disconnected,
        }
    }

    /// Returns the current connection state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns the remote keys in use.
    #[must_use]
    pub const fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    /// Opens the connection and performs the initial load.
    ///
    /// With credentials, the load runs only after `AUTH` succeeds; a
    /// rejected secret is logged and leaves the adapter connected but
    /// unpopulated. Transport failures are observed (refusals silently)
    /// and leave the adapter disconnected. Calling this again after the
    /// first attempt got past `Disconnected` does nothing, so a
    /// connection never loads twice.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial load fails to read the snapshot
    /// or the snapshot is not valid JSON.
    pub async fn connect(&mut self) -> Result<(), BrainError> {
        if self.state != ConnectionState::Disconnected {
            return Ok(());
        }

        self.state = ConnectionState::Connecting;
        if let Err(err) = self.store.connect().await {
            self.state = ConnectionState::Disconnected;
            observe_error(&err);
            return Ok(());
        }
        self.state = ConnectionState::Connected;
        tracing::debug!("successfully connected to redis");

        if let Some(secret) = self.connection.auth_secret.as_deref() {
            if let Err(err) = self.store.auth(secret).await {
                tracing::error!(error = %err, "failed to authenticate to redis");
                return Ok(());
            }
            tracing::info!("successfully authenticated to redis");
            self.state = ConnectionState::Authenticated;
        }

        self.load().await
    }

    /// Populates the brain from the remote store and emits `connected`.
    ///
    /// # Errors
    ///
    /// Returns an error if a store read or write fails or a persisted
    /// snapshot is not valid JSON.
    pub async fn load(&mut self) -> Result<(), BrainError> {
        match self.data_format {
            DataFormat::Text => self.load_text().await?,
            DataFormat::Json => self.load_json().await?,
        }
        self.state = ConnectionState::Loaded;
        Ok(())
    }

    async fn load_text(&self) -> Result<(), BrainError> {
        let prefix = self.connection.key_prefix.as_str();
        let data = match self.store.get(&self.keys.text).await? {
            Some(raw) => {
                tracing::info!(prefix, "text data for brain retrieved from redis");
                parse_snapshot(&raw)?
            }
            None => {
                tracing::info!(prefix, "initializing new text data for brain");
                Map::new()
            }
        };

        self.brain.merge_data(data).await;
        self.event_bus.publish(BrainEvent::Connected);
        self.brain.set_auto_save(true);
        Ok(())
    }

    // Unlike the text path, this never re-enables auto-save.
    async fn load_json(&self) -> Result<(), BrainError> {
        let prefix = self.connection.key_prefix.as_str();
        if let Some(raw) = self.store.json_get(&self.keys.json).await? {
            tracing::info!(prefix, "JSON data for brain retrieved from redis");
            self.brain.merge_data(parse_snapshot(&raw)?).await;
            self.event_bus.publish(BrainEvent::Connected);
            return Ok(());
        }

        if self.brain.is_empty().await && self.migrate {
            tracing::info!(
                from = %self.keys.text,
                to = %self.keys.json,
                "attempting to migrate text data into JSON storage"
            );
            self.load_text().await?;
            // Written at the document root, not under a storageKey field.
            let data = Value::Object(self.brain.data().await);
            self.store
                .json_set(&self.keys.json, &JsonPath::Root, &data)
                .await?;
        } else {
            tracing::info!(key = %self.keys.json, "initializing new JSON data for brain");
            self.brain.merge_data(Map::new()).await;
        }

        self.event_bus.publish(BrainEvent::Connected);
        Ok(())
    }

    /// Persists one save payload. `None` is treated as `{}`.
    ///
    /// Text format overwrites `<prefix>:storage` with the whole payload.
    /// JSON format writes only `payload[storageKey]` into field
    /// `storageKey` of `<prefix>:JSONstorage`. Saves after close are
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns [`BrainError::MissingStorageKey`] for a JSON-format payload
    /// without `storageKey` (nothing is written), or the store's error if
    /// the write fails.
    pub async fn on_save(&self, payload: Option<Value>) -> Result<(), BrainError> {
        if self.state.is_closed() {
            tracing::debug!("save after close dropped");
            return Ok(());
        }

        let payload = payload.unwrap_or_else(|| Value::Object(Map::new()));
        match self.data_format {
            DataFormat::Text => {
                let raw = serde_json::to_string(&payload)?;
                self.store.set(&self.keys.text, &raw).await
            }
            DataFormat::Json => {
                let Some(field) = storage_key(&payload) else {
                    return Err(BrainError::MissingStorageKey);
                };
                let value = payload.get(field).cloned().unwrap_or(Value::Null);
                self.store
                    .json_set(&self.keys.json, &JsonPath::Field(field.to_string()), &value)
                    .await
            }
        }
    }

    /// Releases the connection. Later calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the connection does not shut down
    /// cleanly.
    pub async fn on_close(&mut self) -> Result<(), BrainError> {
        if self.state.is_closed() {
            return Ok(());
        }
        self.state = ConnectionState::Closed;
        self.store.quit().await
    }

    /// Connects, loads, then serves brain events until `close`.
    ///
    /// While the connection is down, a new connect attempt is made every
    /// reconnect delay between events, and the load runs on the first
    /// attempt that gets through. Failures are logged; none of them stops
    /// the loop except `close` itself or the bus shutting down.
    pub async fn run(mut self) {
        self.connect_and_report().await;
        if self.state == ConnectionState::Disconnected {
            tracing::warn!(
                delay = ?self.reconnect_delay,
                "redis unavailable after client retries; reconnecting in the background"
            );
        }

        loop {
            let reconnect = self.state == ConnectionState::Disconnected;
            let step = tokio::select! {
                event = self.events.recv() => Step::Event(event),
                () = tokio::time::sleep(self.reconnect_delay), if reconnect => Step::Reconnect,
            };

            match step {
                Step::Reconnect => self.connect_and_report().await,
                Step::Event(Ok(BrainEvent::Save { data })) => {
                    if let Err(err) = self.on_save(data).await {
                        observe_error(&err);
                    }
                }
                Step::Event(Ok(BrainEvent::Close)) => {
                    if let Err(err) = self.on_close().await {
                        observe_error(&err);
                    }
                    break;
                }
                Step::Event(Ok(BrainEvent::Connected)) => {}
                Step::Event(Err(broadcast::error::RecvError::Lagged(n))) => {
                    tracing::warn!(lagged = n, "adapter lagged behind brain events");
                }
                Step::Event(Err(broadcast::error::RecvError::Closed)) => break,
            }
        }

        tracing::debug!(state = %self.state, "brain persistence adapter stopped");
    }

    async fn connect_and_report(&mut self) {
        if let Err(err) = self.connect().await {
            tracing::error!(error = %err, kind = err.kind(), "initial brain load failed");
        }
    }
}

/// Logs an error unless it is the expected refusal during reconnects.
fn observe_error(err: &BrainError) {
    match err {
        BrainError::ConnectionRefused(_) => {}
        BrainError::MissingStorageKey => {
            tracing::error!("storageKey is required for saving JSON data; no data was saved");
        }
        other => tracing::error!(error = %other, kind = other.kind(), "redis error"),
    }
}

/// Parses a persisted snapshot. Non-object snapshots merge nothing.
fn parse_snapshot(raw: &str) -> Result<Map<String, Value>, BrainError> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        other => {
            tracing::warn!(kind = json_kind(&other), "snapshot is not an object; nothing merged");
            Ok(Map::new())
        }
    }
}

fn storage_key(payload: &Value) -> Option<&str> {
    payload
        .get(STORAGE_KEY_FIELD)
        .and_then(Value::as_str)
        .filter(|key| !key.is_empty())
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
