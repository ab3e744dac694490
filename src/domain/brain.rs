//! The brain: the host's in-memory key-value state.
//!
//! [`Brain`] is the surface the adapter consumes. [`MemoryBrain`] is the
//! bundled implementation used by the binary and the tests; it publishes
//! its save and close requests through the [`EventBus`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use super::{BrainEvent, EventBus};
use crate::config::DataFormat;

/// Payload field naming which top-level key a JSON-format save persists.
pub const STORAGE_KEY_FIELD: &str = "storageKey";

/// In-memory state container the adapter loads into.
#[async_trait]
pub trait Brain: Send + Sync + 'static {
    /// Shallow-merges `data` into the current state: every top-level key
    /// of `data` replaces the key of the same name.
    async fn merge_data(&self, data: Map<String, Value>);

    /// Returns a copy of the current state.
    async fn data(&self) -> Map<String, Value>;

    /// Returns `true` if the state holds no keys.
    async fn is_empty(&self) -> bool;

    /// Enables or disables periodic saving.
    fn set_auto_save(&self, enabled: bool);
}

/// Brain backed by a `RwLock<Map>`.
#[derive(Debug)]
pub struct MemoryBrain {
    data: RwLock<Map<String, Value>>,
    auto_save: AtomicBool,
    event_bus: EventBus,
}

impl MemoryBrain {
    /// Creates an empty brain publishing on `event_bus`. Auto-save starts
    /// enabled, as in the host framework.
    #[must_use]
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            data: RwLock::new(Map::new()),
            auto_save: AtomicBool::new(true),
            event_bus,
        }
    }

    /// Returns whether periodic saving is currently enabled.
    #[must_use]
    pub fn auto_save(&self) -> bool {
        self.auto_save.load(Ordering::SeqCst)
    }

    /// Sets a single top-level key.
    pub async fn set(&self, key: impl Into<String>, value: Value) {
        self.data.write().await.insert(key.into(), value);
    }

    /// Returns the value of a top-level key.
    pub async fn get(&self, key: &str) -> Option<Value> {
        self.data.read().await.get(key).cloned()
    }

    /// Publishes the full state as a save event.
    pub async fn save(&self) -> usize {
        let snapshot = Value::Object(self.data().await);
        self.event_bus.publish(BrainEvent::save(snapshot))
    }

    /// Publishes a partial save for one top-level key, in the shape the
    /// JSON wire format expects: `{"storageKey": key, key: value}`.
    pub async fn save_field(&self, key: &str) -> usize {
        let value = self.get(key).await.unwrap_or(Value::Null);
        let mut payload = Map::new();
        payload.insert(STORAGE_KEY_FIELD.to_string(), Value::String(key.to_string()));
        payload.insert(key.to_string(), value);
        self.event_bus.publish(BrainEvent::save(Value::Object(payload)))
    }

    /// Publishes one partial save per top-level key.
    pub async fn save_fields(&self) -> usize {
        let keys: Vec<String> = self.data.read().await.keys().cloned().collect();
        let mut delivered = 0;
        for key in &keys {
            delivered += self.save_field(key).await;
        }
        delivered
    }

    /// Saves one last time and asks the adapter to release its connection.
    pub async fn close(&self) {
        self.save().await;
        self.event_bus.publish(BrainEvent::Close);
    }

    /// Spawns the periodic saver. Ticks while auto-save is disabled are
    /// skipped. In JSON format every top-level key is saved on its own,
    /// since that format only persists payloads naming a `storageKey`.
    pub fn spawn_auto_save(
        self: &Arc<Self>,
        interval: Duration,
        format: DataFormat,
    ) -> JoinHandle<()> {
        let brain = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !brain.auto_save() {
                    continue;
                }
                match format {
                    DataFormat::Text => brain.save().await,
                    DataFormat::Json => brain.save_fields().await,
                };
            }
        })
    }
}

#[async_trait]
impl Brain for MemoryBrain {
    async fn merge_data(&self, data: Map<String, Value>) {
        let mut current = self.data.write().await;
        for (key, value) in data {
            current.insert(key, value);
        }
    }

    async fn data(&self) -> Map<String, Value> {
        self.data.read().await.clone()
    }

    async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }

    fn set_auto_save(&self, enabled: bool) {
        self.auto_save.store(enabled, Ordering::SeqCst);
    }
}
