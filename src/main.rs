//! redis-brain entry point.
//!
//! Runs the persistence adapter against an in-memory brain until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use redis_brain::config::BrainConfig;
use redis_brain::domain::{EventBus, MemoryBrain};
use redis_brain::persistence::RedisStore;
use redis_brain::service::BrainPersistenceAdapter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = BrainConfig::from_env()?;
    tracing::info!(
        prefix = %config.connection.key_prefix,
        format = ?config.data_format,
        "starting redis-brain"
    );

    // Build domain layer
    let event_bus = EventBus::new(config.event_bus_capacity);
    let brain = Arc::new(MemoryBrain::new(event_bus.clone()));

    // Build persistence layer
    let store = Arc::new(RedisStore::new(&config.connection, config.connect_retries));

    // Start adapter before the saver so auto-save is already off
    let adapter = BrainPersistenceAdapter::new(&config, store, Arc::clone(&brain), event_bus);
    let adapter_task = tokio::spawn(adapter.run());
    let saver = brain.spawn_auto_save(
        Duration::from_secs(config.save_interval_secs.max(1)),
        config.data_format,
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");

    saver.abort();
    brain.close().await;
    adapter_task.await?;

    Ok(())
}
