//! Redis implementation of the remote store.
//!
//! Uses a [`ConnectionManager`], which owns reconnection: the adapter
//! never retries by itself. JSON commands require the RedisJSON module
//! on the server.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use serde_json::Value;
use tokio::sync::Mutex;

use super::store::{JsonPath, RemoteStore};
use crate::config::{ConnectionConfig, Transport};
use crate::error::BrainError;

/// Longest pause between two ready-check polls.
const READY_POLL_CAP: Duration = Duration::from_secs(1);

/// Redis-backed [`RemoteStore`].
pub struct RedisStore {
    transport: Transport,
    ready_check: bool,
    connect_retries: usize,
    manager: Mutex<Option<ConnectionManager>>,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("transport", &self.transport)
            .field("ready_check", &self.ready_check)
            .field("connect_retries", &self.connect_retries)
            .finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Creates an unconnected store for the given endpoint.
    #[must_use]
    pub fn new(config: &ConnectionConfig, connect_retries: usize) -> Self {
        Self {
            transport: config.transport.clone(),
            ready_check: config.ready_check,
            connect_retries,
            manager: Mutex::new(None),
        }
    }

    fn connection_info(&self, password: Option<String>) -> ConnectionInfo {
        let addr = match &self.transport {
            Transport::Tcp { host, port } => ConnectionAddr::Tcp(host.clone(), *port),
            Transport::Unix { path } => ConnectionAddr::Unix(path.clone()),
        };
        ConnectionInfo {
            addr,
            redis: RedisConnectionInfo {
                password,
                ..RedisConnectionInfo::default()
            },
        }
    }

    async fn open(&self, password: Option<String>) -> Result<ConnectionManager, BrainError> {
        let client = redis::Client::open(self.connection_info(password))?;
        let config = ConnectionManagerConfig::new().set_number_of_retries(self.connect_retries);
        Ok(ConnectionManager::new_with_config(client, config).await?)
    }

    async fn connection(&self) -> Result<ConnectionManager, BrainError> {
        self.manager
            .lock()
            .await
            .clone()
            .ok_or(BrainError::NotConnected)
    }

    /// Polls `INFO persistence` until the server has finished loading
    /// its dataset from disk.
    async fn wait_until_ready(conn: &mut ConnectionManager) -> Result<(), BrainError> {
        loop {
            let info: String = redis::cmd("INFO")
                .arg("persistence")
                .query_async(conn)
                .await?;
            let status = LoadingStatus::parse(&info);
            if !status.loading {
                return Ok(());
            }
            let delay = Duration::from_secs(status.eta_secs.unwrap_or(1)).min(READY_POLL_CAP);
            tracing::info!(?delay, "redis is still loading its dataset");
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl RemoteStore for RedisStore {
    async fn connect(&self) -> Result<(), BrainError> {
        let mut manager = self.open(None).await?;
        if self.ready_check {
            Self::wait_until_ready(&mut manager).await?;
        }
        *self.manager.lock().await = Some(manager);
        Ok(())
    }

    async fn auth(&self, secret: &str) -> Result<(), BrainError> {
        let mut guard = self.manager.lock().await;
        if guard.is_none() {
            return Err(BrainError::NotConnected);
        }
        // The manager replays the handshake on reconnect, so the secret
        // goes into its connection info rather than a one-off AUTH.
        let manager = self.open(Some(secret.to_string())).await?;
        *guard = Some(manager);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, BrainError> {
        let mut conn = self.connection().await?;
        Ok(redis::cmd("GET").arg(key).query_async(&mut conn).await?)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), BrainError> {
        let mut conn = self.connection().await?;
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn json_get(&self, key: &str) -> Result<Option<String>, BrainError> {
        let mut conn = self.connection().await?;
        Ok(redis::cmd("JSON.GET").arg(key).query_async(&mut conn).await?)
    }

    async fn json_set(&self, key: &str, path: &JsonPath, value: &Value) -> Result<(), BrainError> {
        let mut conn = self.connection().await?;
        let payload = serde_json::to_string(value)?;

        let mut pipe = redis::pipe();
        if matches!(path, JsonPath::Field(_)) {
            pipe.cmd("JSON.SET").arg(key).arg("$").arg("{}").arg("NX").ignore();
        }
        pipe.cmd("JSON.SET")
            .arg(key)
            .arg(path.to_redis_path())
            .arg(payload)
            .ignore();
        pipe.query_async::<()>(&mut conn).await?;
        Ok(())
    }

    async fn quit(&self) -> Result<(), BrainError> {
        let Some(mut conn) = self.manager.lock().await.take() else {
            return Ok(());
        };
        if let Err(err) = redis::cmd("QUIT").query_async::<()>(&mut conn).await {
            tracing::debug!(error = %err, "redis QUIT did not complete cleanly");
        }
        Ok(())
    }
}

/// Loading fields of an `INFO persistence` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct LoadingStatus {
    loading: bool,
    eta_secs: Option<u64>,
}

impl LoadingStatus {
    fn parse(info: &str) -> Self {
        let mut status = Self::default();
        for line in info.lines() {
            match line.trim().split_once(':') {
                Some(("loading", value)) => status.loading = value == "1",
                Some(("loading_eta_seconds", value)) => status.eta_secs = value.parse().ok(),
                _ => {}
            }
        }
        status
    }
}
