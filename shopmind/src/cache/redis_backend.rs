//! Remote cache backend over the redis protocol.
//!
//! The connection is opened lazily on first use; each command gets one
//! reconnect-and-retry before giving up. Per the cache contract, command
//! failures never surface: they log a warning and read as a miss.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::FromRedisValue;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{Cache, CacheError};

/// Remote [`Cache`] backed by a redis-compatible server.
pub struct RedisCache {
    client: redis::Client,
    key_prefix: String,
    connection: Arc<Mutex<Option<redis::aio::MultiplexedConnection>>>,
}

impl RedisCache {
    /// Builds a client for `url` with the given key prefix. Does not connect.
    pub fn new(url: &str, key_prefix: impl Into<String>) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)
            .map_err(|e| CacheError::Unavailable(format!("invalid redis url {}: {}", url, e)))?;
        Ok(Self {
            client,
            key_prefix: key_prefix.into(),
            connection: Arc::new(Mutex::new(None)),
        })
    }

    /// Builds a client and probes the server with PING. Used at namespace
    /// construction to decide whether the remote backend is usable at all.
    pub async fn connect_and_ping(
        url: &str,
        key_prefix: impl Into<String>,
    ) -> Result<Self, CacheError> {
        let cache = Self::new(url, key_prefix)?;
        let pong: String = cache
            .run_command("ping", || redis::cmd("PING"))
            .await?;
        if pong != "PONG" {
            return Err(CacheError::Transport(format!(
                "unexpected ping reply: {}",
                pong
            )));
        }
        debug!(key_prefix = %cache.key_prefix, "redis cache backend connected");
        Ok(cache)
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    async fn ensure_connection(
        &self,
        connection: &mut Option<redis::aio::MultiplexedConnection>,
    ) -> Result<(), CacheError> {
        if connection.is_some() {
            return Ok(());
        }
        *connection = Some(
            self.client
                .get_multiplexed_async_connection()
                .await
                .map_err(|e| CacheError::Unavailable(format!("redis connect failed: {}", e)))?,
        );
        Ok(())
    }

    /// Runs one command with a single reconnect-and-retry on failure.
    async fn run_command<T, F>(&self, operation: &'static str, build: F) -> Result<T, CacheError>
    where
        T: FromRedisValue + Send,
        F: Fn() -> redis::Cmd,
    {
        let mut last_err: Option<CacheError> = None;
        for attempt in 0..2 {
            let mut conn_guard = self.connection.lock().await;
            self.ensure_connection(&mut conn_guard).await?;
            let conn = conn_guard
                .as_mut()
                .ok_or_else(|| CacheError::Unavailable("redis connection unavailable".into()))?;
            let cmd = build();
            let result: redis::RedisResult<T> = cmd.query_async(conn).await;
            match result {
                Ok(value) => return Ok(value),
                Err(err) => {
                    warn!(
                        operation,
                        attempt = attempt + 1,
                        error = %err,
                        "redis command failed; reconnecting"
                    );
                    *conn_guard = None;
                    last_err = Some(CacheError::Transport(err.to_string()));
                }
            }
        }
        Err(last_err
            .unwrap_or_else(|| CacheError::Transport("redis command failed".into())))
    }

    /// SCAN cursor walk over this prefix's keys.
    async fn scan_keys(&self) -> Result<Vec<String>, CacheError> {
        let pattern = format!("{}*", self.key_prefix);
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();
        loop {
            let (next, batch): (u64, Vec<String>) = self
                .run_command("scan", || {
                    let mut cmd = redis::cmd("SCAN");
                    cmd.arg(cursor).arg("MATCH").arg(&pattern).arg("COUNT").arg(100);
                    cmd
                })
                .await?;
            keys.extend(batch);
            cursor = next;
            if cursor == 0 {
                break;
            }
        }
        Ok(keys)
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Option<String> {
        let full = self.full_key(key);
        match self
            .run_command::<Option<String>, _>("get", || {
                let mut cmd = redis::cmd("GET");
                cmd.arg(&full);
                cmd
            })
            .await
        {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %full, error = %e, "redis get degraded to miss");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) {
        let full = self.full_key(key);
        let result: Result<(), CacheError> = self
            .run_command("set", || {
                let mut cmd = redis::cmd("SET");
                cmd.arg(&full).arg(value);
                if let Some(d) = ttl {
                    cmd.arg("EX").arg(d.as_secs().max(1));
                }
                cmd
            })
            .await;
        if let Err(e) = result {
            warn!(key = %full, error = %e, "redis set dropped");
        }
    }

    async fn delete(&self, key: &str) -> bool {
        let full = self.full_key(key);
        match self
            .run_command::<i64, _>("delete", || {
                let mut cmd = redis::cmd("DEL");
                cmd.arg(&full);
                cmd
            })
            .await
        {
            Ok(count) => count > 0,
            Err(e) => {
                warn!(key = %full, error = %e, "redis delete dropped");
                false
            }
        }
    }

    async fn clear(&self) {
        let keys = match self.scan_keys().await {
            Ok(k) => k,
            Err(e) => {
                warn!(error = %e, "redis clear dropped");
                return;
            }
        };
        if keys.is_empty() {
            return;
        }
        let result: Result<(), CacheError> = self
            .run_command("clear", || {
                let mut cmd = redis::cmd("DEL");
                for k in &keys {
                    cmd.arg(k);
                }
                cmd
            })
            .await;
        if let Err(e) = result {
            warn!(error = %e, "redis clear dropped");
        }
    }

    async fn size(&self) -> usize {
        match self.scan_keys().await {
            Ok(keys) => keys.len(),
            Err(e) => {
                warn!(error = %e, "redis size degraded to 0");
                0
            }
        }
    }
}
