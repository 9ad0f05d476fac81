//! Redis adapter for WindowStore
//!
//! One sorted set per rate-limit key, members scored by request time in
//! milliseconds. The connection is opened on first use so the API can start
//! while Redis is down. Connecting and the command share one timeout, and a
//! failed connect starts a short backoff during which calls fail at once
//! instead of queueing behind another connect attempt.

use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::Utc;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Client, RedisResult};
use tokio::sync::OnceCell;
use tokio::time::timeout;

use crate::domain::ports::WindowStore;
use crate::error::RateLimitError;

/// Pause between connect attempts while Redis is unreachable
const RECONNECT_BACKOFF_MS: i64 = 1_000;

/// Redis implementation of WindowStore
pub struct RedisWindowStore {
    client: Client,
    connection: OnceCell<ConnectionManager>,
    /// Unix millis before which no new connect is attempted
    reconnect_after_ms: AtomicI64,
    timeout_ms: u64,
}

impl RedisWindowStore {
    /// Parse the URL; no connection is made until the first command
    pub fn new(redis_url: &str, timeout_ms: u64) -> Result<Self, RateLimitError> {
        let client = Client::open(redis_url)?;
        Ok(Self {
            client,
            connection: OnceCell::new(),
            reconnect_after_ms: AtomicI64::new(0),
            timeout_ms,
        })
    }

    fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn start_backoff(&self) {
        self.reconnect_after_ms.store(
            Utc::now().timestamp_millis() + RECONNECT_BACKOFF_MS,
            Ordering::Relaxed,
        );
    }

    fn backing_off(&self) -> bool {
        Utc::now().timestamp_millis() < self.reconnect_after_ms.load(Ordering::Relaxed)
    }

    async fn connection(&self) -> Result<ConnectionManager, RateLimitError> {
        if let Some(manager) = self.connection.get() {
            return Ok(manager.clone());
        }
        if self.backing_off() {
            return Err(RateLimitError::Unavailable(
                "waiting before reconnecting".to_string(),
            ));
        }

        let manager = self
            .connection
            .get_or_try_init(|| async {
                let config = ConnectionManagerConfig::new().set_number_of_retries(1);
                match self.client.get_connection_manager_with_config(config).await {
                    Ok(manager) => {
                        tracing::info!("Connected to Redis window store");
                        Ok(manager)
                    }
                    Err(e) => {
                        self.start_backoff();
                        Err(RateLimitError::from(e))
                    }
                }
            })
            .await?;

        Ok(manager.clone())
    }

    /// Connect if needed and run `command`, all within one timeout
    async fn run<T, F, Fut>(&self, command: F) -> Result<T, RateLimitError>
    where
        F: FnOnce(ConnectionManager) -> Fut,
        Fut: Future<Output = RedisResult<T>>,
    {
        let call = async {
            let conn = self.connection().await?;
            command(conn).await.map_err(RateLimitError::from)
        };

        match timeout(self.timeout(), call).await {
            Ok(result) => result,
            Err(_) => {
                if self.connection.get().is_none() {
                    self.start_backoff();
                }
                Err(RateLimitError::Timeout(self.timeout_ms))
            }
        }
    }
}

#[async_trait]
impl WindowStore for RedisWindowStore {
    async fn add(&self, key: &str, member: &str, score_ms: i64) -> Result<(), RateLimitError> {
        self.run(|mut conn| async move {
            let _: i64 = conn.zadd(key, member, score_ms).await?;
            Ok(())
        })
        .await
    }

    async fn remove_before(&self, key: &str, cutoff_ms: i64) -> Result<(), RateLimitError> {
        // exclusive upper bound
        let max = format!("({}", cutoff_ms);
        self.run(|mut conn| async move {
            let _: i64 = conn.zrembyscore(key, "-inf", max).await?;
            Ok(())
        })
        .await
    }

    async fn count(&self, key: &str) -> Result<u64, RateLimitError> {
        self.run(|mut conn| async move { conn.zcard(key).await })
            .await
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> Result<(), RateLimitError> {
        let seconds = i64::try_from(ttl_seconds).unwrap_or(i64::MAX);
        self.run(|mut conn| async move {
            let _: bool = conn.expire(key, seconds).await?;
            Ok(())
        })
        .await
    }
}
