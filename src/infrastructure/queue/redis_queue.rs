//! Redis list implementation of the fallback queue.

use super::service::{FallbackQueue, QueueError, QueueResult};
use async_trait::async_trait;
use redis::{AsyncCommands, RedisError, aio::ConnectionManager};
use tracing::debug;

/// Default Redis key holding undelivered analytics events.
pub const DEFAULT_FALLBACK_QUEUE_KEY: &str = "rabbitmq:fallback:events";

/// Fallback queue stored as a Redis list.
///
/// The tail is the left end of the list (`LPUSH` / `LPOP`) and the head is
/// the right end (`RPUSH`). Built with [`crate::infrastructure::cache::RedisCache::fallback_queue`]
/// so it shares the cache's connection.
pub struct RedisFallbackQueue {
    client: ConnectionManager,
    key: String,
}

impl RedisFallbackQueue {
    pub fn new(client: ConnectionManager, key: impl Into<String>) -> Self {
        Self {
            client,
            key: key.into(),
        }
    }

    /// Redis key backing this queue.
    pub fn key(&self) -> &str {
        &self.key
    }
}

fn map_redis_error(e: RedisError) -> QueueError {
    if e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout() || e.is_io_error()
    {
        QueueError::Unavailable(e.to_string())
    } else {
        QueueError::OperationError(e.to_string())
    }
}

#[async_trait]
impl FallbackQueue for RedisFallbackQueue {
    async fn push_tail(&self, payload: &str) -> QueueResult<()> {
        let mut conn = self.client.clone();
        let len: u64 = conn
            .lpush(&self.key, payload)
            .await
            .map_err(map_redis_error)?;
        debug!(key = %self.key, len, "Fallback queue LPUSH");
        Ok(())
    }

    async fn pop_tail(&self) -> QueueResult<Option<String>> {
        let mut conn = self.client.clone();
        conn.lpop::<_, Option<String>>(&self.key, None)
            .await
            .map_err(map_redis_error)
    }

    async fn push_head(&self, payload: &str) -> QueueResult<()> {
        let mut conn = self.client.clone();
        let len: u64 = conn
            .rpush(&self.key, payload)
            .await
            .map_err(map_redis_error)?;
        debug!(key = %self.key, len, "Fallback queue RPUSH");
        Ok(())
    }

    async fn len(&self) -> QueueResult<u64> {
        let mut conn = self.client.clone();
        conn.llen(&self.key).await.map_err(map_redis_error)
    }

    async fn clear(&self) -> QueueResult<bool> {
        let mut conn = self.client.clone();
        let removed: u64 = conn.del(&self.key).await.map_err(map_redis_error)?;
        Ok(removed > 0)
    }
}
