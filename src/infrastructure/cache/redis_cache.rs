//! Redis-backed cache implementation.

use super::service::{CacheError, CacheResult, CacheService};
use crate::infrastructure::queue::RedisFallbackQueue;
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Key namespace for cached mappings.
pub const URL_KEY_PREFIX: &str = "url:";

/// Builds the cache key for a short code (`url:<code>`).
pub fn url_cache_key(short_code: &str) -> String {
    format!("{URL_KEY_PREFIX}{short_code}")
}

/// Redis cache implementation for fast URL lookups.
///
/// Uses connection pooling via `ConnectionManager` for efficient connection reuse.
/// All operations are fail-open: errors are logged but don't propagate to callers.
pub struct RedisCache {
    client: ConnectionManager,
    default_ttl: Duration,
}

impl RedisCache {
    /// Connects to Redis, validates the connection with a PING, and configures the default TTL.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ConnectionError`] if the URL is invalid, the connection cannot
    /// be established, or the PING health check fails.
    pub async fn connect(redis_url: &str, default_ttl: Duration) -> CacheResult<Self> {
        info!("Connecting to Redis");

        let client = Client::open(redis_url).map_err(|e| {
            CacheError::ConnectionError(format!("Failed to create Redis client: {}", e))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::ConnectionError(format!("Failed to connect to Redis: {}", e))
        })?;

        let mut test_conn = manager.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| CacheError::ConnectionError(format!("Redis PING failed: {}", e)))?;

        info!("Connected to Redis");

        Ok(Self {
            client: manager,
            default_ttl,
        })
    }

    /// Builds the durable fallback queue on the same Redis connection.
    ///
    /// Unlike the cache, the queue reports its errors so the event publisher
    /// can cascade to the next tier.
    pub fn fallback_queue(&self, key: impl Into<String>) -> RedisFallbackQueue {
        RedisFallbackQueue::new(self.client.clone(), key)
    }
}

#[async_trait]
impl CacheService for RedisCache {
    async fn get(&self, short_code: &str) -> CacheResult<Option<String>> {
        let key = url_cache_key(short_code);
        let mut conn = self.client.clone();

        match conn.get::<_, Option<String>>(&key).await {
            Ok(Some(url)) => {
                debug!(short_code, "Cache HIT");
                Ok(Some(url))
            }
            Ok(None) => {
                debug!(short_code, "Cache MISS");
                Ok(None)
            }
            Err(e) => {
                error!(short_code, error = %e, "Redis GET error");
                Ok(None)
            }
        }
    }

    async fn set(&self, short_code: &str, origin: &str, ttl: Option<Duration>) -> CacheResult<()> {
        let key = url_cache_key(short_code);
        let mut conn = self.client.clone();
        let ttl_seconds = ttl.unwrap_or(self.default_ttl).as_secs().max(1);

        match conn.set_ex::<_, _, ()>(&key, origin, ttl_seconds).await {
            Ok(_) => {
                debug!(short_code, ttl_seconds, "Cache SET");
                Ok(())
            }
            Err(e) => {
                warn!(short_code, error = %e, "Redis SET error");
                Ok(())
            }
        }
    }

    async fn invalidate(&self, short_code: &str) -> CacheResult<()> {
        let key = url_cache_key(short_code);
        let mut conn = self.client.clone();

        match conn.del::<_, i32>(&key).await {
            Ok(deleted) => {
                if deleted > 0 {
                    debug!(short_code, "Cache INVALIDATE");
                }
                Ok(())
            }
            Err(e) => {
                warn!(short_code, error = %e, "Redis DEL error");
                Ok(())
            }
        }
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.client.clone();
        conn.ping::<()>().await.is_ok()
    }
}
