//! Fallback queue trait and error types.

use async_trait::async_trait;

/// Errors raised by the fallback queue.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Fallback queue unavailable: {0}")]
    Unavailable(String),
    #[error("Fallback queue operation failed: {0}")]
    OperationError(String),
}

/// Result type for fallback queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Durable list of serialized access events that could not reach the broker.
///
/// Events are enqueued at the tail and drained from the tail. An event whose
/// re-publish fails during a drain is put back at the head so it does not
/// jump ahead of entries that have not been attempted yet.
///
/// # Implementations
///
/// - [`crate::infrastructure::queue::RedisFallbackQueue`] - Redis list sharing the cache connection
/// - [`crate::infrastructure::queue::NullFallbackQueue`] - Rejects everything when Redis is not configured
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FallbackQueue: Send + Sync {
    /// Appends a payload at the tail.
    async fn push_tail(&self, payload: &str) -> QueueResult<()>;

    /// Removes and returns the payload at the tail, or `None` when empty.
    async fn pop_tail(&self) -> QueueResult<Option<String>>;

    /// Inserts a payload at the head.
    async fn push_head(&self, payload: &str) -> QueueResult<()>;

    /// Number of queued payloads.
    async fn len(&self) -> QueueResult<u64>;

    /// Deletes every queued payload. Returns true if anything was removed.
    async fn clear(&self) -> QueueResult<bool>;
}
