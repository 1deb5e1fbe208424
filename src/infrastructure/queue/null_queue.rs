//! Fallback queue used when Redis is not configured.

use super::service::{FallbackQueue, QueueError, QueueResult};
use async_trait::async_trait;

/// A queue that cannot hold anything.
///
/// Pushes fail with [`QueueError::Unavailable`], which sends the event
/// publisher straight to its direct-increment tier.
pub struct NullFallbackQueue;

const REASON: &str = "Redis is not configured";

#[async_trait]
impl FallbackQueue for NullFallbackQueue {
    async fn push_tail(&self, _payload: &str) -> QueueResult<()> {
        Err(QueueError::Unavailable(REASON.to_string()))
    }

    async fn pop_tail(&self) -> QueueResult<Option<String>> {
        Ok(None)
    }

    async fn push_head(&self, _payload: &str) -> QueueResult<()> {
        Err(QueueError::Unavailable(REASON.to_string()))
    }

    async fn len(&self) -> QueueResult<u64> {
        Ok(0)
    }

    async fn clear(&self) -> QueueResult<bool> {
        Ok(false)
    }
}
