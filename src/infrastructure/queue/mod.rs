//! Durable fallback queue for analytics events the broker did not accept.
//!
//! - [`RedisFallbackQueue`] - Redis list sharing the cache connection
//! - [`NullFallbackQueue`] - Used when Redis is not configured

mod null_queue;
mod redis_queue;
mod service;

pub use null_queue::NullFallbackQueue;
pub use redis_queue::{DEFAULT_FALLBACK_QUEUE_KEY, RedisFallbackQueue};
pub use service::{FallbackQueue, QueueError, QueueResult};

#[cfg(test)]
pub use service::MockFallbackQueue;
