//! Message broker trait, error types and the bounded publish helper.

use async_trait::async_trait;
use std::time::Duration;

/// Errors raised while publishing to the broker.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("Broker did not confirm within {0:?}")]
    Timeout(Duration),
    #[error("Broker unavailable: {0}")]
    Unavailable(String),
    #[error("Broker rejected the message")]
    Nacked,
    #[error("Broker protocol error: {0}")]
    Protocol(String),
}

/// Result type for broker operations.
pub type BrokerResult<T> = Result<T, BrokerError>;

/// Outbound side of the message broker.
///
/// # Implementations
///
/// - [`crate::infrastructure::broker::AmqpBroker`] - RabbitMQ topic exchange with publisher confirms
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EventBroker: Send + Sync {
    /// Publishes `payload` to `topic` under `routing_key`.
    ///
    /// Resolves once the broker has confirmed the message.
    async fn publish(&self, topic: &str, routing_key: &str, payload: &[u8]) -> BrokerResult<()>;

    /// Returns true if the broker connection is currently usable.
    async fn health_check(&self) -> bool;
}

/// Publishes and waits for the confirmation for at most `deadline`.
///
/// The in-flight publish is dropped when the deadline wins, so a late
/// confirmation is never observed.
pub async fn publish_with_deadline(
    broker: &dyn EventBroker,
    topic: &str,
    routing_key: &str,
    payload: &[u8],
    deadline: Duration,
) -> BrokerResult<()> {
    match tokio::time::timeout(deadline, broker.publish(topic, routing_key, payload)).await {
        Ok(result) => result,
        Err(_) => Err(BrokerError::Timeout(deadline)),
    }
}
