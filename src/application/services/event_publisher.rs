//! Three-tier delivery of access events: broker, fallback queue, direct increment.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::domain::access_event::{AccessEvent, URL_ACCESSED_ROUTING_KEY};
use crate::domain::repositories::ShortLinkRepository;
use crate::infrastructure::broker::{EventBroker, publish_with_deadline};
use crate::infrastructure::queue::FallbackQueue;

/// Default exchange access events are published to.
pub const DEFAULT_ANALYTICS_TOPIC: &str = "analytics";

/// Default deadline for a broker publish.
pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_millis(2000);

/// Which tier accepted an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Confirmed by the broker.
    Published,
    /// Parked in the fallback queue for the reconciler.
    Queued,
    /// Counted straight into the store. `affected` is 0 when the code no longer exists.
    DirectIncrement { affected: u64 },
    /// Every tier failed; the event is gone.
    Dropped,
}

impl PublishOutcome {
    fn tier(&self) -> &'static str {
        match self {
            PublishOutcome::Published => "broker",
            PublishOutcome::Queued => "queue",
            PublishOutcome::DirectIncrement { .. } => "direct",
            PublishOutcome::Dropped => "dropped",
        }
    }
}

/// Delivers access events without ever failing the caller.
///
/// Tiers are tried in order and the first that accepts the event wins:
///
/// 1. Publish to the broker, bounded by `publish_timeout`
/// 2. Push the serialized event onto the fallback queue
/// 3. Increment the counter in the store directly
///
/// A failure in tier 3 is terminal: the event is logged and dropped.
pub struct EventPublisher<R: ShortLinkRepository + ?Sized> {
    broker: Option<Arc<dyn EventBroker>>,
    queue: Arc<dyn FallbackQueue>,
    repository: Arc<R>,
    topic: String,
    publish_timeout: Duration,
}

impl<R: ShortLinkRepository + ?Sized> EventPublisher<R> {
    /// `broker` is `None` when no broker is configured; tier 1 is then skipped.
    pub fn new(
        broker: Option<Arc<dyn EventBroker>>,
        queue: Arc<dyn FallbackQueue>,
        repository: Arc<R>,
        topic: impl Into<String>,
        publish_timeout: Duration,
    ) -> Self {
        Self {
            broker,
            queue,
            repository,
            topic: topic.into(),
            publish_timeout,
        }
    }

    /// Runs the cascade for one event and reports which tier took it.
    pub async fn publish(&self, event: AccessEvent) -> PublishOutcome {
        let outcome = self.deliver(&event).await;
        metrics::counter!("analytics_events_total", "tier" => outcome.tier()).increment(1);
        outcome
    }

    async fn deliver(&self, event: &AccessEvent) -> PublishOutcome {
        let payload = match event.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                error!(short_code = %event.short_code, error = %e, "Failed to serialize access event");
                return self.increment_directly(event).await;
            }
        };

        if let Some(broker) = &self.broker {
            match publish_with_deadline(
                broker.as_ref(),
                &self.topic,
                URL_ACCESSED_ROUTING_KEY,
                payload.as_bytes(),
                self.publish_timeout,
            )
            .await
            {
                Ok(()) => {
                    debug!(short_code = %event.short_code, tier = "broker", "Access event published");
                    return PublishOutcome::Published;
                }
                Err(e) => {
                    warn!(short_code = %event.short_code, tier = "broker", error = %e, "Broker publish failed, falling back to queue");
                }
            }
        }

        match self.queue.push_tail(&payload).await {
            Ok(()) => {
                info!(short_code = %event.short_code, tier = "queue", "Access event queued for reconciliation");
                PublishOutcome::Queued
            }
            Err(e) => {
                error!(short_code = %event.short_code, tier = "queue", error = %e, "Fallback queue push failed, incrementing directly");
                self.increment_directly(event).await
            }
        }
    }

    async fn increment_directly(&self, event: &AccessEvent) -> PublishOutcome {
        match self.repository.increment_count(&event.short_code, 1).await {
            Ok(affected) => {
                if affected == 0 {
                    warn!(short_code = %event.short_code, tier = "direct", "Direct increment matched no live link");
                } else {
                    warn!(short_code = %event.short_code, tier = "direct", "Access event counted directly");
                }
                PublishOutcome::DirectIncrement { affected }
            }
            Err(e) => {
                error!(short_code = %event.short_code, tier = "direct", error = %e, "All delivery tiers failed, access event dropped");
                PublishOutcome::Dropped
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::access_event::ClientInfo;
    use crate::domain::repositories::MockShortLinkRepository;
    use crate::error::AppError;
    use crate::infrastructure::broker::{BrokerError, MockEventBroker};
    use crate::infrastructure::queue::{MockFallbackQueue, QueueError};
    use serde_json::json;

    fn event() -> AccessEvent {
        AccessEvent::new("abc123", ClientInfo::new(Some("10.0.0.1".into()), Some("curl")))
    }

    fn publisher(
        broker: Option<MockEventBroker>,
        queue: MockFallbackQueue,
        repository: MockShortLinkRepository,
    ) -> EventPublisher<MockShortLinkRepository> {
        EventPublisher::new(
            broker.map(|b| Arc::new(b) as Arc<dyn EventBroker>),
            Arc::new(queue),
            Arc::new(repository),
            DEFAULT_ANALYTICS_TOPIC,
            Duration::from_millis(50),
        )
    }

    #[tokio::test]
    async fn test_broker_success_stops_cascade() {
        let mut broker = MockEventBroker::new();
        broker
            .expect_publish()
            .withf(|topic, key, _| topic == "analytics" && key == "url.accessed")
            .times(1)
            .returning(|_, _, _| Ok(()));

        let mut queue = MockFallbackQueue::new();
        queue.expect_push_tail().times(0);
        let mut repository = MockShortLinkRepository::new();
        repository.expect_increment_count().times(0);

        let outcome = publisher(Some(broker), queue, repository)
            .publish(event())
            .await;

        assert_eq!(outcome, PublishOutcome::Published);
    }

    #[tokio::test]
    async fn test_broker_failure_queues_serialized_event() {
        let mut broker = MockEventBroker::new();
        broker
            .expect_publish()
            .returning(|_, _, _| Err(BrokerError::Unavailable("closed".into())));

        let mut queue = MockFallbackQueue::new();
        queue
            .expect_push_tail()
            .withf(|payload| {
                AccessEvent::from_json(payload.as_bytes())
                    .map(|e| e.short_code == "abc123")
                    .unwrap_or(false)
            })
            .times(1)
            .returning(|_| Ok(()));

        let mut repository = MockShortLinkRepository::new();
        repository.expect_increment_count().times(0);

        let outcome = publisher(Some(broker), queue, repository)
            .publish(event())
            .await;

        assert_eq!(outcome, PublishOutcome::Queued);
    }

    #[tokio::test]
    async fn test_missing_broker_goes_straight_to_queue() {
        let mut queue = MockFallbackQueue::new();
        queue.expect_push_tail().times(1).returning(|_| Ok(()));

        let outcome = publisher(None, queue, MockShortLinkRepository::new())
            .publish(event())
            .await;

        assert_eq!(outcome, PublishOutcome::Queued);
    }

    #[tokio::test]
    async fn test_queue_failure_increments_directly() {
        let mut broker = MockEventBroker::new();
        broker
            .expect_publish()
            .returning(|_, _, _| Err(BrokerError::Nacked));

        let mut queue = MockFallbackQueue::new();
        queue
            .expect_push_tail()
            .returning(|_| Err(QueueError::Unavailable("refused".into())));

        let mut repository = MockShortLinkRepository::new();
        repository
            .expect_increment_count()
            .withf(|code, delta| code == "abc123" && *delta == 1)
            .times(1)
            .returning(|_, _| Ok(1));

        let outcome = publisher(Some(broker), queue, repository)
            .publish(event())
            .await;

        assert_eq!(outcome, PublishOutcome::DirectIncrement { affected: 1 });
    }

    #[tokio::test]
    async fn test_all_tiers_failing_drops_without_panicking() {
        let mut queue = MockFallbackQueue::new();
        queue
            .expect_push_tail()
            .returning(|_| Err(QueueError::Unavailable("refused".into())));

        let mut repository = MockShortLinkRepository::new();
        repository
            .expect_increment_count()
            .returning(|_, _| Err(AppError::internal("db down", json!({}))));

        let outcome = publisher(None, queue, repository).publish(event()).await;

        assert_eq!(outcome, PublishOutcome::Dropped);
    }
}
