mod common;

use common::{InMemoryFallbackQueue, InMemoryShortLinkRepository, RecordingBroker, StalledBroker};
use linkrelay::application::services::{EventPublisher, PublishOutcome};
use linkrelay::domain::access_event::{AccessEvent, ClientInfo};
use linkrelay::infrastructure::broker::EventBroker;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

fn event(code: &str) -> AccessEvent {
    AccessEvent::new(code, ClientInfo::new(Some("10.0.0.1".into()), Some("curl/8.0")))
}

fn publisher(
    broker: Option<Arc<dyn EventBroker>>,
    queue: &Arc<InMemoryFallbackQueue>,
    repository: &Arc<InMemoryShortLinkRepository>,
) -> EventPublisher<InMemoryShortLinkRepository> {
    EventPublisher::new(
        broker,
        queue.clone(),
        repository.clone(),
        "analytics",
        Duration::from_millis(2000),
    )
}

#[tokio::test]
async fn test_healthy_broker_takes_the_event() {
    let broker = Arc::new(RecordingBroker::new());
    let queue = Arc::new(InMemoryFallbackQueue::new());
    let repository = Arc::new(InMemoryShortLinkRepository::new());
    repository.seed("abc123", "https://example.com", None);

    let outcome = publisher(Some(broker.clone()), &queue, &repository)
        .publish(event("abc123"))
        .await;

    assert_eq!(outcome, PublishOutcome::Published);
    assert_eq!(
        broker.topics(),
        vec![("analytics".to_string(), "url.accessed".to_string())]
    );

    let sent = AccessEvent::from_json(broker.payloads()[0].as_bytes()).unwrap();
    assert_eq!(sent.short_code, "abc123");
    assert_eq!(sent.ip.as_deref(), Some("10.0.0.1"));

    assert_eq!(queue.size(), 0);
    assert_eq!(repository.count_of("abc123"), Some(0));
}

#[tokio::test(start_paused = true)]
async fn test_stalled_broker_times_out_into_queue_exactly_once() {
    let broker = Arc::new(StalledBroker::default());
    let queue = Arc::new(InMemoryFallbackQueue::new());
    let repository = Arc::new(InMemoryShortLinkRepository::new());
    repository.seed("abc123", "https://example.com", None);

    let outcome = publisher(Some(broker.clone()), &queue, &repository)
        .publish(event("abc123"))
        .await;

    assert_eq!(outcome, PublishOutcome::Queued);
    assert_eq!(broker.attempts.load(Ordering::SeqCst), 1);
    assert_eq!(queue.size(), 1);
    assert_eq!(queue.pushes.load(Ordering::SeqCst), 1);
    assert_eq!(repository.increments.load(Ordering::SeqCst), 0);

    let queued = AccessEvent::from_json(queue.head_to_tail()[0].as_bytes()).unwrap();
    assert_eq!(queued.short_code, "abc123");
}

#[tokio::test]
async fn test_failed_broker_falls_back_to_queue() {
    let broker = Arc::new(RecordingBroker::failing_from(1));
    let queue = Arc::new(InMemoryFallbackQueue::new());
    let repository = Arc::new(InMemoryShortLinkRepository::new());

    let outcome = publisher(Some(broker.clone()), &queue, &repository)
        .publish(event("abc123"))
        .await;

    assert_eq!(outcome, PublishOutcome::Queued);
    assert_eq!(queue.size(), 1);
    assert!(broker.payloads().is_empty());
}

#[tokio::test]
async fn test_missing_broker_goes_straight_to_queue() {
    let queue = Arc::new(InMemoryFallbackQueue::new());
    let repository = Arc::new(InMemoryShortLinkRepository::new());

    let outcome = publisher(None, &queue, &repository)
        .publish(event("abc123"))
        .await;

    assert_eq!(outcome, PublishOutcome::Queued);
    assert_eq!(queue.size(), 1);
}

#[tokio::test]
async fn test_broker_and_queue_outage_counts_directly() {
    let broker = Arc::new(RecordingBroker::failing_from(1));
    let queue = Arc::new(InMemoryFallbackQueue::new());
    queue.fail.store(true, Ordering::SeqCst);
    let repository = Arc::new(InMemoryShortLinkRepository::new());
    repository.seed("abc123", "https://example.com", None);

    let outcome = publisher(Some(broker), &queue, &repository)
        .publish(event("abc123"))
        .await;

    assert_eq!(outcome, PublishOutcome::DirectIncrement { affected: 1 });
    assert_eq!(repository.count_of("abc123"), Some(1));
}

#[tokio::test]
async fn test_direct_increment_for_unknown_code_affects_nothing() {
    let queue = Arc::new(InMemoryFallbackQueue::new());
    queue.fail.store(true, Ordering::SeqCst);
    let repository = Arc::new(InMemoryShortLinkRepository::new());

    let outcome = publisher(None, &queue, &repository)
        .publish(event("gone00"))
        .await;

    assert_eq!(outcome, PublishOutcome::DirectIncrement { affected: 0 });
}

#[tokio::test]
async fn test_every_tier_down_drops_the_event() {
    let broker = Arc::new(RecordingBroker::failing_from(1));
    let queue = Arc::new(InMemoryFallbackQueue::new());
    queue.fail.store(true, Ordering::SeqCst);
    let repository = Arc::new(InMemoryShortLinkRepository::new());
    repository.seed("abc123", "https://example.com", None);
    repository.fail_increments.store(true, Ordering::SeqCst);

    let outcome = publisher(Some(broker), &queue, &repository)
        .publish(event("abc123"))
        .await;

    assert_eq!(outcome, PublishOutcome::Dropped);
    assert_eq!(repository.count_of("abc123"), Some(0));
    assert_eq!(repository.increments.load(Ordering::SeqCst), 1);
}
