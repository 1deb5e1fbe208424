//! Periodic re-publication of queued access events.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::domain::access_event::{AccessEvent, URL_ACCESSED_ROUTING_KEY};
use crate::infrastructure::broker::{EventBroker, publish_with_deadline};
use crate::infrastructure::queue::FallbackQueue;

/// Default interval between drain passes.
pub const DEFAULT_DRAIN_INTERVAL: Duration = Duration::from_secs(60);

/// Attempts to put a failed event back at the head before it is given up.
const REQUEUE_ATTEMPTS: u32 = 3;
const REQUEUE_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Why a drain pass did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyRunning,
    BrokerUnavailable,
}

/// How a drain pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainStatus {
    Skipped(SkipReason),
    /// The queue held nothing when the pass started.
    Empty,
    /// Every entry present at the start was handled.
    Completed,
    /// A publish failed; the event went back to the head and the pass stopped.
    Halted,
    /// The queue itself could not be read.
    QueueUnavailable,
}

/// Counts from one drain pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    pub status: DrainStatus,
    pub published: usize,
    pub requeued: usize,
    pub discarded: usize,
    /// Events that failed to publish and could not be put back either.
    pub lost: usize,
}

impl DrainReport {
    fn new(status: DrainStatus) -> Self {
        Self {
            status,
            published: 0,
            requeued: 0,
            discarded: 0,
            lost: 0,
        }
    }
}

/// Drains the fallback queue back into the broker.
///
/// Entries are popped from the tail. A failed publish puts the entry back at
/// the head and ends the pass, so a broker that is down costs one attempt
/// per pass instead of a hot loop. Only one pass runs at a time per
/// instance; overlapping calls return [`SkipReason::AlreadyRunning`].
pub struct BacklogReconciler {
    queue: Arc<dyn FallbackQueue>,
    broker: Option<Arc<dyn EventBroker>>,
    topic: String,
    publish_timeout: Duration,
    running: AtomicBool,
}

/// Clears the running flag when a pass ends, including on early return.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl BacklogReconciler {
    pub fn new(
        queue: Arc<dyn FallbackQueue>,
        broker: Option<Arc<dyn EventBroker>>,
        topic: impl Into<String>,
        publish_timeout: Duration,
    ) -> Self {
        Self {
            queue,
            broker,
            topic: topic.into(),
            publish_timeout,
            running: AtomicBool::new(false),
        }
    }

    /// Runs one drain pass.
    ///
    /// Handles at most the number of entries queued when the pass started,
    /// so events enqueued meanwhile wait for the next pass. Entries that are
    /// not valid access events are discarded rather than re-queued.
    pub async fn drain_once(&self) -> DrainReport {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Backlog drain already in progress, skipping");
            return DrainReport::new(DrainStatus::Skipped(SkipReason::AlreadyRunning));
        }
        let _guard = RunningGuard(&self.running);

        let Some(broker) = &self.broker else {
            return DrainReport::new(DrainStatus::Skipped(SkipReason::BrokerUnavailable));
        };

        if !broker.health_check().await {
            debug!("Broker unavailable, backlog drain skipped");
            return DrainReport::new(DrainStatus::Skipped(SkipReason::BrokerUnavailable));
        }

        let pending = match self.queue.len().await {
            Ok(0) => return DrainReport::new(DrainStatus::Empty),
            Ok(n) => n,
            Err(e) => {
                error!(error = %e, "Failed to read fallback queue length");
                return DrainReport::new(DrainStatus::QueueUnavailable);
            }
        };

        info!(pending, "Draining fallback queue");
        let mut report = DrainReport::new(DrainStatus::Completed);

        for _ in 0..pending {
            let raw = match self.queue.pop_tail().await {
                Ok(Some(raw)) => raw,
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, "Failed to pop from fallback queue");
                    report.status = DrainStatus::QueueUnavailable;
                    break;
                }
            };

            let event = match AccessEvent::from_json(raw.as_bytes()) {
                Ok(event) => event,
                Err(e) => {
                    error!(error = %e, payload = %raw, "Discarding malformed fallback queue entry");
                    report.discarded += 1;
                    record("discarded");
                    continue;
                }
            };

            match publish_with_deadline(
                broker.as_ref(),
                &self.topic,
                URL_ACCESSED_ROUTING_KEY,
                raw.as_bytes(),
                self.publish_timeout,
            )
            .await
            {
                Ok(()) => {
                    report.published += 1;
                    record("published");
                }
                Err(e) => {
                    warn!(short_code = %event.short_code, error = %e, "Re-publish failed, halting drain");
                    if self.requeue(&raw).await {
                        report.requeued += 1;
                        record("requeued");
                    } else {
                        error!(short_code = %event.short_code, "Failed to requeue event, dropped");
                        report.lost += 1;
                        record("lost");
                    }
                    report.status = DrainStatus::Halted;
                    break;
                }
            }
        }

        info!(
            published = report.published,
            requeued = report.requeued,
            discarded = report.discarded,
            lost = report.lost,
            status = ?report.status,
            "Backlog drain finished"
        );
        report
    }

    /// Puts a popped entry back at the head, retrying briefly since the
    /// entry exists nowhere else once popped.
    async fn requeue(&self, raw: &str) -> bool {
        for attempt in 1..=REQUEUE_ATTEMPTS {
            match self.queue.push_head(raw).await {
                Ok(()) => return true,
                Err(e) => {
                    warn!(attempt, error = %e, "Requeue to fallback queue head failed");
                    if attempt < REQUEUE_ATTEMPTS {
                        tokio::time::sleep(REQUEUE_RETRY_DELAY).await;
                    }
                }
            }
        }
        false
    }

    /// Drains on a fixed interval for the lifetime of the task.
    pub async fn run(self: Arc<Self>, every: Duration) {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(interval_secs = every.as_secs(), "Backlog reconciler started");
        loop {
            ticker.tick().await;
            self.drain_once().await;
        }
    }
}

fn record(result: &'static str) {
    metrics::counter!("backlog_events_total", "result" => result).increment(1);
}
