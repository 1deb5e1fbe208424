//! Turns broker deliveries into counter increments.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::domain::access_event::AccessEvent;
use crate::domain::repositories::ShortLinkRepository;
use crate::infrastructure::broker::DeliveryHandler;

/// Why a delivery was not counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The body was not an access event.
    Malformed,
    /// No live link uses the code, e.g. it was deleted after the event was queued.
    UnknownShortCode,
    /// The increment failed.
    StoreUnavailable,
}

/// Result of handling one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    Delivered,
    Dropped(DropReason),
}

impl ConsumeOutcome {
    fn label(&self) -> &'static str {
        match self {
            ConsumeOutcome::Delivered => "delivered",
            ConsumeOutcome::Dropped(DropReason::Malformed) => "malformed",
            ConsumeOutcome::Dropped(DropReason::UnknownShortCode) => "unknown_short_code",
            ConsumeOutcome::Dropped(DropReason::StoreUnavailable) => "store_unavailable",
        }
    }
}

/// Applies one counter increment per delivered access event.
///
/// Failures are reported as [`ConsumeOutcome::Dropped`] and never requeued;
/// redelivery is left to the publishing cascade.
pub struct AnalyticsConsumer<R: ShortLinkRepository + ?Sized> {
    repository: Arc<R>,
}

impl<R: ShortLinkRepository + ?Sized> AnalyticsConsumer<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self, payload: &[u8]) -> ConsumeOutcome {
        let outcome = self.apply(payload).await;
        metrics::counter!("analytics_consumed_total", "result" => outcome.label()).increment(1);
        outcome
    }

    async fn apply(&self, payload: &[u8]) -> ConsumeOutcome {
        let event = match AccessEvent::from_json(payload) {
            Ok(event) => event,
            Err(e) => {
                error!(error = %e, "Dropping malformed analytics message");
                return ConsumeOutcome::Dropped(DropReason::Malformed);
            }
        };

        match self.repository.increment_count(&event.short_code, 1).await {
            Ok(0) => {
                warn!(short_code = %event.short_code, "Access event for unknown short code");
                ConsumeOutcome::Dropped(DropReason::UnknownShortCode)
            }
            Ok(_) => {
                debug!(short_code = %event.short_code, "Access counted");
                ConsumeOutcome::Delivered
            }
            Err(e) => {
                error!(short_code = %event.short_code, error = %e, "Failed to count access event");
                ConsumeOutcome::Dropped(DropReason::StoreUnavailable)
            }
        }
    }
}

#[async_trait]
impl<R: ShortLinkRepository + ?Sized> DeliveryHandler for AnalyticsConsumer<R> {
    async fn handle_delivery(&self, payload: &[u8]) {
        self.handle(payload).await;
    }
}
