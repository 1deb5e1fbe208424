//! Cache-aside resolution of short codes on the redirect hot path.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, error, warn};

use super::event_publisher::EventPublisher;
use crate::domain::access_event::{AccessEvent, ClientInfo};
use crate::domain::repositories::ShortLinkRepository;
use crate::error::AppError;
use crate::infrastructure::cache::CacheService;

/// Resolves short codes to destination URLs and emits an access event per hit.
///
/// # Request Flow
///
/// 1. Look up `url:<code>` in the cache
/// 2. On a hit, emit the event and return the cached origin
/// 3. On a miss (or a cache error), read the store, populate the cache,
///    emit the event and return the origin
///
/// Event emission is spawned onto the runtime, so the response never waits
/// on the broker, the fallback queue or the direct increment.
pub struct RedirectResolver<R: ShortLinkRepository + ?Sized + 'static> {
    repository: Arc<R>,
    cache: Arc<dyn CacheService>,
    publisher: Arc<EventPublisher<R>>,
}

impl<R: ShortLinkRepository + ?Sized + 'static> RedirectResolver<R> {
    pub fn new(
        repository: Arc<R>,
        cache: Arc<dyn CacheService>,
        publisher: Arc<EventPublisher<R>>,
    ) -> Self {
        Self {
            repository,
            cache,
            publisher,
        }
    }

    /// Returns the destination URL for `short_code`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if no live link uses the code.
    /// Returns [`AppError::Internal`] if the store cannot be read on a miss.
    pub async fn resolve(&self, short_code: &str, client: ClientInfo) -> Result<String, AppError> {
        match self.cache.get(short_code).await {
            Ok(Some(origin)) => {
                debug!(short_code, "Resolved from cache");
                self.emit(short_code, client);
                return Ok(origin);
            }
            Ok(None) => {}
            Err(e) => error!(short_code, error = %e, "Cache lookup failed, reading store"),
        }

        let link = self
            .repository
            .find_by_short_code(short_code)
            .await?
            .ok_or_else(|| {
                AppError::not_found("Short URL not found", json!({ "shortCode": short_code }))
            })?;

        if let Err(e) = self.cache.set(&link.short_code, &link.origin, None).await {
            warn!(short_code, error = %e, "Failed to populate cache");
        }

        self.emit(short_code, client);
        Ok(link.origin)
    }

    fn emit(&self, short_code: &str, client: ClientInfo) {
        let event = AccessEvent::new(short_code, client);
        let publisher = Arc::clone(&self.publisher);
        tokio::spawn(async move {
            publisher.publish(event).await;
        });
    }
}
