//! Shared application state injected into every handler.

use std::sync::Arc;
use std::time::Duration;

use crate::application::services::{EventPublisher, LinkService, RedirectResolver};
use crate::domain::repositories::ShortLinkRepository;
use crate::infrastructure::broker::EventBroker;
use crate::infrastructure::cache::CacheService;
use crate::infrastructure::queue::FallbackQueue;
use crate::utils::code_generator::ShortCodeGenerator;

/// Tunables the services are built with.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub base_url: String,
    pub code_length: usize,
    pub rehash_rounds: u32,
    pub analytics_topic: String,
    pub publish_timeout: Duration,
    /// Whether a Redis cache is configured; reported by the health check.
    pub cache_enabled: bool,
    /// When true, client IPs are read from `X-Forwarded-For` / `X-Real-IP`.
    pub behind_proxy: bool,
}

/// Application state cloned into handlers.
///
/// Services are built over `dyn ShortLinkRepository` so tests can swap the
/// PostgreSQL repository for an in-memory one.
#[derive(Clone)]
pub struct AppState {
    pub link_service: Arc<LinkService<dyn ShortLinkRepository>>,
    pub resolver: Arc<RedirectResolver<dyn ShortLinkRepository>>,
    pub repository: Arc<dyn ShortLinkRepository>,
    pub cache: Arc<dyn CacheService>,
    pub backlog: Arc<dyn FallbackQueue>,
    pub broker: Option<Arc<dyn EventBroker>>,
    pub cache_enabled: bool,
    pub behind_proxy: bool,
}

impl AppState {
    /// Wires the services on top of their collaborators.
    pub fn new(
        repository: Arc<dyn ShortLinkRepository>,
        cache: Arc<dyn CacheService>,
        backlog: Arc<dyn FallbackQueue>,
        broker: Option<Arc<dyn EventBroker>>,
        settings: ServiceSettings,
    ) -> Self {
        let generator = ShortCodeGenerator::new(settings.code_length, settings.rehash_rounds);

        let link_service = Arc::new(LinkService::new(
            Arc::clone(&repository),
            Arc::clone(&cache),
            generator,
            settings.base_url,
        ));

        let publisher = Arc::new(EventPublisher::new(
            broker.clone(),
            Arc::clone(&backlog),
            Arc::clone(&repository),
            settings.analytics_topic,
            settings.publish_timeout,
        ));

        let resolver = Arc::new(RedirectResolver::new(
            Arc::clone(&repository),
            Arc::clone(&cache),
            publisher,
        ));

        Self {
            link_service,
            resolver,
            repository,
            cache,
            backlog,
            broker,
            cache_enabled: settings.cache_enabled,
            behind_proxy: settings.behind_proxy,
        }
    }
}
