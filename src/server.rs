//! HTTP server initialization and runtime setup.
//!
//! Handles database connections, cache and queue setup, broker wiring,
//! background workers, and the Axum server lifecycle.

use crate::application::workers::{AnalyticsConsumer, BacklogReconciler};
use crate::config::Config;
use crate::domain::access_event::URL_ACCESSED_ROUTING_KEY;
use crate::domain::repositories::ShortLinkRepository;
use crate::infrastructure::broker::{AmqpBroker, AmqpSubscriber, EventBroker, SubscriptionConfig};
use crate::infrastructure::cache::{CacheService, NullCache, RedisCache};
use crate::infrastructure::persistence::PgShortLinkRepository;
use crate::infrastructure::queue::{FallbackQueue, NullFallbackQueue};
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

const SUBSCRIBER_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool and migrations
/// - Redis cache and fallback queue (or null fallbacks)
/// - RabbitMQ publisher, backlog reconciler and analytics subscriber
///   (only when a broker is configured)
/// - Axum HTTP server
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let repository: Arc<dyn ShortLinkRepository> =
        Arc::new(PgShortLinkRepository::new(Arc::new(pool)));

    let (cache, backlog) = connect_redis(&config).await;

    let broker: Option<Arc<dyn EventBroker>> = match &config.rabbitmq_url {
        Some(uri) => {
            let broker = AmqpBroker::new(uri.clone(), config.analytics_exchange.clone());
            broker.warm_up().await;
            Some(Arc::new(broker))
        }
        None => {
            tracing::info!("Broker disabled, access events go to the fallback queue");
            None
        }
    };

    if let (Some(broker), Some(uri)) = (&broker, &config.rabbitmq_url) {
        let reconciler = Arc::new(BacklogReconciler::new(
            Arc::clone(&backlog),
            Some(Arc::clone(broker)),
            config.analytics_exchange.clone(),
            config.publish_timeout(),
        ));
        tokio::spawn(reconciler.run(config.backlog_drain_interval()));
        tracing::info!(
            every_secs = config.backlog_drain_interval_seconds,
            "Backlog reconciler started"
        );

        let consumer = Arc::new(AnalyticsConsumer::new(Arc::clone(&repository)));
        let subscriber = AmqpSubscriber::new(
            SubscriptionConfig {
                uri: uri.clone(),
                exchange: config.analytics_exchange.clone(),
                queue: config.analytics_queue.clone(),
                routing_key: URL_ACCESSED_ROUTING_KEY.to_string(),
                reconnect_delay: SUBSCRIBER_RECONNECT_DELAY,
                prefetch: config.consumer_prefetch,
            },
            consumer,
        );
        tokio::spawn(subscriber.run());
        tracing::info!(queue = %config.analytics_queue, "Analytics subscriber started");
    }

    let state = AppState::new(repository, cache, backlog, broker, config.service_settings());

    let app = app_router(state);

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid listen address '{}'", config.listen_addr))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .await?;

    Ok(())
}

/// Connects the cache and the fallback queue, which share one Redis connection.
///
/// A missing or unreachable Redis degrades to the null implementations.
async fn connect_redis(config: &Config) -> (Arc<dyn CacheService>, Arc<dyn FallbackQueue>) {
    let Some(redis_url) = &config.redis_url else {
        tracing::info!("Cache disabled (NullCache), fallback queue disabled");
        return (Arc::new(NullCache::new()), Arc::new(NullFallbackQueue));
    };

    let ttl = Duration::from_secs(config.cache_ttl_seconds);
    match RedisCache::connect(redis_url, ttl).await {
        Ok(redis) => {
            tracing::info!(key = %config.fallback_queue_key, "Cache and fallback queue enabled (Redis)");
            let queue = redis.fallback_queue(config.fallback_queue_key.clone());
            (Arc::new(redis), Arc::new(queue))
        }
        Err(e) => {
            tracing::warn!("Failed to connect to Redis: {}. Using NullCache.", e);
            (Arc::new(NullCache::new()), Arc::new(NullFallbackQueue))
        }
    }
}
