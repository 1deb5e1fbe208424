#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::future::pending;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use uuid::Uuid;

use linkrelay::AppError;
use linkrelay::domain::entities::{NewShortLink, ShortLink, ShortLinkPatch};
use linkrelay::domain::repositories::{LinkPage, ListQuery, ShortLinkRepository, SortOrder};
use linkrelay::infrastructure::broker::{BrokerError, BrokerResult, EventBroker};
use linkrelay::infrastructure::cache::{CacheError, CacheResult, CacheService};
use linkrelay::infrastructure::queue::{FallbackQueue, QueueError, QueueResult};
use linkrelay::state::{AppState, ServiceSettings};

pub const BASE_URL: &str = "http://sho.rt";

// ── Repository ──────────────────────────────────────────────────────────────

/// In-memory store with call counters and failure switches.
#[derive(Default)]
pub struct InMemoryShortLinkRepository {
    links: Mutex<Vec<ShortLink>>,
    pub lookups: AtomicUsize,
    pub increments: AtomicUsize,
    pub fail_reads: AtomicBool,
    pub fail_increments: AtomicBool,
    pub fail_ping: AtomicBool,
    write_gate: Mutex<Option<WriteGate>>,
}

/// Pauses the next `update` or `soft_delete` before it touches the rows.
#[derive(Clone)]
pub struct WriteGate {
    pub reached: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl InMemoryShortLinkRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Holds the next write until `release` is notified. `reached` fires
    /// once the write is parked.
    pub fn hold_next_write(&self) -> WriteGate {
        let gate = WriteGate {
            reached: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        };
        *self.write_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    async fn pass_write_gate(&self) {
        let gate = self.write_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.reached.notify_one();
            gate.release.notified().await;
        }
    }

    /// Inserts a live link directly, bypassing code generation.
    pub fn seed(&self, short_code: &str, origin: &str, owner_id: Option<Uuid>) -> ShortLink {
        let mut links = self.links.lock().unwrap();
        // Spread creation times so ordering is deterministic.
        let created_at = Utc::now() + ChronoDuration::milliseconds(links.len() as i64);
        let link = ShortLink::new(
            Uuid::new_v4(),
            origin.to_string(),
            short_code.to_string(),
            owner_id,
            created_at,
        );
        links.push(link.clone());
        link
    }

    /// Current counter of the link with this code, deleted or not.
    pub fn count_of(&self, short_code: &str) -> Option<i64> {
        self.links
            .lock()
            .unwrap()
            .iter()
            .find(|l| l.short_code == short_code)
            .map(|l| l.count)
    }

    pub fn get(&self, id: Uuid) -> Option<ShortLink> {
        self.links
            .lock()
            .unwrap()
            .iter()
            .find(|l| l.id == id)
            .cloned()
    }

    pub fn live_count(&self) -> usize {
        self.links
            .lock()
            .unwrap()
            .iter()
            .filter(|l| !l.is_deleted())
            .count()
    }

    fn check_reads(&self) -> Result<(), AppError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::internal("Database error", json!({})));
        }
        Ok(())
    }
}

#[async_trait]
impl ShortLinkRepository for InMemoryShortLinkRepository {
    async fn create(&self, new_link: NewShortLink) -> Result<ShortLink, AppError> {
        let mut links = self.links.lock().unwrap();
        if links
            .iter()
            .any(|l| !l.is_deleted() && l.short_code == new_link.short_code)
        {
            return Err(AppError::conflict(
                "Unique constraint violation",
                json!({ "constraint": "short_links_short_code_live_idx" }),
            ));
        }

        let created_at = Utc::now() + ChronoDuration::milliseconds(links.len() as i64);
        let link = ShortLink::new(
            Uuid::new_v4(),
            new_link.origin,
            new_link.short_code,
            new_link.owner_id,
            created_at,
        );
        links.push(link.clone());
        Ok(link)
    }

    async fn find_by_short_code(&self, short_code: &str) -> Result<Option<ShortLink>, AppError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.check_reads()?;
        Ok(self
            .links
            .lock()
            .unwrap()
            .iter()
            .find(|l| !l.is_deleted() && l.short_code == short_code)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid, owner_id: Uuid) -> Result<Option<ShortLink>, AppError> {
        self.check_reads()?;
        Ok(self
            .links
            .lock()
            .unwrap()
            .iter()
            .find(|l| !l.is_deleted() && l.id == id && l.is_owned_by(owner_id))
            .cloned())
    }

    async fn list_by_owner(&self, owner_id: Uuid, query: ListQuery) -> Result<LinkPage, AppError> {
        self.check_reads()?;
        let mut owned: Vec<ShortLink> = self
            .links
            .lock()
            .unwrap()
            .iter()
            .filter(|l| !l.is_deleted() && l.is_owned_by(owner_id))
            .cloned()
            .collect();

        owned.sort_by_key(|l| l.created_at);
        if query.order == SortOrder::Desc {
            owned.reverse();
        }

        let total = owned.len() as i64;
        let items = owned
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect();

        Ok(LinkPage { items, total })
    }

    async fn update(&self, id: Uuid, patch: ShortLinkPatch) -> Result<ShortLink, AppError> {
        self.pass_write_gate().await;
        let mut links = self.links.lock().unwrap();
        let link = links
            .iter_mut()
            .find(|l| !l.is_deleted() && l.id == id)
            .ok_or_else(|| AppError::not_found("Short URL not found", json!({ "id": id })))?;

        if let Some(origin) = patch.origin {
            link.origin = origin;
        }
        if let Some(short_code) = patch.short_code {
            link.short_code = short_code;
        }
        link.updated_at = Utc::now();

        Ok(link.clone())
    }

    async fn soft_delete(&self, id: Uuid) -> Result<u64, AppError> {
        self.pass_write_gate().await;
        let mut links = self.links.lock().unwrap();
        match links.iter_mut().find(|l| !l.is_deleted() && l.id == id) {
            Some(link) => {
                link.deleted_at = Some(Utc::now());
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn increment_count(&self, short_code: &str, delta: i64) -> Result<u64, AppError> {
        self.increments.fetch_add(1, Ordering::SeqCst);
        if self.fail_increments.load(Ordering::SeqCst) {
            return Err(AppError::internal("Database error", json!({})));
        }

        let mut links = self.links.lock().unwrap();
        match links
            .iter_mut()
            .find(|l| !l.is_deleted() && l.short_code == short_code)
        {
            Some(link) => {
                link.count += delta;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn ping(&self) -> Result<(), AppError> {
        if self.fail_ping.load(Ordering::SeqCst) {
            return Err(AppError::internal("Database error", json!({})));
        }
        Ok(())
    }
}

// ── Cache ───────────────────────────────────────────────────────────────────

/// Map-backed cache. `fail` makes every call error, like an unreachable Redis.
#[derive(Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, String>>,
    pub fail: AtomicBool,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn peek(&self, short_code: &str) -> Option<String> {
        self.entries.lock().unwrap().get(short_code).cloned()
    }

    pub fn insert(&self, short_code: &str, origin: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(short_code.to_string(), origin.to_string());
    }

    fn check(&self) -> CacheResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CacheError::OperationError("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheService for InMemoryCache {
    async fn get(&self, short_code: &str) -> CacheResult<Option<String>> {
        self.check()?;
        Ok(self.peek(short_code))
    }

    async fn set(&self, short_code: &str, origin: &str, _ttl: Option<Duration>) -> CacheResult<()> {
        self.check()?;
        self.insert(short_code, origin);
        Ok(())
    }

    async fn invalidate(&self, short_code: &str) -> CacheResult<()> {
        self.check()?;
        self.entries.lock().unwrap().remove(short_code);
        Ok(())
    }

    async fn health_check(&self) -> bool {
        !self.fail.load(Ordering::SeqCst)
    }
}

// ── Fallback queue ──────────────────────────────────────────────────────────

/// Deque-backed queue. Front is the tail, back is the head, matching the
/// left/right ends of the Redis list.
#[derive(Default)]
pub struct InMemoryFallbackQueue {
    items: Mutex<VecDeque<String>>,
    pub fail: AtomicBool,
    pub pushes: AtomicUsize,
}

impl InMemoryFallbackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries from head to tail (oldest position first).
    pub fn head_to_tail(&self) -> Vec<String> {
        self.items.lock().unwrap().iter().rev().cloned().collect()
    }

    pub fn size(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    fn check(&self) -> QueueResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(QueueError::Unavailable("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl FallbackQueue for InMemoryFallbackQueue {
    async fn push_tail(&self, payload: &str) -> QueueResult<()> {
        self.check()?;
        self.pushes.fetch_add(1, Ordering::SeqCst);
        self.items.lock().unwrap().push_front(payload.to_string());
        Ok(())
    }

    async fn pop_tail(&self) -> QueueResult<Option<String>> {
        self.check()?;
        Ok(self.items.lock().unwrap().pop_front())
    }

    async fn push_head(&self, payload: &str) -> QueueResult<()> {
        self.check()?;
        self.items.lock().unwrap().push_back(payload.to_string());
        Ok(())
    }

    async fn len(&self) -> QueueResult<u64> {
        self.check()?;
        Ok(self.items.lock().unwrap().len() as u64)
    }

    async fn clear(&self) -> QueueResult<bool> {
        self.check()?;
        let mut items = self.items.lock().unwrap();
        let removed = !items.is_empty();
        items.clear();
        Ok(removed)
    }
}

// ── Brokers ─────────────────────────────────────────────────────────────────

/// Records every accepted payload. Fails every publish from the
/// `fail_from`-th call on (1-based) when set.
#[derive(Default)]
pub struct RecordingBroker {
    published: Mutex<Vec<(String, String, Vec<u8>)>>,
    attempts: AtomicUsize,
    fail_from: Option<usize>,
    pub healthy: AtomicBool,
}

impl RecordingBroker {
    pub fn new() -> Self {
        Self {
            healthy: AtomicBool::new(true),
            ..Default::default()
        }
    }

    pub fn failing_from(nth: usize) -> Self {
        Self {
            fail_from: Some(nth),
            healthy: AtomicBool::new(true),
            ..Default::default()
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Payloads in publish order, as UTF-8.
    pub fn payloads(&self) -> Vec<String> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, p)| String::from_utf8_lossy(p).into_owned())
            .collect()
    }

    pub fn topics(&self) -> Vec<(String, String)> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|(t, k, _)| (t.clone(), k.clone()))
            .collect()
    }
}

#[async_trait]
impl EventBroker for RecordingBroker {
    async fn publish(&self, topic: &str, routing_key: &str, payload: &[u8]) -> BrokerResult<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(nth) = self.fail_from
            && attempt >= nth
        {
            return Err(BrokerError::Unavailable("connection reset".into()));
        }

        self.published.lock().unwrap().push((
            topic.to_string(),
            routing_key.to_string(),
            payload.to_vec(),
        ));
        Ok(())
    }

    async fn health_check(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }
}

/// A broker whose publishes never settle.
#[derive(Default)]
pub struct StalledBroker {
    pub attempts: AtomicUsize,
}

#[async_trait]
impl EventBroker for StalledBroker {
    async fn publish(&self, _: &str, _: &str, _: &[u8]) -> BrokerResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        pending::<()>().await;
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

// ── State ───────────────────────────────────────────────────────────────────

pub fn settings() -> ServiceSettings {
    ServiceSettings {
        base_url: BASE_URL.to_string(),
        code_length: 6,
        rehash_rounds: 3,
        analytics_topic: "analytics".to_string(),
        publish_timeout: Duration::from_millis(200),
        cache_enabled: true,
        behind_proxy: false,
    }
}

/// Collaborators behind a test [`AppState`], kept for assertions.
pub struct TestContext {
    pub state: AppState,
    pub repository: Arc<InMemoryShortLinkRepository>,
    pub cache: Arc<InMemoryCache>,
    pub queue: Arc<InMemoryFallbackQueue>,
    pub broker: Option<Arc<RecordingBroker>>,
}

pub fn create_test_context(broker: Option<RecordingBroker>) -> TestContext {
    create_test_context_with(broker, settings())
}

pub fn create_test_context_with(
    broker: Option<RecordingBroker>,
    settings: ServiceSettings,
) -> TestContext {
    let repository = Arc::new(InMemoryShortLinkRepository::new());
    let cache = Arc::new(InMemoryCache::new());
    let queue = Arc::new(InMemoryFallbackQueue::new());
    let broker = broker.map(Arc::new);

    let state = AppState::new(
        repository.clone(),
        cache.clone(),
        queue.clone(),
        broker.clone().map(|b| b as Arc<dyn EventBroker>),
        settings,
    );

    TestContext {
        state,
        repository,
        cache,
        queue,
        broker,
    }
}

/// Polls `check` until it holds or a second passes. Access events are
/// emitted on a spawned task, so their effects land after the response.
pub async fn eventually<F: Fn() -> bool>(check: F) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

// ── HTTP ────────────────────────────────────────────────────────────────────

pub const PEER_ADDR: &str = "127.0.0.1:12345";

/// Inserts a fixed `ConnectInfo` so handlers that read the peer address
/// work without a real socket.
#[derive(Clone)]
pub struct MockConnectInfoLayer;

impl<S> tower::Layer<S> for MockConnectInfoLayer {
    type Service = MockConnectInfoService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MockConnectInfoService { inner }
    }
}

#[derive(Clone)]
pub struct MockConnectInfoService<S> {
    inner: S,
}

impl<S, B> tower::Service<axum::http::Request<B>> for MockConnectInfoService<S>
where
    S: tower::Service<axum::http::Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        let addr: std::net::SocketAddr = PEER_ADDR.parse().unwrap();
        req.extensions_mut().insert(axum::extract::ConnectInfo(addr));
        self.inner.call(req)
    }
}

/// Router with every endpoint, as served in production minus path normalization.
pub fn test_router(state: AppState) -> axum::Router {
    use axum::routing::get;
    use linkrelay::api::handlers::{health_handler, redirect_handler};

    axum::Router::new()
        .route("/r/{short_code}", get(redirect_handler))
        .route("/health", get(health_handler))
        .merge(linkrelay::api::routes::url_routes())
        .layer(MockConnectInfoLayer)
        .with_state(state)
}
