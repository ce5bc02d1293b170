use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::cache::FallbackCache;
use super::provider::{normalize, Normalize, ProviderAdapter};
use crate::config::FeedConfig;
use crate::error::FeedError;
use crate::models::{AnySnapshot, Category, CategorySnapshot, FeedItem, Source};

type Attempt = Shared<BoxFuture<'static, AnySnapshot>>;

/// Where a category is in its refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    /// Never refreshed
    Idle,
    Fetching,
    /// Idle again after publishing a snapshot from `Source`
    Published(Source),
}

/// Fetches, normalizes, caches and publishes the three feeds.
///
/// `refresh` never fails: a fetch error, timeout, malformed payload or
/// missing key falls back to the cached snapshot, then to mock data.
/// Concurrent refreshes of one category share a single fetch.
#[derive(Clone)]
pub struct Aggregator {
    inner: Arc<Inner>,
}

struct Inner {
    config: FeedConfig,
    provider: Option<Arc<dyn ProviderAdapter>>,
    cache: FallbackCache,
    inflight: Mutex<HashMap<Category, Attempt>>,
    states: Mutex<HashMap<Category, FetchState>>,
    published: HashMap<Category, watch::Sender<Option<AnySnapshot>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Aggregator {
    pub fn new(config: FeedConfig, provider: Option<Arc<dyn ProviderAdapter>>) -> Self {
        if let Err(e) = config.check() {
            warn!("{}; serving cached or mock data only", e);
        }
        let published = Category::ALL
            .iter()
            .map(|c| (*c, watch::channel(None).0))
            .collect();
        Aggregator {
            inner: Arc::new(Inner {
                config,
                provider,
                cache: FallbackCache::new(),
                inflight: Mutex::new(HashMap::new()),
                states: Mutex::new(HashMap::new()),
                published,
            }),
        }
    }

    #[cfg(test)]
    pub fn cache(&self) -> &FallbackCache {
        &self.inner.cache
    }

    pub fn state(&self, category: Category) -> FetchState {
        lock(&self.inner.states)
            .get(&category)
            .copied()
            .unwrap_or(FetchState::Idle)
    }

    /// Receiver that sees every snapshot published for `category`.
    pub fn subscribe(&self, category: Category) -> watch::Receiver<Option<AnySnapshot>> {
        self.sender(category).subscribe()
    }

    /// Most recently published snapshot, if any.
    pub fn latest<T: FeedItem>(&self) -> Option<Arc<CategorySnapshot<T>>> {
        self.sender(T::CATEGORY)
            .borrow()
            .as_ref()
            .and_then(|any| T::from_any(any))
    }

    /// Produce a fresh snapshot for `T::CATEGORY`.
    ///
    /// Exactly one fetch attempt is made per cycle. If a cycle for this
    /// category is already running, this call waits for its result instead
    /// of starting another.
    pub async fn refresh<T: Normalize>(&self) -> Arc<CategorySnapshot<T>> {
        let attempt = {
            let mut inflight = lock(&self.inner.inflight);
            match inflight.get(&T::CATEGORY) {
                Some(existing) => {
                    debug!("Joining in-flight {} refresh", T::CATEGORY);
                    existing.clone()
                }
                None => {
                    // The cycle runs on its own task so it completes and
                    // publishes even if every waiting caller is dropped.
                    let this = self.clone();
                    let cycle = tokio::spawn(async move { this.run_cycle::<T>().await });
                    let this = self.clone();
                    let attempt = async move {
                        match cycle.await {
                            Ok(any) => any,
                            Err(e) => {
                                warn!("{} refresh task failed: {}", T::CATEGORY, e);
                                lock(&this.inner.inflight).remove(&T::CATEGORY);
                                T::into_any(Arc::new(CategorySnapshot::<T>::mock()))
                            }
                        }
                    }
                    .boxed()
                    .shared();
                    inflight.insert(T::CATEGORY, attempt.clone());
                    attempt
                }
            }
        };

        let any = attempt.await;
        T::from_any(&any).unwrap_or_else(|| Arc::new(CategorySnapshot::mock()))
    }

    async fn run_cycle<T: Normalize>(&self) -> AnySnapshot {
        let category = T::CATEGORY;
        self.set_state(category, FetchState::Fetching);

        let snapshot = if self.inner.config.use_mock {
            Arc::new(CategorySnapshot::<T>::mock())
        } else {
            match self.fetch_live::<T>().await {
                Ok(items) => {
                    let snap = Arc::new(CategorySnapshot::new(items, Source::Live));
                    self.inner.cache.put(T::into_any(Arc::clone(&snap))).await;
                    info!(
                        "Refreshed {} from provider ({} items)",
                        category,
                        snap.items.len()
                    );
                    snap
                }
                Err(FeedError::Config(msg)) => {
                    debug!("{} refresh skipped: {}", category, msg);
                    self.fallback::<T>().await
                }
                Err(e) => {
                    let provider = self.inner.provider.as_ref().map_or("none", |p| p.name());
                    warn!("{} refresh from {} failed: {}", category, provider, e);
                    self.fallback::<T>().await
                }
            }
        };

        let any = T::into_any(Arc::clone(&snapshot));
        self.publish(any.clone());
        self.set_state(category, FetchState::Published(snapshot.source));
        lock(&self.inner.inflight).remove(&category);
        any
    }

    async fn fetch_live<T: Normalize>(&self) -> Result<Vec<T>, FeedError> {
        self.inner.config.check()?;
        let provider = self
            .inner
            .provider
            .as_ref()
            .ok_or_else(|| FeedError::Config("no provider configured".to_string()))?;

        let timeout = self.inner.config.fetch_timeout;
        let raw = tokio::time::timeout(timeout, provider.fetch(T::CATEGORY))
            .await
            .map_err(|_| FeedError::Timeout(timeout))??;

        Ok(normalize::<T>(provider.as_ref(), &raw)?)
    }

    /// Stale data beats no data; mock data beats nothing.
    async fn fallback<T: FeedItem>(&self) -> Arc<CategorySnapshot<T>> {
        match self.inner.cache.get_typed::<T>().await {
            Some(cached) => Arc::new(cached.retagged(Source::Cache)),
            None => Arc::new(CategorySnapshot::mock()),
        }
    }

    fn publish(&self, snapshot: AnySnapshot) {
        self.sender(snapshot.category()).send_if_modified(|current| {
            let newer = current
                .as_ref()
                .map_or(true, |c| c.fetched_at() <= snapshot.fetched_at());
            if newer {
                *current = Some(snapshot);
            }
            newer
        });
    }

    fn set_state(&self, category: Category, state: FetchState) {
        debug!("{} -> {:?}", category, state);
        lock(&self.inner.states).insert(category, state);
    }

    fn sender(&self, category: Category) -> &watch::Sender<Option<AnySnapshot>> {
        // Every category gets a channel in `new`
        &self.inner.published[&category]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::sportmonks::SportMonks;
    use crate::feed::testing::{aggregator, live_config, FakeProvider};
    use crate::models::{FixtureSnapshot, MatchSnapshot, NewsItem};
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn test_use_mock_never_fetches() {
        let provider = FakeProvider::new(Duration::ZERO);
        let agg = aggregator(FeedConfig::default(), &provider);

        let first = agg.refresh::<MatchSnapshot>().await;
        let second = agg.refresh::<MatchSnapshot>().await;
        assert_eq!(first.source, Source::Mock);
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.items, second.items);
        assert_eq!(first.items, MatchSnapshot::mock());
        assert_eq!(provider.calls(), 0);
        assert_eq!(agg.cache().len().await, 0);
    }

    #[tokio::test]
    async fn test_cold_cache_failure_serves_mock() {
        let provider = FakeProvider::new(Duration::ZERO);
        provider.set_failing(true);
        let agg = aggregator(live_config(), &provider);

        let snap = agg.refresh::<NewsItem>().await;
        assert_eq!(snap.source, Source::Mock);
        assert_eq!(snap.items, NewsItem::mock());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_live_then_failure_serves_cache() {
        let provider = FakeProvider::new(Duration::ZERO);
        let agg = aggregator(live_config(), &provider);

        let live = agg.refresh::<MatchSnapshot>().await;
        assert_eq!(live.source, Source::Live);
        assert_eq!(live.items[0].local_team, "Nepal");
        let cached = agg.cache().get(Category::Live).await.unwrap();
        assert_eq!(cached.source(), Source::Live);

        provider.set_failing(true);
        let stale = agg.refresh::<MatchSnapshot>().await;
        assert_eq!(stale.source, Source::Cache);
        assert_eq!(stale.items, live.items);
        assert_eq!(stale.fetched_at, live.fetched_at);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_refreshes_share_one_fetch() {
        let provider = FakeProvider::new(Duration::from_millis(100));
        let agg = aggregator(live_config(), &provider);

        let (a, b) = tokio::join!(agg.refresh::<NewsItem>(), agg.refresh::<NewsItem>());
        assert_eq!(provider.calls(), 1);
        assert!(Arc::ptr_eq(&a, &b));

        // A later refresh starts a new cycle
        agg.refresh::<NewsItem>().await;
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_categories_do_not_coalesce_with_each_other() {
        let provider = FakeProvider::new(Duration::from_millis(50));
        let agg = aggregator(live_config(), &provider);

        let (live, news) = tokio::join!(agg.refresh::<MatchSnapshot>(), agg.refresh::<NewsItem>());
        assert_eq!(live.category, Category::Live);
        assert_eq!(news.category, Category::News);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let provider = FakeProvider::new(Duration::from_millis(500));
        let config = FeedConfig {
            fetch_timeout: Duration::from_millis(50),
            ..live_config()
        };
        let agg = aggregator(config, &provider);

        let snap = agg.refresh::<FixtureSnapshot>().await;
        assert_eq!(snap.source, Source::Mock);
        assert_eq!(agg.state(Category::Fixtures), FetchState::Published(Source::Mock));
    }

    #[tokio::test]
    async fn test_missing_key_skips_fetch() {
        let provider = FakeProvider::new(Duration::ZERO);
        let config = FeedConfig {
            api_key: None,
            ..live_config()
        };
        let agg = aggregator(config, &provider);

        let snap = agg.refresh::<MatchSnapshot>().await;
        assert_eq!(snap.source, Source::Mock);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_no_provider_falls_back() {
        let agg = Aggregator::new(live_config(), None);
        let snap = agg.refresh::<NewsItem>().await;
        assert_eq!(snap.source, Source::Mock);
    }

    #[tokio::test]
    async fn test_state_machine() {
        let provider = FakeProvider::new(Duration::from_millis(100));
        let agg = aggregator(live_config(), &provider);
        assert_eq!(agg.state(Category::News), FetchState::Idle);

        let handle = {
            let agg = agg.clone();
            tokio::spawn(async move { agg.refresh::<NewsItem>().await })
        };
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(agg.state(Category::News), FetchState::Fetching);

        handle.await.unwrap();
        assert_eq!(agg.state(Category::News), FetchState::Published(Source::Live));
    }

    #[tokio::test]
    async fn test_dropped_caller_does_not_strand_cycle() {
        let provider = FakeProvider::new(Duration::from_millis(100));
        let agg = aggregator(live_config(), &provider);

        let cancelled =
            tokio::time::timeout(Duration::from_millis(30), agg.refresh::<NewsItem>()).await;
        assert!(cancelled.is_err());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(agg.state(Category::News), FetchState::Published(Source::Live));
        assert_eq!(agg.latest::<NewsItem>().unwrap().source, Source::Live);
        assert_eq!(provider.calls(), 1);

        // The finished cycle left nothing behind to join
        agg.refresh::<NewsItem>().await;
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_older_snapshot_is_not_published() {
        let agg = Aggregator::new(FeedConfig::default(), None);
        let mut rx = agg.subscribe(Category::News);

        let newer = Arc::new(CategorySnapshot::new(NewsItem::mock(), Source::Live));
        let mut older = CategorySnapshot::<NewsItem>::new(vec![], Source::Live);
        older.fetched_at = newer.fetched_at - chrono::Duration::seconds(5);

        agg.publish(NewsItem::into_any(Arc::clone(&newer)));
        rx.borrow_and_update();
        agg.publish(NewsItem::into_any(Arc::new(older)));

        assert!(!rx.has_changed().unwrap());
        let latest = agg.latest::<NewsItem>().unwrap();
        assert!(Arc::ptr_eq(&latest, &newer));
        assert_eq!(latest.items.len(), 2);
    }

    #[tokio::test]
    async fn test_subscribers_see_every_outcome() {
        let provider = FakeProvider::new(Duration::ZERO);
        let agg = aggregator(live_config(), &provider);
        let mut rx = agg.subscribe(Category::Live);
        assert!(rx.borrow().is_none());

        agg.refresh::<MatchSnapshot>().await;
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_ref().unwrap().source(), Source::Live);

        provider.set_failing(true);
        agg.refresh::<MatchSnapshot>().await;
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().as_ref().unwrap().source(), Source::Cache);
        assert_eq!(agg.latest::<MatchSnapshot>().unwrap().source, Source::Cache);
    }

    #[tokio::test]
    async fn test_items_are_well_formed_after_normalization() {
        let provider = FakeProvider::new(Duration::ZERO);
        let agg = aggregator(live_config(), &provider);
        let news = agg.refresh::<NewsItem>().await;
        assert!(news.items.iter().all(|n| !n.title.is_empty()));
        assert_eq!(news.items[0].url, "https://example.com/n");
    }

    async fn serve(app: axum::Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/api", addr)
    }

    #[tokio::test]
    async fn test_malformed_provider_json_serves_mock_fixtures() {
        use axum::{http::header, routing::get, Router};

        let app = Router::new().route(
            "/api/fixtures",
            get(|| async { ([(header::CONTENT_TYPE, "application/json")], "{\"data\": [oops") }),
        );
        let base = serve(app).await;
        let provider: Arc<dyn ProviderAdapter> =
            Arc::new(SportMonks::new("key", Some(&base)).unwrap());
        let agg = Aggregator::new(live_config(), Some(provider));

        let snap = agg.refresh::<FixtureSnapshot>().await;
        assert_eq!(snap.source, Source::Mock);
        assert_eq!(snap.items, FixtureSnapshot::mock());
        assert_eq!(snap.items.len(), 2);
    }

    #[tokio::test]
    async fn test_real_adapter_round_trip_over_http() {
        use axum::{routing::get, Json, Router};

        let app = Router::new().route(
            "/api/fixtures/now",
            get(|| async {
                Json(json!({"data": [{
                    "id": 7,
                    "status": "2nd Innings",
                    "live": true,
                    "localteam": {"name": "West Indies"},
                    "visitorteam": {"name": "Ireland"}
                }]}))
            }),
        );
        let base = serve(app).await;
        let provider: Arc<dyn ProviderAdapter> =
            Arc::new(SportMonks::new("key", Some(&base)).unwrap());
        let agg = Aggregator::new(live_config(), Some(provider));

        let snap = agg.refresh::<MatchSnapshot>().await;
        assert_eq!(snap.source, Source::Live);
        assert_eq!(snap.items[0].local_team, "West Indies");
    }

    #[tokio::test]
    async fn test_http_error_status_falls_back() {
        use axum::{http::StatusCode, routing::get, Router};

        let app = Router::new().route(
            "/api/fixtures/now",
            get(|| async { (StatusCode::UNAUTHORIZED, "bad token") }),
        );
        let base = serve(app).await;
        let provider: Arc<dyn ProviderAdapter> =
            Arc::new(SportMonks::new("key", Some(&base)).unwrap());
        let agg = Aggregator::new(live_config(), Some(provider));

        assert_eq!(agg.refresh::<MatchSnapshot>().await.source, Source::Mock);
    }
}
