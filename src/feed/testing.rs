//! Scripted provider for tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::normalize::{require, require_array, text_or_empty};
use super::provider::ProviderAdapter;
use super::Aggregator;
use crate::config::{FeedConfig, ProviderKind};
use crate::error::{AdapterError, FeedError};
use crate::models::{Category, FixtureSnapshot, MatchSnapshot, NewsItem};

/// Provider that counts calls and can be switched between answering and
/// failing. Its payload is a flat `{"items": [...]}` list.
pub struct FakeProvider {
    calls: AtomicUsize,
    failing: AtomicBool,
    delay: Duration,
}

impl FakeProvider {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(FakeProvider {
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            delay,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProviderAdapter for FakeProvider {
    fn name(&self) -> &str {
        "Fake"
    }

    async fn fetch(&self, category: Category) -> Result<Value, FeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if self.failing.load(Ordering::SeqCst) {
            return Err(FeedError::Network("connection refused".into()));
        }
        Ok(match category {
            Category::Live => json!({"items": [
                {"id": "a", "local": "Nepal", "visitor": "Oman", "status": "LIVE - 2nd over"}
            ]}),
            Category::Fixtures => json!({"items": [
                {"id": "f", "local": "Nepal", "visitor": "Oman", "date": "2025-10-02"}
            ]}),
            Category::News => json!({"items": [
                {"id": "n", "title": "Nepal qualify", "url": "https://example.com/n"}
            ]}),
        })
    }

    fn normalize_matches(&self, raw: &Value) -> Result<Vec<MatchSnapshot>, AdapterError> {
        require_array(raw, "items")?
            .iter()
            .map(|v| {
                Ok(MatchSnapshot {
                    id: require(v, "id", "item")?,
                    local_team: require(v, "local", "item")?,
                    visitor_team: require(v, "visitor", "item")?,
                    local_score: None,
                    visitor_score: None,
                    status: text_or_empty(v, "status"),
                    is_live: true,
                })
            })
            .collect()
    }

    fn normalize_fixtures(&self, raw: &Value) -> Result<Vec<FixtureSnapshot>, AdapterError> {
        require_array(raw, "items")?
            .iter()
            .map(|v| {
                Ok(FixtureSnapshot {
                    id: require(v, "id", "item")?,
                    local_team: require(v, "local", "item")?,
                    visitor_team: require(v, "visitor", "item")?,
                    scheduled_date: require(v, "date", "item")?,
                    scheduled_time: text_or_empty(v, "time"),
                })
            })
            .collect()
    }

    fn normalize_news(&self, raw: &Value) -> Result<Vec<NewsItem>, AdapterError> {
        require_array(raw, "items")?
            .iter()
            .map(|v| {
                Ok(NewsItem {
                    id: require(v, "id", "item")?,
                    title: require(v, "title", "item")?,
                    excerpt: text_or_empty(v, "excerpt"),
                    url: text_or_empty(v, "url"),
                })
            })
            .collect()
    }
}

/// Live fetching enabled, 500ms timeout.
pub fn live_config() -> FeedConfig {
    FeedConfig {
        provider: ProviderKind::Sportmonks,
        api_key: Some("key".into()),
        use_mock: false,
        fetch_timeout: Duration::from_millis(500),
        ..FeedConfig::default()
    }
}

pub fn aggregator(config: FeedConfig, provider: &Arc<FakeProvider>) -> Aggregator {
    let provider: Arc<dyn ProviderAdapter> = provider.clone();
    Aggregator::new(config, Some(provider))
}
