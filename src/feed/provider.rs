use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::{FeedConfig, ProviderKind};
use crate::error::{AdapterError, FeedError};
use crate::models::{Category, FeedItem, FixtureSnapshot, MatchSnapshot, NewsItem};

use super::normalize::{finish_fixtures, finish_matches, finish_news};
use super::rapidapi::RapidApi;
use super::sportmonks::SportMonks;

/// Trait that every score provider must implement.
///
/// The adapter owns the request shape (URL, headers, where the key goes) and
/// the translation of its response into the canonical models. The
/// normalizers must substitute empty strings for missing optional fields and
/// only fail when a required field is absent.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// One HTTP request for `category`, returning the raw JSON body.
    async fn fetch(&self, category: Category) -> Result<Value, FeedError>;

    fn normalize_matches(&self, raw: &Value) -> Result<Vec<MatchSnapshot>, AdapterError>;

    fn normalize_fixtures(&self, raw: &Value) -> Result<Vec<FixtureSnapshot>, AdapterError>;

    fn normalize_news(&self, raw: &Value) -> Result<Vec<NewsItem>, AdapterError>;
}

/// Routes a raw response to the normalizer for the item type's category.
pub trait Normalize: FeedItem {
    fn normalize(adapter: &dyn ProviderAdapter, raw: &Value) -> Result<Vec<Self>, AdapterError>;
}

impl Normalize for MatchSnapshot {
    fn normalize(adapter: &dyn ProviderAdapter, raw: &Value) -> Result<Vec<Self>, AdapterError> {
        adapter.normalize_matches(raw).map(finish_matches)
    }
}

impl Normalize for FixtureSnapshot {
    fn normalize(adapter: &dyn ProviderAdapter, raw: &Value) -> Result<Vec<Self>, AdapterError> {
        adapter.normalize_fixtures(raw).and_then(finish_fixtures)
    }
}

impl Normalize for NewsItem {
    fn normalize(adapter: &dyn ProviderAdapter, raw: &Value) -> Result<Vec<Self>, AdapterError> {
        adapter.normalize_news(raw).map(finish_news)
    }
}

/// Normalize `raw` into the canonical items of `T::CATEGORY`.
pub fn normalize<T: Normalize>(
    adapter: &dyn ProviderAdapter,
    raw: &Value,
) -> Result<Vec<T>, AdapterError> {
    T::normalize(adapter, raw)
}

/// Build the adapter selected in the config, if any.
///
/// Returns `Ok(None)` for [`ProviderKind::None`].
pub fn build_provider(config: &FeedConfig) -> anyhow::Result<Option<Arc<dyn ProviderAdapter>>> {
    let api_key = config.api_key.clone().unwrap_or_default();
    let provider: Option<Arc<dyn ProviderAdapter>> = match config.provider {
        ProviderKind::None => None,
        ProviderKind::Sportmonks => Some(Arc::new(SportMonks::new(&api_key, None)?)),
        ProviderKind::Rapidapi => Some(Arc::new(RapidApi::new(
            &api_key,
            &config.api_host,
            None,
        )?)),
    };
    Ok(provider)
}
