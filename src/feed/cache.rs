//! Last-known-good snapshot per category.
//!
//! The aggregator writes a snapshot here after every successful live fetch
//! and reads it back when a later fetch fails, so the page shows stale data
//! rather than mock data once the provider has answered at least once.
//!
//! One slot per category, no eviction. Writes replace the whole `Arc`, so a
//! reader never sees a half-written snapshot.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::models::{AnySnapshot, Category, CategorySnapshot, FeedItem};

/// Thread-safe, in-memory fallback cache.
#[derive(Clone, Default)]
pub struct FallbackCache {
    inner: Arc<RwLock<HashMap<Category, AnySnapshot>>>,
}

impl FallbackCache {
    pub fn new() -> Self {
        FallbackCache::default()
    }

    /// `None` on a cold cache.
    pub async fn get(&self, category: Category) -> Option<AnySnapshot> {
        self.inner.read().await.get(&category).cloned()
    }

    pub async fn get_typed<T: FeedItem>(&self) -> Option<Arc<CategorySnapshot<T>>> {
        self.get(T::CATEGORY).await.and_then(|any| T::from_any(&any))
    }

    /// Store `snapshot` in its category's slot.
    ///
    /// A snapshot older than the one already stored is ignored; returns
    /// whether the slot was replaced.
    pub async fn put(&self, snapshot: AnySnapshot) -> bool {
        let category = snapshot.category();
        let mut inner = self.inner.write().await;
        if let Some(current) = inner.get(&category) {
            if current.fetched_at() > snapshot.fetched_at() {
                debug!(
                    "FallbackCache: ignoring stale {} snapshot from {}",
                    category,
                    snapshot.fetched_at()
                );
                return false;
            }
        }
        debug!("FallbackCache: stored {} snapshot", category);
        inner.insert(category, snapshot);
        true
    }

    /// Number of populated categories.
    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}
