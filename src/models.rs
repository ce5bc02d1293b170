use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The three independent data feeds shown on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Live,
    Fixtures,
    News,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Live, Category::Fixtures, Category::News];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::Live => "live",
            Category::Fixtures => "fixtures",
            Category::News => "news",
        };
        f.write_str(s)
    }
}

/// Where the items of a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Fresh provider response
    Live,
    /// Last-known-good provider response
    Cache,
    /// Static built-in data
    Mock,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Source::Live => "live",
            Source::Cache => "cache",
            Source::Mock => "mock",
        };
        f.write_str(s)
    }
}

/// A match currently in play (or just reported by the live endpoint).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    /// Provider match ID, unique within one batch
    pub id: String,
    pub local_team: String,
    pub visitor_team: String,
    /// e.g. "45/1 (3.4)"
    pub local_score: Option<String>,
    pub visitor_score: Option<String>,
    /// Never empty, e.g. "LIVE - 3rd over"
    pub status: String,
    pub is_live: bool,
}

/// An upcoming match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureSnapshot {
    pub id: String,
    pub local_team: String,
    pub visitor_team: String,
    /// Calendar date, `YYYY-MM-DD`
    pub scheduled_date: String,
    /// Display time, e.g. "3:30 PM"
    pub scheduled_time: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    pub id: String,
    pub title: String,
    pub excerpt: String,
    /// Absolute http(s) URL or the `#` placeholder
    pub url: String,
}

/// An immutable, timestamped batch of normalized items for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySnapshot<T> {
    pub category: Category,
    pub items: Vec<T>,
    pub fetched_at: DateTime<Utc>,
    pub source: Source,
}

impl<T: FeedItem> CategorySnapshot<T> {
    pub fn new(items: Vec<T>, source: Source) -> Self {
        CategorySnapshot {
            category: T::CATEGORY,
            items,
            fetched_at: Utc::now(),
            source,
        }
    }

    /// The static mock snapshot for this category.
    pub fn mock() -> Self {
        Self::new(T::mock(), Source::Mock)
    }

    /// Same items and timestamp, different source tag.
    pub fn retagged(&self, source: Source) -> Self {
        CategorySnapshot {
            source,
            ..self.clone()
        }
    }
}

/// A snapshot of any category, used where the three feeds share storage
/// (cache slots, in-flight requests, publish channels).
#[derive(Debug, Clone)]
pub enum AnySnapshot {
    Live(Arc<CategorySnapshot<MatchSnapshot>>),
    Fixtures(Arc<CategorySnapshot<FixtureSnapshot>>),
    News(Arc<CategorySnapshot<NewsItem>>),
}

impl AnySnapshot {
    pub fn category(&self) -> Category {
        match self {
            AnySnapshot::Live(_) => Category::Live,
            AnySnapshot::Fixtures(_) => Category::Fixtures,
            AnySnapshot::News(_) => Category::News,
        }
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        match self {
            AnySnapshot::Live(s) => s.fetched_at,
            AnySnapshot::Fixtures(s) => s.fetched_at,
            AnySnapshot::News(s) => s.fetched_at,
        }
    }

    pub fn source(&self) -> Source {
        match self {
            AnySnapshot::Live(s) => s.source,
            AnySnapshot::Fixtures(s) => s.source,
            AnySnapshot::News(s) => s.source,
        }
    }
}

/// Ties an item type to its category and its built-in mock data.
pub trait FeedItem: Clone + fmt::Debug + Serialize + Send + Sync + 'static {
    const CATEGORY: Category;

    fn id(&self) -> &str;

    fn mock() -> Vec<Self>;

    fn into_any(snapshot: Arc<CategorySnapshot<Self>>) -> AnySnapshot;

    fn from_any(any: &AnySnapshot) -> Option<Arc<CategorySnapshot<Self>>>;
}

impl FeedItem for MatchSnapshot {
    const CATEGORY: Category = Category::Live;

    fn id(&self) -> &str {
        &self.id
    }

    fn mock() -> Vec<Self> {
        crate::feed::mock::live_matches()
    }

    fn into_any(snapshot: Arc<CategorySnapshot<Self>>) -> AnySnapshot {
        AnySnapshot::Live(snapshot)
    }

    fn from_any(any: &AnySnapshot) -> Option<Arc<CategorySnapshot<Self>>> {
        match any {
            AnySnapshot::Live(s) => Some(Arc::clone(s)),
            _ => None,
        }
    }
}

impl FeedItem for FixtureSnapshot {
    const CATEGORY: Category = Category::Fixtures;

    fn id(&self) -> &str {
        &self.id
    }

    fn mock() -> Vec<Self> {
        crate::feed::mock::fixtures()
    }

    fn into_any(snapshot: Arc<CategorySnapshot<Self>>) -> AnySnapshot {
        AnySnapshot::Fixtures(snapshot)
    }

    fn from_any(any: &AnySnapshot) -> Option<Arc<CategorySnapshot<Self>>> {
        match any {
            AnySnapshot::Fixtures(s) => Some(Arc::clone(s)),
            _ => None,
        }
    }
}

impl FeedItem for NewsItem {
    const CATEGORY: Category = Category::News;

    fn id(&self) -> &str {
        &self.id
    }

    fn mock() -> Vec<Self> {
        crate::feed::mock::news()
    }

    fn into_any(snapshot: Arc<CategorySnapshot<Self>>) -> AnySnapshot {
        AnySnapshot::News(snapshot)
    }

    fn from_any(any: &AnySnapshot) -> Option<Arc<CategorySnapshot<Self>>> {
        match any {
            AnySnapshot::News(s) => Some(Arc::clone(s)),
            _ => None,
        }
    }
}
