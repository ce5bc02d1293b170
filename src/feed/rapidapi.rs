use anyhow::Context;
use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::normalize::{display_time, require, require_array, text, text_or_empty};
use super::provider::ProviderAdapter;
use crate::error::{AdapterError, FeedError};
use crate::models::{Category, FixtureSnapshot, MatchSnapshot, NewsItem};

const NEWS_BASE_URL: &str = "https://www.cricbuzz.com/cricket-news";

/// Cricbuzz data through the RapidAPI marketplace.
///
/// The key and host travel in the `X-RapidAPI-Key` / `X-RapidAPI-Host`
/// headers; the host also forms the base URL unless overridden.
pub struct RapidApi {
    http: Client,
    api_key: String,
    api_host: String,
    /// Base URL for overriding in tests
    base_url: String,
}

impl RapidApi {
    pub fn new(api_key: &str, api_host: &str, base_url: Option<&str>) -> anyhow::Result<Self> {
        let http = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        let base_url = match base_url {
            Some(b) => b.trim_end_matches('/').to_string(),
            None => format!("https://{}", api_host),
        };
        Ok(RapidApi {
            http,
            api_key: api_key.to_string(),
            api_host: api_host.to_string(),
            base_url,
        })
    }

    fn endpoint(&self, category: Category) -> String {
        let path = match category {
            Category::Live => "matches/v1/live",
            Category::Fixtures => "matches/v1/upcoming",
            Category::News => "news/v1/index",
        };
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl ProviderAdapter for RapidApi {
    fn name(&self) -> &str {
        "RapidAPI"
    }

    async fn fetch(&self, category: Category) -> Result<Value, FeedError> {
        let url = self.endpoint(category);
        debug!("Fetching {} from {}", category, url);

        let resp = self
            .http
            .get(&url)
            .header("X-RapidAPI-Key", &self.api_key)
            .header("X-RapidAPI-Host", &self.api_host)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(FeedError::Http {
                status: resp.status().as_u16(),
            });
        }
        Ok(resp.json::<Value>().await?)
    }

    fn normalize_matches(&self, raw: &Value) -> Result<Vec<MatchSnapshot>, AdapterError> {
        series_matches(raw)?
            .into_iter()
            .map(|m| {
                let info = &m["matchInfo"];
                let state = text_or_empty(info, "state");
                Ok(MatchSnapshot {
                    id: require(info, "matchId", "matchInfo")?,
                    local_team: require(&info["team1"], "teamName", "team1")?,
                    visitor_team: require(&info["team2"], "teamName", "team2")?,
                    local_score: innings_score(&m["matchScore"]["team1Score"]),
                    visitor_score: innings_score(&m["matchScore"]["team2Score"]),
                    status: text(info, "status").unwrap_or_else(|| state.clone()),
                    is_live: is_in_play(&state),
                })
            })
            .collect()
    }

    fn normalize_fixtures(&self, raw: &Value) -> Result<Vec<FixtureSnapshot>, AdapterError> {
        series_matches(raw)?
            .into_iter()
            .map(|m| {
                let info = &m["matchInfo"];
                let start = require(info, "startDate", "matchInfo")?;
                let (scheduled_date, scheduled_time) = split_epoch_millis(&start);
                Ok(FixtureSnapshot {
                    id: require(info, "matchId", "matchInfo")?,
                    local_team: require(&info["team1"], "teamName", "team1")?,
                    visitor_team: require(&info["team2"], "teamName", "team2")?,
                    scheduled_date,
                    scheduled_time,
                })
            })
            .collect()
    }

    fn normalize_news(&self, raw: &Value) -> Result<Vec<NewsItem>, AdapterError> {
        require_array(raw, "storyList")?
            .iter()
            // Ad slots are interleaved with stories
            .filter_map(|entry| entry.get("story"))
            .map(|story| {
                let id = require(story, "id", "story")?;
                let title = require(story, "hline", "story")?;
                let url = format!("{}/{}/{}", NEWS_BASE_URL, id, slugify(&title));
                Ok(NewsItem {
                    excerpt: text_or_empty(story, "intro"),
                    id,
                    title,
                    url,
                })
            })
            .collect()
    }
}

/// Flatten `typeMatches[].seriesMatches[].seriesAdWrapper.matches[]`,
/// skipping the ad entries that have no `seriesAdWrapper`.
fn series_matches(raw: &Value) -> Result<Vec<&Value>, AdapterError> {
    let mut out = Vec::new();
    for type_match in require_array(raw, "typeMatches")? {
        let Some(series) = type_match["seriesMatches"].as_array() else {
            continue;
        };
        for s in series {
            if let Some(matches) = s["seriesAdWrapper"]["matches"].as_array() {
                out.extend(matches.iter());
            }
        }
    }
    Ok(out)
}

/// `{"inngs1": {"runs": 45, "wickets": 1, "overs": 3.4}, "inngs2": ...}`
/// → "45/1 (3.4) & ..."
fn innings_score(team_score: &Value) -> Option<String> {
    let innings: Vec<String> = ["inngs1", "inngs2"]
        .iter()
        .filter_map(|key| {
            let inn = team_score.get(*key)?;
            let runs = text(inn, "runs")?;
            let wickets = text(inn, "wickets")
                .map(|w| format!("/{}", w))
                .unwrap_or_default();
            let overs = text(inn, "overs")
                .map(|o| format!(" ({})", o))
                .unwrap_or_default();
            Some(format!("{}{}{}", runs, wickets, overs))
        })
        .collect();
    if innings.is_empty() {
        None
    } else {
        Some(innings.join(" & "))
    }
}

fn is_in_play(state: &str) -> bool {
    !matches!(
        state.to_lowercase().as_str(),
        "" | "preview" | "upcoming" | "complete" | "abandon" | "cancelled"
    )
}

/// Cricbuzz start dates are epoch milliseconds as strings.
fn split_epoch_millis(start: &str) -> (String, String) {
    match start.parse::<i64>().ok().and_then(DateTime::from_timestamp_millis) {
        Some(dt) => (
            dt.date_naive().format("%Y-%m-%d").to_string(),
            display_time(dt.time()),
        ),
        None => (start.to_string(), String::new()),
    }
}

/// "India name 15-man squad!" → "india-name-15-man-squad"
fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
