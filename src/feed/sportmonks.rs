use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::normalize::{display_time, require, require_array, text, text_or_empty};
use super::provider::ProviderAdapter;
use crate::error::{AdapterError, FeedError};
use crate::models::{Category, FixtureSnapshot, MatchSnapshot, NewsItem};

const DEFAULT_BASE_URL: &str = "https://cricket.sportmonks.com/api/v2.0";
const INCLUDES: &str = "localteam,visitorteam,runs";

/// Score provider backed by the SportMonks Cricket API v2.
/// Docs: <https://docs.sportmonks.com/cricket>
///
/// The token travels in the `api_token` query parameter. SportMonks has no
/// news endpoint.
pub struct SportMonks {
    http: Client,
    api_key: String,
    /// Base URL for overriding in tests
    base_url: String,
}

impl SportMonks {
    pub fn new(api_key: &str, base_url: Option<&str>) -> anyhow::Result<Self> {
        let http = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(SportMonks {
            http,
            api_key: api_key.to_string(),
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
        })
    }

    fn endpoint(&self, category: Category) -> Result<Url, FeedError> {
        let (path, extra): (&str, &[(&str, &str)]) = match category {
            Category::Live => ("fixtures/now", &[]),
            Category::Fixtures => (
                "fixtures",
                &[("filter[status]", "NS"), ("sort", "starting_at")],
            ),
            Category::News => {
                return Err(FeedError::Unsupported {
                    provider: "SportMonks",
                    category,
                })
            }
        };
        let mut url = Url::parse(&format!("{}/{}", self.base_url, path))
            .map_err(|e| FeedError::Config(format!("bad SportMonks base URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("api_token", &self.api_key)
            .append_pair("include", INCLUDES)
            .extend_pairs(extra.iter().copied());
        Ok(url)
    }
}

#[async_trait]
impl ProviderAdapter for SportMonks {
    fn name(&self) -> &str {
        "SportMonks"
    }

    async fn fetch(&self, category: Category) -> Result<Value, FeedError> {
        let url = self.endpoint(category)?;
        debug!("Fetching {} from SportMonks {}", category, url.path());

        let resp = self.http.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(FeedError::Http {
                status: resp.status().as_u16(),
            });
        }
        Ok(resp.json::<Value>().await?)
    }

    fn normalize_matches(&self, raw: &Value) -> Result<Vec<MatchSnapshot>, AdapterError> {
        require_array(raw, "data")?
            .iter()
            .map(|fx| {
                let id = require(fx, "id", "fixture")?;
                let local_team = team_name(fx, "localteam")?;
                let visitor_team = team_name(fx, "visitorteam")?;
                let status = text_or_empty(fx, "status");
                let is_live = fx["live"]
                    .as_bool()
                    .unwrap_or_else(|| is_in_play(&status));
                Ok(MatchSnapshot {
                    id,
                    local_score: team_score(fx, "localteam_id"),
                    visitor_score: team_score(fx, "visitorteam_id"),
                    local_team,
                    visitor_team,
                    status,
                    is_live,
                })
            })
            .collect()
    }

    fn normalize_fixtures(&self, raw: &Value) -> Result<Vec<FixtureSnapshot>, AdapterError> {
        require_array(raw, "data")?
            .iter()
            .map(|fx| {
                let id = require(fx, "id", "fixture")?;
                let starting_at = require(fx, "starting_at", "fixture")?;
                let (scheduled_date, scheduled_time) = split_start(&starting_at);
                Ok(FixtureSnapshot {
                    local_team: team_name(fx, "localteam")?,
                    visitor_team: team_name(fx, "visitorteam")?,
                    id,
                    scheduled_date,
                    scheduled_time,
                })
            })
            .collect()
    }

    fn normalize_news(&self, _raw: &Value) -> Result<Vec<NewsItem>, AdapterError> {
        Err(AdapterError::MalformedPayload(
            "SportMonks does not provide news".to_string(),
        ))
    }
}

/// Included teams arrive either inline or wrapped in `{"data": {...}}`.
fn team_name(fx: &Value, key: &str) -> Result<String, AdapterError> {
    let team = &fx[key];
    let team = if team.get("data").is_some() { &team["data"] } else { team };
    require(team, "name", key)
}

/// All innings of one team, e.g. "45/1 (3.4)" or "210/10 (55.2) & 98/3 (30)".
fn team_score(fx: &Value, team_id_key: &str) -> Option<String> {
    let team_id = text(fx, team_id_key)?;
    let runs = fx["runs"].as_array()?;
    let innings: Vec<String> = runs
        .iter()
        .filter(|r| text(r, "team_id").as_deref() == Some(team_id.as_str()))
        .map(|r| {
            format!(
                "{}/{} ({})",
                text(r, "score").unwrap_or_else(|| "0".to_string()),
                text(r, "wickets").unwrap_or_else(|| "0".to_string()),
                text(r, "overs").unwrap_or_else(|| "0".to_string()),
            )
        })
        .collect();
    if innings.is_empty() {
        None
    } else {
        Some(innings.join(" & "))
    }
}

fn is_in_play(status: &str) -> bool {
    !matches!(
        status.to_lowercase().as_str(),
        "" | "ns" | "finished" | "cancl." | "postp." | "aban." | "delayed"
    )
}

/// Split a start timestamp into (`YYYY-MM-DD`, display time). An unparseable
/// value is passed through as the date so fixture validation can reject it.
fn split_start(starting_at: &str) -> (String, String) {
    if let Ok(dt) = DateTime::parse_from_rfc3339(starting_at) {
        return (
            dt.date_naive().format("%Y-%m-%d").to_string(),
            display_time(dt.time()),
        );
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(starting_at, "%Y-%m-%d %H:%M:%S") {
        return (
            dt.date().format("%Y-%m-%d").to_string(),
            display_time(dt.time()),
        );
    }
    (starting_at.to_string(), String::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::provider::normalize;
    use serde_json::json;

    fn adapter() -> SportMonks {
        SportMonks::new("token", Some("http://localhost:1/api")).unwrap()
    }

    fn live_payload() -> Value {
        json!({
            "data": [{
                "id": 3001,
                "localteam_id": 36,
                "visitorteam_id": 39,
                "live": true,
                "status": "1st Innings",
                "starting_at": "2025-09-01T10:00:00.000000Z",
                "localteam": {"id": 36, "name": "India"},
                "visitorteam": {"data": {"id": 39, "name": "Australia"}},
                "runs": [{"team_id": 36, "inning": 1, "score": 45, "wickets": 1, "overs": 3.4}]
            }]
        })
    }

    #[test]
    fn test_normalize_live_fixture() {
        let games: Vec<MatchSnapshot> = normalize(&adapter(), &live_payload()).unwrap();
        assert_eq!(games.len(), 1);
        let g = &games[0];
        assert_eq!(g.id, "3001");
        assert_eq!(g.local_team, "India");
        assert_eq!(g.visitor_team, "Australia");
        assert_eq!(g.local_score.as_deref(), Some("45/1 (3.4)"));
        assert_eq!(g.visitor_score, None);
        assert_eq!(g.status, "1st Innings");
        assert!(g.is_live);
    }

    #[test]
    fn test_missing_status_is_filled() {
        let raw = json!({"data": [{
            "id": 1,
            "live": false,
            "localteam": {"name": "India"},
            "visitorteam": {"name": "Australia"}
        }]});
        let games: Vec<MatchSnapshot> = normalize(&adapter(), &raw).unwrap();
        assert_eq!(games[0].status, "Not started");
        assert!(!games[0].is_live);
    }

    #[test]
    fn test_missing_team_is_malformed() {
        let raw = json!({"data": [{"id": 1, "localteam": {"name": "India"}}]});
        let res: Result<Vec<MatchSnapshot>, _> = normalize(&adapter(), &raw);
        assert!(matches!(res, Err(AdapterError::MalformedPayload(_))));
    }

    #[test]
    fn test_missing_data_array_is_malformed() {
        let res: Result<Vec<MatchSnapshot>, _> =
            normalize(&adapter(), &json!({"message": "Unauthenticated."}));
        assert!(res.is_err());
    }

    #[test]
    fn test_multiple_innings_joined() {
        let fx = json!({
            "localteam_id": 1,
            "runs": [
                {"team_id": 1, "score": 210, "wickets": 10, "overs": 55.2},
                {"team_id": 2, "score": 150, "wickets": 10, "overs": 40},
                {"team_id": 1, "score": 98, "wickets": 3, "overs": 30}
            ]
        });
        assert_eq!(
            team_score(&fx, "localteam_id").as_deref(),
            Some("210/10 (55.2) & 98/3 (30)")
        );
    }

    #[test]
    fn test_normalize_fixtures_splits_start() {
        let raw = json!({"data": [{
            "id": 11,
            "starting_at": "2025-09-01T15:30:00.000000Z",
            "localteam": {"name": "India"},
            "visitorteam": {"name": "New Zealand"}
        }]});
        let fixtures: Vec<FixtureSnapshot> = normalize(&adapter(), &raw).unwrap();
        assert_eq!(fixtures[0].scheduled_date, "2025-09-01");
        assert_eq!(fixtures[0].scheduled_time, "3:30 PM");
    }

    #[test]
    fn test_fixture_with_garbage_date_is_malformed() {
        let raw = json!({"data": [{
            "id": 11,
            "starting_at": "soon",
            "localteam": {"name": "India"},
            "visitorteam": {"name": "New Zealand"}
        }]});
        let res: Result<Vec<FixtureSnapshot>, _> = normalize(&adapter(), &raw);
        assert!(res.is_err());
    }

    #[test]
    fn test_news_is_unsupported() {
        let err = adapter().endpoint(Category::News).unwrap_err();
        assert!(matches!(err, FeedError::Unsupported { .. }));
    }

    #[test]
    fn test_endpoint_carries_token_and_includes() {
        let url = adapter().endpoint(Category::Fixtures).unwrap();
        assert_eq!(url.path(), "/api/fixtures");
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("api_token".into(), "token".into())));
        assert!(query.contains(&("filter[status]".into(), "NS".into())));
    }

    #[test]
    fn test_live_endpoint_is_fixtures_now() {
        let url = adapter().endpoint(Category::Live).unwrap();
        assert_eq!(url.path(), "/api/fixtures/now");
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("include".into(), INCLUDES.into())));
        assert!(!query.iter().any(|(k, _)| k == "filter[status]"));
    }

    #[test]
    fn test_is_in_play() {
        assert!(is_in_play("1st Innings"));
        assert!(is_in_play("Innings Break"));
        assert!(!is_in_play("NS"));
        assert!(!is_in_play("Finished"));
    }
}
