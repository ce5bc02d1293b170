//! JSON field helpers and the clean-up every adapter's output goes through.

use chrono::{NaiveDate, NaiveTime};
use serde_json::Value;
use std::collections::HashSet;
use url::Url;

use crate::error::AdapterError;
use crate::models::{FeedItem, FixtureSnapshot, MatchSnapshot, NewsItem};

/// Read a scalar field that providers send either as a string or a number.
/// Blank strings count as absent.
pub fn text(v: &Value, key: &str) -> Option<String> {
    match v.get(key)? {
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                Some(s.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Optional field: absent becomes an empty string.
pub fn text_or_empty(v: &Value, key: &str) -> String {
    text(v, key).unwrap_or_default()
}

/// Required field: absent is a malformed payload.
pub fn require(v: &Value, key: &str, what: &str) -> Result<String, AdapterError> {
    text(v, key)
        .ok_or_else(|| AdapterError::MalformedPayload(format!("{} is missing `{}`", what, key)))
}

/// Required top-level collection.
pub fn require_array<'a>(v: &'a Value, key: &str) -> Result<&'a Vec<Value>, AdapterError> {
    v.get(key)
        .and_then(|a| a.as_array())
        .ok_or_else(|| AdapterError::MalformedPayload(format!("response has no `{}` array", key)))
}

pub fn is_calendar_date(s: &str) -> bool {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

pub fn is_valid_url(s: &str) -> bool {
    s == "#"
        || Url::parse(s)
            .map(|u| matches!(u.scheme(), "http" | "https"))
            .unwrap_or(false)
}

/// Keep well-formed http(s) URLs; anything else becomes the `#` placeholder.
pub fn sanitize_url(s: &str) -> String {
    if is_valid_url(s) {
        s.to_string()
    } else {
        "#".to_string()
    }
}

/// "15:30" → "3:30 PM"
pub fn display_time(t: NaiveTime) -> String {
    t.format("%-I:%M %p").to_string()
}

fn dedupe_by_id<T: FeedItem>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.id().to_string()))
        .collect()
}

pub fn finish_matches(items: Vec<MatchSnapshot>) -> Vec<MatchSnapshot> {
    dedupe_by_id(items)
        .into_iter()
        .map(|mut m| {
            if m.status.trim().is_empty() {
                m.status = if m.is_live { "Live" } else { "Not started" }.to_string();
            }
            m
        })
        .collect()
}

pub fn finish_fixtures(items: Vec<FixtureSnapshot>) -> Result<Vec<FixtureSnapshot>, AdapterError> {
    let items = dedupe_by_id(items);
    if let Some(bad) = items.iter().find(|f| !is_calendar_date(&f.scheduled_date)) {
        return Err(AdapterError::MalformedPayload(format!(
            "fixture {} has unparseable date '{}'",
            bad.id, bad.scheduled_date
        )));
    }
    Ok(items)
}

pub fn finish_news(items: Vec<NewsItem>) -> Vec<NewsItem> {
    dedupe_by_id(items)
        .into_iter()
        .map(|mut n| {
            n.url = sanitize_url(&n.url);
            n
        })
        .collect()
}
