//! Built-in data served when `USE_MOCK` is on, or when a live fetch fails
//! before anything has been cached.

use crate::models::{FixtureSnapshot, MatchSnapshot, NewsItem};

pub fn live_matches() -> Vec<MatchSnapshot> {
    vec![
        MatchSnapshot {
            id: "1".into(),
            local_team: "India".into(),
            visitor_team: "Australia".into(),
            local_score: Some("45/1 (3.4)".into()),
            visitor_score: None,
            status: "LIVE - 3rd over".into(),
            is_live: true,
        },
        MatchSnapshot {
            id: "2".into(),
            local_team: "England".into(),
            visitor_team: "Pakistan".into(),
            local_score: Some("86/3 (11.2)".into()),
            visitor_score: None,
            status: "LIVE - 12th over".into(),
            is_live: true,
        },
    ]
}

pub fn fixtures() -> Vec<FixtureSnapshot> {
    vec![
        FixtureSnapshot {
            id: "11".into(),
            local_team: "India".into(),
            visitor_team: "New Zealand".into(),
            scheduled_date: "2025-09-01".into(),
            scheduled_time: "3:30 PM".into(),
        },
        FixtureSnapshot {
            id: "12".into(),
            local_team: "Sri Lanka".into(),
            visitor_team: "Bangladesh".into(),
            scheduled_date: "2025-08-24".into(),
            scheduled_time: "9:30 AM".into(),
        },
    ]
}

pub fn news() -> Vec<NewsItem> {
    vec![
        NewsItem {
            id: "101".into(),
            title: "India name 15-man squad for T20 series".into(),
            excerpt: "Selectors named a 15-man squad with youngsters included.".into(),
            url: "#".into(),
        },
        NewsItem {
            id: "102".into(),
            title: "Rohit hits another century in domestic final".into(),
            excerpt: "A masterful 120* guided his side to victory.".into(),
            url: "#".into(),
        },
    ]
}
