use axum::{
    extract::State,
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use chrono::{Datelike, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::feed::provider::Normalize;
use crate::feed::Aggregator;
use crate::models::{CategorySnapshot, FixtureSnapshot, MatchSnapshot, NewsItem};
use crate::render::{refresh_news, Region, Surface, Theme};

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Aggregator,
    pub surface: Surface,
}

/// Build the Axum router for the page server.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/api/view", get(view_handler))
        .route("/api/live", get(live_handler))
        .route("/api/fixtures", get(fixtures_handler))
        .route("/api/news", get(news_handler))
        .route("/api/news/refresh", post(news_refresh_handler))
        .route("/api/theme", post(theme_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// Serve the page with every region pre-rendered from the surface.
async fn index_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let surface = &state.surface;
    let style = surface.style();
    let slots = [
        ("css_vars", style.to_css()),
        ("theme_label", style.theme().button_label().to_string()),
        ("featured", surface.region(Region::Featured)),
        ("live", surface.region(Region::Live)),
        ("fixtures", surface.region(Region::Fixtures)),
        ("news", surface.region(Region::News)),
        ("year", Utc::now().year().to_string()),
    ];
    Html(fill_template(PAGE_HTML, &slots))
}

/// Substitute `{{name}}` slots in one pass; inserted values are never rescanned.
fn fill_template(template: &str, slots: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let slot = after.find("}}").and_then(|end| {
            let name = &after[..end];
            slots.iter().find(|(k, _)| *k == name).map(|(_, v)| (v, end))
        });
        match slot {
            Some((value, end)) => {
                out.push_str(value);
                rest = &after[end + 2..];
            }
            None => {
                out.push_str("{{");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[derive(Debug, Serialize)]
struct ViewResponse {
    featured: String,
    live: String,
    fixtures: String,
    news: String,
}

/// GET /api/view: committed HTML of every region, polled by the page.
async fn view_handler(State(state): State<Arc<AppState>>) -> Json<ViewResponse> {
    let s = &state.surface;
    Json(ViewResponse {
        featured: s.region(Region::Featured),
        live: s.region(Region::Live),
        fixtures: s.region(Region::Fixtures),
        news: s.region(Region::News),
    })
}

/// Latest published snapshot, or a fresh refresh when nothing is published yet.
async fn latest_or_refresh<T: Normalize>(aggregator: &Aggregator) -> CategorySnapshot<T> {
    let snapshot = match aggregator.latest::<T>() {
        Some(s) => s,
        None => aggregator.refresh::<T>().await,
    };
    (*snapshot).clone()
}

/// GET /api/live
async fn live_handler(
    State(state): State<Arc<AppState>>,
) -> Json<CategorySnapshot<MatchSnapshot>> {
    Json(latest_or_refresh(&state.aggregator).await)
}

/// GET /api/fixtures
async fn fixtures_handler(
    State(state): State<Arc<AppState>>,
) -> Json<CategorySnapshot<FixtureSnapshot>> {
    Json(latest_or_refresh(&state.aggregator).await)
}

/// GET /api/news
async fn news_handler(State(state): State<Arc<AppState>>) -> Json<CategorySnapshot<NewsItem>> {
    Json(latest_or_refresh(&state.aggregator).await)
}

/// POST /api/news/refresh: the manual refresh button. Returns the news region.
async fn news_refresh_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    refresh_news(&state.aggregator, &state.surface).await;
    Html(state.surface.region(Region::News))
}

#[derive(Debug, Serialize)]
struct ThemeResponse {
    theme: Theme,
    button_label: &'static str,
    vars: BTreeMap<String, String>,
}

/// POST /api/theme
async fn theme_handler(State(state): State<Arc<AppState>>) -> Json<ThemeResponse> {
    let theme = state.surface.toggle_theme();
    Json(ThemeResponse {
        theme,
        button_label: theme.button_label(),
        vars: state.surface.style().vars().clone(),
    })
}

async fn health_handler() -> &'static str {
    "ok"
}

/// Embedded single-file page (HTML + CSS + JS)
const PAGE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Cricket Live</title>
<style id="theme-vars">{{css_vars}}</style>
<style>
  * { box-sizing: border-box; margin: 0; padding: 0; }
  body { background: var(--bg); color: var(--text); font-family: 'Segoe UI', system-ui, sans-serif; }
  header { display: flex; align-items: center; gap: 1rem; padding: 1rem 2rem; }
  header h1 { font-size: 1.4rem; font-weight: 700; }
  #theme-toggle { margin-left: auto; }
  main { padding: 1.5rem 2rem; display: grid; gap: 1.5rem; }
  .panel { background: var(--card); border-radius: 10px; padding: 1rem 1.2rem; }
  .panel-header { font-weight: 600; display: flex; justify-content: space-between; align-items: center; margin-bottom: .8rem; }
  .match { padding: .6rem 0; }
  .teams { display: flex; justify-content: space-between; gap: 1rem; }
  .team .name { font-weight: 600; }
  .meta { opacity: .7; font-size: .85rem; }
  .match[data-live] .meta { color: #2ecc71; }
  .card { padding: .6rem 0; }
  .card a { color: inherit; }
  .empty, .loader, .source-note { opacity: .7; font-size: .9rem; }
  .two-col { display: grid; grid-template-columns: 1fr 1fr; gap: 1.5rem; }
  @media (max-width: 768px) { .two-col { grid-template-columns: 1fr; } }
  button { background: none; border: 1px solid currentColor; color: inherit; padding: .3rem .8rem; border-radius: 6px; cursor: pointer; font-size: .8rem; }
  footer { padding: 1rem 2rem; opacity: .6; font-size: .8rem; }
</style>
</head>
<body>
<header>
  <h1>Cricket Live</h1>
  <button id="theme-toggle" onclick="toggleTheme()">{{theme_label}}</button>
</header>

<main>
  <div class="panel">
    <div class="panel-header">Featured</div>
    <div id="featured">{{featured}}</div>
  </div>

  <div class="two-col">
    <div class="panel">
      <div class="panel-header">Live Matches</div>
      <div id="live">{{live}}</div>
    </div>
    <div class="panel">
      <div class="panel-header">Upcoming Fixtures</div>
      <div id="fixtures">{{fixtures}}</div>
    </div>
  </div>

  <div class="panel">
    <div class="panel-header">News <button id="news-refresh" onclick="refreshNews()">Refresh</button></div>
    <div id="news">{{news}}</div>
  </div>
</main>

<footer>&copy; {{year}} Cricket Live</footer>

<script>
let newsBusy = false;

async function loadView() {
  const r = await fetch('/api/view');
  if (!r.ok) return;
  const v = await r.json();
  document.getElementById('featured').innerHTML = v.featured;
  document.getElementById('live').innerHTML = v.live;
  document.getElementById('fixtures').innerHTML = v.fixtures;
  if (!newsBusy) document.getElementById('news').innerHTML = v.news;
}

async function refreshNews() {
  newsBusy = true;
  const el = document.getElementById('news');
  el.innerHTML = '<p class="loader">Refreshing...</p>';
  try {
    const r = await fetch('/api/news/refresh', { method: 'POST' });
    if (r.ok) el.innerHTML = await r.text();
  } finally {
    newsBusy = false;
  }
}

async function toggleTheme() {
  const r = await fetch('/api/theme', { method: 'POST' });
  if (!r.ok) return;
  const t = await r.json();
  for (const [k, v] of Object.entries(t.vars)) {
    document.documentElement.style.setProperty(k, v);
  }
  document.getElementById('theme-toggle').textContent = t.button_label;
}

setInterval(loadView, 5000);
</script>
</body>
</html>"#;
