//! Committing view trees to the display.
//!
//! The page is split into regions; each region holds the HTML of the last
//! tree committed to it. The HTTP layer reads regions, never snapshots.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::task::JoinHandle;
use tracing::debug;

use super::theme::{toggle_theme, StyleContext, Theme};
use super::{
    loading_placeholder, render_featured, render_fixtures, render_live, render_news, ViewNode,
};
use crate::feed::Aggregator;
use crate::models::{AnySnapshot, Category, CategorySnapshot, NewsItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Featured,
    Live,
    Fixtures,
    News,
}

/// Anything a rendered view tree can be committed to.
pub trait ViewSink: Send + Sync {
    fn commit(&self, region: Region, view: &ViewNode);
}

/// In-memory page: committed HTML per region plus the root style context.
#[derive(Clone, Default)]
pub struct Surface {
    regions: Arc<RwLock<HashMap<Region, String>>>,
    style: Arc<RwLock<StyleContext>>,
}

impl ViewSink for Surface {
    fn commit(&self, region: Region, view: &ViewNode) {
        let html = to_html(view);
        debug!("Committing {:?} ({} bytes)", region, html.len());
        self.regions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(region, html);
    }
}

impl Surface {
    pub fn new() -> Self {
        Surface::default()
    }

    /// HTML of `region`; the loading placeholder until something is committed.
    pub fn region(&self, region: Region) -> String {
        self.regions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&region)
            .cloned()
            .unwrap_or_else(|| to_html(&loading_placeholder()))
    }

    pub fn style(&self) -> StyleContext {
        self.style
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn toggle_theme(&self) -> Theme {
        let mut style = self.style.write().unwrap_or_else(PoisonError::into_inner);
        toggle_theme(&mut style)
    }
}

/// Serialize a view tree to HTML, escaping all text and attribute values.
pub fn to_html(node: &ViewNode) -> String {
    let mut out = String::new();
    write_html(node, &mut out);
    out
}

fn write_html(node: &ViewNode, out: &mut String) {
    match node {
        ViewNode::Text(s) => out.push_str(&escape(s)),
        ViewNode::Element {
            tag,
            class,
            attrs,
            children,
        } => {
            out.push('<');
            out.push_str(tag);
            if let Some(class) = class {
                out.push_str(&format!(" class=\"{}\"", escape(class)));
            }
            for (name, value) in attrs {
                out.push_str(&format!(" {}=\"{}\"", name, escape(value)));
            }
            out.push('>');
            for c in children {
                write_html(c, out);
            }
            out.push_str(&format!("</{}>", tag));
        }
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render a published snapshot and commit it to its region(s).
pub fn commit_snapshot(sink: &dyn ViewSink, snapshot: &AnySnapshot) {
    match snapshot {
        AnySnapshot::Live(s) => {
            sink.commit(Region::Live, &render_live(s));
            sink.commit(Region::Featured, &render_featured(s));
        }
        AnySnapshot::Fixtures(s) => sink.commit(Region::Fixtures, &render_fixtures(s)),
        AnySnapshot::News(s) => sink.commit(Region::News, &render_news(s)),
    }
}

/// Manual "refresh news" action: show the loading placeholder while the
/// refresh runs, then the result.
pub async fn refresh_news(
    aggregator: &Aggregator,
    sink: &dyn ViewSink,
) -> Arc<CategorySnapshot<NewsItem>> {
    sink.commit(Region::News, &loading_placeholder());
    let snapshot = aggregator.refresh::<NewsItem>().await;
    sink.commit(Region::News, &render_news(&snapshot));
    snapshot
}

/// Re-render a category every time the aggregator publishes it.
pub fn bind(aggregator: &Aggregator, surface: Surface) -> Vec<JoinHandle<()>> {
    Category::ALL
        .iter()
        .map(|category| {
            let mut rx = aggregator.subscribe(*category);
            let surface = surface.clone();
            tokio::spawn(async move {
                loop {
                    let latest = rx.borrow_and_update().clone();
                    if let Some(snapshot) = latest {
                        commit_snapshot(&surface, &snapshot);
                    }
                    if rx.changed().await.is_err() {
                        break;
                    }
                }
            })
        })
        .collect()
}
