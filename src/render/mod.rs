//! Pure rendering: snapshots in, view trees out.
//!
//! Nothing here touches the display. [`surface`] commits the trees this
//! module produces.

pub mod surface;
pub mod theme;

pub use surface::{bind, refresh_news, Region, Surface};
pub use theme::Theme;

use crate::models::{CategorySnapshot, FixtureSnapshot, MatchSnapshot, NewsItem, Source};

/// A rendered element or text node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewNode {
    Element {
        tag: &'static str,
        class: Option<&'static str>,
        attrs: Vec<(&'static str, String)>,
        children: Vec<ViewNode>,
    },
    Text(String),
}

impl ViewNode {
    pub fn el(tag: &'static str, class: Option<&'static str>) -> Self {
        ViewNode::Element {
            tag,
            class,
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        ViewNode::Text(s.into())
    }

    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        if let ViewNode::Element { attrs, .. } = &mut self {
            attrs.push((name, value.into()));
        }
        self
    }

    pub fn child(mut self, node: ViewNode) -> Self {
        if let ViewNode::Element { children, .. } = &mut self {
            children.push(node);
        }
        self
    }

    pub fn children(mut self, nodes: impl IntoIterator<Item = ViewNode>) -> Self {
        if let ViewNode::Element { children, .. } = &mut self {
            children.extend(nodes);
        }
        self
    }

    /// Concatenated text of this node and all descendants.
    #[cfg(test)]
    pub fn text_content(&self) -> String {
        match self {
            ViewNode::Text(s) => s.clone(),
            ViewNode::Element { children, .. } => {
                children.iter().map(ViewNode::text_content).collect()
            }
        }
    }

    /// All descendants (and self) carrying `class`.
    #[cfg(test)]
    pub fn find_class(&self, wanted: &str) -> Vec<&ViewNode> {
        let mut out = Vec::new();
        self.collect_class(wanted, &mut out);
        out
    }

    #[cfg(test)]
    fn collect_class<'a>(&'a self, wanted: &str, out: &mut Vec<&'a ViewNode>) {
        if let ViewNode::Element { class, children, .. } = self {
            if *class == Some(wanted) {
                out.push(self);
            }
            for c in children {
                c.collect_class(wanted, out);
            }
        }
    }
}

fn text_el(tag: &'static str, class: Option<&'static str>, s: &str) -> ViewNode {
    ViewNode::el(tag, class).child(ViewNode::text(s))
}

/// Wrap rendered items in a section tagged with the snapshot source; an empty
/// list becomes an explicit placeholder.
fn section<T>(
    snapshot: &CategorySnapshot<T>,
    empty_message: &str,
    item: impl Fn(&T) -> ViewNode,
) -> ViewNode {
    let mut root = ViewNode::el("section", Some("list"))
        .attr("data-category", snapshot.category.to_string())
        .attr("data-source", snapshot.source.to_string());
    match snapshot.source {
        Source::Live => {}
        Source::Cache => {
            root = root.child(text_el("p", Some("source-note"), "Showing last known data"));
        }
        Source::Mock => {
            root = root.child(text_el("p", Some("source-note"), "Showing sample data"));
        }
    }
    if snapshot.items.is_empty() {
        return root.child(text_el("p", Some("empty"), empty_message));
    }
    root.children(snapshot.items.iter().map(item))
}

fn team(name: &str, score: Option<&str>) -> ViewNode {
    ViewNode::el("div", Some("team"))
        .child(text_el("div", Some("name"), name))
        .child(text_el("div", Some("score"), score.unwrap_or("")))
}

fn match_card(m: &MatchSnapshot) -> ViewNode {
    let card = ViewNode::el("div", Some("match"))
        .attr("data-id", m.id.clone())
        .child(
            ViewNode::el("div", Some("teams"))
                .child(team(&m.local_team, m.local_score.as_deref()))
                .child(team(&m.visitor_team, m.visitor_score.as_deref())),
        )
        .child(text_el("div", Some("meta"), &m.status));
    if m.is_live {
        card.attr("data-live", "true")
    } else {
        card
    }
}

pub fn render_live(snapshot: &CategorySnapshot<MatchSnapshot>) -> ViewNode {
    section(snapshot, "No live matches right now", match_card)
}

pub fn render_fixtures(snapshot: &CategorySnapshot<FixtureSnapshot>) -> ViewNode {
    section(snapshot, "No upcoming fixtures", |f| {
        let when = if f.scheduled_time.is_empty() {
            f.scheduled_date.clone()
        } else {
            format!("{} • {}", f.scheduled_date, f.scheduled_time)
        };
        ViewNode::el("div", Some("match"))
            .attr("data-id", f.id.clone())
            .child(text_el(
                "strong",
                None,
                &format!("{} vs {}", f.local_team, f.visitor_team),
            ))
            .child(text_el("div", Some("meta"), &when))
    })
}

pub fn render_news(snapshot: &CategorySnapshot<NewsItem>) -> ViewNode {
    section(snapshot, "No news available", |n| {
        ViewNode::el("article", Some("card"))
            .attr("data-id", n.id.clone())
            .child(text_el("h4", None, &n.title))
            .child(text_el("p", None, &n.excerpt))
            .child(
                ViewNode::el("p", Some("meta")).child(
                    ViewNode::el("a", None)
                        .attr("href", n.url.clone())
                        .attr("target", "_blank")
                        .attr("rel", "noopener")
                        .child(ViewNode::text("Read more")),
                ),
            )
    })
}

/// The headline panel: first live match, or a "no live matches" loader.
pub fn render_featured(snapshot: &CategorySnapshot<MatchSnapshot>) -> ViewNode {
    match snapshot.items.first() {
        Some(m) => ViewNode::el("div", Some("match"))
            .attr("data-id", m.id.clone())
            .child(
                ViewNode::el("div", Some("teams"))
                    .child(team(&m.local_team, m.local_score.as_deref()))
                    .child(team(&m.visitor_team, m.visitor_score.as_deref())),
            )
            .child(text_el("div", Some("meta"), &m.status)),
        None => text_el("div", Some("loader"), "No live matches"),
    }
}

/// Shown in a region while its data is being refreshed.
pub fn loading_placeholder() -> ViewNode {
    text_el("p", Some("loader"), "Refreshing...")
}
