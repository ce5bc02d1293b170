use serde::Serialize;
use std::collections::BTreeMap;

const DARK: [(&str, &str); 3] = [
    ("--bg", "#0b0f0b"),
    ("--card", "#0f1b17"),
    ("--text", "#cfe6d6"),
];
const LIGHT: [(&str, &str); 3] = [
    ("--bg", "#f7fdf7"),
    ("--card", "#fff"),
    ("--text", "#12211a"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Dark,
    Light,
}

impl Theme {
    pub fn palette(self) -> &'static [(&'static str, &'static str); 3] {
        match self {
            Theme::Dark => &DARK,
            Theme::Light => &LIGHT,
        }
    }

    /// The toggle button names the theme it switches to.
    pub fn button_label(self) -> &'static str {
        match self {
            Theme::Dark => "Light",
            Theme::Light => "Dark",
        }
    }
}

/// CSS custom properties applied to the page root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleContext {
    vars: BTreeMap<String, String>,
}

impl Default for StyleContext {
    /// The page starts dark.
    fn default() -> Self {
        let mut style = StyleContext {
            vars: BTreeMap::new(),
        };
        style.apply(Theme::Dark);
        style
    }
}

impl StyleContext {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: &str, value: &str) {
        self.vars.insert(name.to_string(), value.to_string());
    }

    pub fn apply(&mut self, theme: Theme) {
        for (name, value) in theme.palette() {
            self.set(name, value);
        }
    }

    /// Read back from `--bg`; anything but the dark background is light.
    pub fn theme(&self) -> Theme {
        if self.get("--bg") == Some(DARK[0].1) {
            Theme::Dark
        } else {
            Theme::Light
        }
    }

    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    /// `:root { --bg: #0b0f0b; ... }`
    pub fn to_css(&self) -> String {
        let body: Vec<String> = self
            .vars
            .iter()
            .map(|(k, v)| format!("{}: {};", k, v))
            .collect();
        format!(":root {{ {} }}", body.join(" "))
    }
}

/// Flip between dark and light, reading the current theme from `style`.
/// Returns the theme now applied.
pub fn toggle_theme(style: &mut StyleContext) -> Theme {
    let next = match style.theme() {
        Theme::Dark => Theme::Light,
        Theme::Light => Theme::Dark,
    };
    style.apply(next);
    next
}
