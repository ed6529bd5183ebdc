use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub const DEFAULT_HIGHLIGHT_COLOR: &str = "rgba(221,232,185,0.5)";

const BUILTIN: &[(&str, &str)] = &[
    ("highlightYellow", "#FFFF00"),
    ("highlightGreen", "#90EE90"),
    ("highlightRed", "#FF6347"),
    ("highlightBlue", "#ADD8E6"),
    ("highlightPurple", "#D8BFD8"),
    ("highlightOrange", "#FFA500"),
    ("Oxford", "rgb(16,29,62)"),
    ("Cadet", "rgb(155,184,193)"),
    ("Cinnabar", "rgb(236,74,39)"),
    ("Robin", "rgb(52,192,206)"),
    ("Persian", "rgb(198,62,48)"),
    ("PersianRed", "rgb(198,62,48)"),
    ("Columbia", "rgb(203,216,221)"),
    ("Alabaster", "rgb(229,230,217)"),
    ("Tea", "rgb(221,232,185)"),
    ("White", "rgb(255,255,255)"),
    ("OxfordHalf", "rgba(16,29,62,0.5)"),
    ("CadetHalf", "rgba(155,184,193,0.5)"),
    ("CinnabarHalf", "rgba(236,74,39,0.5)"),
    ("RobinHalf", "rgba(52,192,206,0.5)"),
    ("PersianHalf", "rgba(198,62,48,0.5)"),
    ("ColumbiaHalf", "rgba(203,216,221,0.5)"),
    ("AlabasterHalf", "rgba(229,230,217,0.5)"),
    ("TeaHalf", DEFAULT_HIGHLIGHT_COLOR),
];

/// Immutable color registry, keyed by palette name.
///
/// Build it once (optionally with extra entries from configuration) and pass it to the render and
/// highlight calls that need it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    colors: IndexMap<String, String>,
    fallback: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: BUILTIN
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            fallback: DEFAULT_HIGHLIGHT_COLOR.to_string(),
        }
    }
}

impl Palette {
    /// Built-in colors plus `extra` (which wins on key collisions).
    pub fn with_entries<I, K, V>(extra: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut palette = Self::default();
        for (k, v) in extra {
            palette.colors.insert(k.into(), v.into());
        }
        palette
    }

    pub fn with_fallback(mut self, color: impl Into<String>) -> Self {
        self.fallback = color.into();
        self
    }

    /// Exact key first, then a case- and space-insensitive match.
    pub fn get(&self, key: &str) -> Option<&str> {
        if let Some(v) = self.colors.get(key) {
            return Some(v.as_str());
        }
        let wanted = normalize_key(key);
        self.colors
            .iter()
            .find(|(k, _)| normalize_key(k) == wanted)
            .map(|(_, v)| v.as_str())
    }

    /// Like [`Palette::get`], but unknown keys resolve to the fallback highlight color.
    pub fn resolve(&self, key: &str) -> &str {
        match self.get(key) {
            Some(color) => color,
            None => {
                tracing::debug!(key, fallback = %self.fallback, "unknown palette key");
                &self.fallback
            }
        }
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.colors.keys().map(String::as_str)
    }
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}
