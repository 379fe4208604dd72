use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw page markup captured from the browser for one analysis attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageContent {
    pub url: String,
    pub raw_html: String,
}

impl PageContent {
    pub fn new(url: impl Into<String>, raw_html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            raw_html: raw_html.into(),
        }
    }
}

/// One byline name or several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Author {
    One(String),
    Many(Vec<String>),
}

impl Author {
    /// Build from a list of names, dropping blanks and duplicates.
    /// Returns `None` when no name survives.
    pub fn from_names<I, S>(names: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for name in names {
            let name = crate::text::collapse_whitespace(name.as_ref());
            let name = name
                .trim_start_matches("By ")
                .trim_start_matches("by ")
                .trim_end_matches(',')
                .trim()
                .to_string();
            if !name.is_empty() && !out.contains(&name) {
                out.push(name);
            }
        }
        match out.len() {
            0 => None,
            1 => out.pop().map(Author::One),
            _ => Some(Author::Many(out)),
        }
    }

    pub fn names(&self) -> Vec<&str> {
        match self {
            Author::One(name) => vec![name.as_str()],
            Author::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

/// Structured fields pulled out of one article page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleData {
    /// Always non-empty: publisher headline, page `<title>`, or the URL.
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}
