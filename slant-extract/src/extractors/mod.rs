//! Site-specific article extractors.
//!
//! Each publisher implements [`SiteRules`]: where its headline, byline, date
//! and article body live, and which nodes are noise. [`ExtractorKind`] is the
//! closed set of publishers; [`Extractor`] is the per-parse working state
//! (one parsed copy of the page plus its URL).
//!
//! Field accessors never fail: a missing landmark or an unparsable date is
//! logged and surfaces as `None`, and never stops the other fields from being
//! extracted.

mod cnn;
mod foxnews;
mod generic;
mod guardian;
mod npr;

use chrono::{DateTime, Utc};
use dom_query::Document;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::article::{ArticleData, Author};
use crate::dates::DateError;
use crate::normalize::{remove_comments, remove_noise};
use crate::text::{collapse_whitespace, non_empty};

pub use cnn::Cnn;
pub use foxnews::FoxNews;
pub use generic::Generic;
pub use guardian::Guardian;
pub use npr::Npr;

/// Why a single field could not be extracted.
#[derive(Debug, Error)]
pub enum FieldError {
    #[error("landmark {0:?} not found")]
    MissingLandmark(&'static str),
    #[error(transparent)]
    Date(#[from] DateError),
}

/// Publisher-specific extraction rules.
pub trait SiteRules: Send + Sync {
    fn name(&self) -> &'static str;

    /// Headline from a publisher landmark (not the `<title>` tag).
    fn headline(&self, doc: &Document) -> Result<String, FieldError>;

    /// Cut a site-name suffix off the `<title>` fallback. Default: keep as is.
    fn split_title<'a>(&self, title: &'a str) -> &'a str {
        title
    }

    fn author(&self, doc: &Document) -> Result<Author, FieldError>;

    fn date(&self, doc: &Document) -> Result<DateTime<Utc>, FieldError>;

    /// Selectors for ads, captions, video players, share widgets and the like.
    fn noise_selectors(&self) -> &'static [&'static str] {
        &[]
    }

    fn clean_content(&self, doc: &Document) {
        for selector in self.noise_selectors() {
            doc.select(selector).remove();
        }
    }

    fn content(&self, doc: &Document) -> Result<String, FieldError>;
}

/// The registered extractors. `Generic` is the fallback for unknown hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractorKind {
    Generic,
    Cnn,
    FoxNews,
    Guardian,
    Npr,
}

impl ExtractorKind {
    pub fn rules(self) -> &'static dyn SiteRules {
        match self {
            ExtractorKind::Generic => &Generic,
            ExtractorKind::Cnn => &Cnn,
            ExtractorKind::FoxNews => &FoxNews,
            ExtractorKind::Guardian => &Guardian,
            ExtractorKind::Npr => &Npr,
        }
    }

    pub fn name(self) -> &'static str {
        self.rules().name()
    }

    /// Extract article fields from `raw_html` with a fresh [`Extractor`].
    pub fn parse(self, url: &str, raw_html: &str) -> ArticleData {
        Extractor::new(self, url, raw_html).parse()
    }
}

/// Working state for one parse: a private parsed copy of the page and its URL.
pub struct Extractor {
    kind: ExtractorKind,
    url: String,
    doc: Document,
}

impl Extractor {
    pub fn new(kind: ExtractorKind, url: &str, raw_html: &str) -> Self {
        Self {
            kind,
            url: url.to_string(),
            doc: Document::from(raw_html),
        }
    }

    pub fn kind(&self) -> ExtractorKind {
        self.kind
    }

    /// Publisher headline, else the `<title>` text (split by the publisher's
    /// rule), else the URL. Never empty.
    pub fn title(&self) -> String {
        let rules = self.kind.rules();
        if let Some(headline) = self.field("title", rules.headline(&self.doc)) {
            return headline;
        }
        let page_title = collapse_whitespace(&self.doc.select("title").first().text());
        if let Some(title) = non_empty(rules.split_title(&page_title)) {
            return title;
        }
        match non_empty(&self.url) {
            Some(url) => url,
            None => "Untitled".to_string(),
        }
    }

    pub fn author(&self) -> Option<Author> {
        self.field("author", self.kind.rules().author(&self.doc))
    }

    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.field("date", self.kind.rules().date(&self.doc))
    }

    /// Strip generic noise and then publisher noise from the working copy.
    pub fn clean_content(&mut self) {
        remove_comments(&self.doc);
        remove_noise(&self.doc);
        self.kind.rules().clean_content(&self.doc);
    }

    pub fn content(&self) -> Option<String> {
        self.field("content", self.kind.rules().content(&self.doc))
    }

    /// Title, byline and date come from the uncleaned page because some of
    /// them live in chrome that cleaning removes; content comes after cleaning.
    pub fn parse(mut self) -> ArticleData {
        let title = self.title();
        let author = self.author();
        let date = self.date();
        self.clean_content();
        let content = self.content();

        tracing::debug!(
            extractor = self.kind.name(),
            url = %self.url,
            has_author = author.is_some(),
            has_date = date.is_some(),
            content_len = content.as_ref().map(String::len).unwrap_or(0),
            "extract.parse.done"
        );

        ArticleData {
            title,
            author,
            date,
            content,
        }
    }

    fn field<T>(&self, field: &'static str, res: Result<T, FieldError>) -> Option<T> {
        match res {
            Ok(v) => Some(v),
            Err(err @ FieldError::Date(_)) => {
                tracing::warn!(extractor = self.kind.name(), url = %self.url, field, error = %err, "extract.field.invalid");
                None
            }
            Err(err) => {
                tracing::debug!(extractor = self.kind.name(), url = %self.url, field, error = %err, "extract.field.absent");
                None
            }
        }
    }
}

/// Text of the first element matching any of `selectors`, in order.
pub(crate) fn first_text(doc: &Document, selectors: &[&'static str]) -> Result<String, FieldError> {
    for selector in selectors {
        let sel = doc.select(selector);
        if let Some(text) = sel.iter().find_map(|s| non_empty(&s.text())) {
            return Ok(text);
        }
    }
    Err(FieldError::MissingLandmark(selectors.first().copied().unwrap_or("")))
}

/// Attribute value of the first element matching `selector` that carries it.
pub(crate) fn first_attr(
    doc: &Document,
    selector: &'static str,
    attr: &str,
) -> Result<String, FieldError> {
    doc.select(selector)
        .iter()
        .find_map(|s| s.attr(attr).and_then(|v| non_empty(&v)))
        .ok_or(FieldError::MissingLandmark(selector))
}

/// Every byline name matching `selector`.
pub(crate) fn names(doc: &Document, selector: &'static str) -> Result<Author, FieldError> {
    let texts: Vec<String> = doc.select(selector).iter().map(|s| s.text().to_string()).collect();
    Author::from_names(texts).ok_or(FieldError::MissingLandmark(selector))
}

/// Article text of the first matching container: paragraphs separated by a
/// blank line, or the container's whole text when it has no `<p>`.
pub(crate) fn container_text(doc: &Document, selectors: &[&'static str]) -> Result<String, FieldError> {
    for selector in selectors {
        let container = doc.select(selector).first();
        if !container.exists() {
            continue;
        }
        let paragraphs: Vec<String> = container
            .select("p")
            .iter()
            .filter_map(|p| non_empty(&p.text()))
            .collect();
        if !paragraphs.is_empty() {
            return Ok(paragraphs.join("\n\n"));
        }
        if let Some(text) = non_empty(&container.text()) {
            return Ok(text);
        }
    }
    Err(FieldError::MissingLandmark(selectors.first().copied().unwrap_or("")))
}

/// Text before the first occurrence of `sep`; the whole title when absent.
pub(crate) fn before<'a>(title: &'a str, sep: &str) -> &'a str {
    title.split(sep).next().unwrap_or(title).trim()
}
