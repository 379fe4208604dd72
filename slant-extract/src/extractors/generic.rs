use chrono::{DateTime, Utc};
use dom_query::Document;

use super::{FieldError, SiteRules, container_text, first_attr, first_text, names};
use crate::article::Author;
use crate::dates::parse_machine;

/// Fallback for hosts without dedicated rules. Relies only on landmarks that
/// most publishers emit for search engines and readers.
pub struct Generic;

impl SiteRules for Generic {
    fn name(&self) -> &'static str {
        "generic"
    }

    // An unknown site's separator convention cannot be guessed, so the page
    // title is used unsplit when there is no h1.
    fn headline(&self, doc: &Document) -> Result<String, FieldError> {
        first_text(doc, &["article h1", "h1", "title"])
    }

    fn author(&self, doc: &Document) -> Result<Author, FieldError> {
        if let Ok(name) = first_attr(doc, r#"meta[name="author"]"#, "content") {
            if let Some(author) = Author::from_names(name.split(',')) {
                return Ok(author);
            }
        }
        names(doc, r#"[rel="author"]"#).or_else(|_| names(doc, ".byline"))
    }

    fn date(&self, doc: &Document) -> Result<DateTime<Utc>, FieldError> {
        let raw = first_attr(doc, r#"meta[property="article:published_time"]"#, "content")
            .or_else(|_| first_attr(doc, "time[datetime]", "datetime"))?;
        Ok(parse_machine(&raw)?)
    }

    fn content(&self, doc: &Document) -> Result<String, FieldError> {
        container_text(doc, &["article", "main", r#"[itemprop="articleBody"]"#])
    }
}
