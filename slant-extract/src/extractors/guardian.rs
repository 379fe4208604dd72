use chrono::{DateTime, Utc};
use chrono_tz::Europe::London;
use dom_query::Document;

use super::{FieldError, SiteRules, before, container_text, first_text, names};
use crate::article::Author;
use crate::dates::{parse_local, strip_decorations};

/// "Tue 5 Mar 2024 10.42 GMT"; clock time uses a dot.
const DATE_FORMAT: &str = "%a %d %b %Y %H.%M";

pub struct Guardian;

impl SiteRules for Guardian {
    fn name(&self) -> &'static str {
        "guardian"
    }

    fn headline(&self, doc: &Document) -> Result<String, FieldError> {
        first_text(doc, &[r#"[data-gu-name="headline"] h1"#, "h1"])
    }

    fn split_title<'a>(&self, title: &'a str) -> &'a str {
        before(title, "|")
    }

    fn author(&self, doc: &Document) -> Result<Author, FieldError> {
        names(doc, r#"a[rel="author"]"#)
    }

    fn date(&self, doc: &Document) -> Result<DateTime<Utc>, FieldError> {
        let raw = first_text(doc, &["details summary span", "time"])?;
        Ok(parse_local(&strip_decorations(&raw), DATE_FORMAT, London)?)
    }

    fn noise_selectors(&self) -> &'static [&'static str] {
        &[
            "figure",
            "figcaption",
            "gu-island",
            r#"[data-gu-name="media"]"#,
            ".ad-slot",
        ]
    }

    fn content(&self, doc: &Document) -> Result<String, FieldError> {
        container_text(doc, &[r#"[data-gu-name="body"]"#, "#maincontent"])
    }
}
