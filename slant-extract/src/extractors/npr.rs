use chrono::{DateTime, Utc};
use chrono_tz::America::New_York;
use dom_query::Document;

use super::{FieldError, SiteRules, before, container_text, first_text, names};
use crate::article::Author;
use crate::dates::{parse_local_date, strip_decorations};

/// NPR shows only the calendar date: "March 5, 2024".
const DATE_FORMAT: &str = "%B %d, %Y";

pub struct Npr;

impl SiteRules for Npr {
    fn name(&self) -> &'static str {
        "npr"
    }

    fn headline(&self, doc: &Document) -> Result<String, FieldError> {
        first_text(doc, &[".storytitle h1"])
    }

    fn split_title<'a>(&self, title: &'a str) -> &'a str {
        before(title, " : ")
    }

    fn author(&self, doc: &Document) -> Result<Author, FieldError> {
        names(doc, ".byline__name")
    }

    fn date(&self, doc: &Document) -> Result<DateTime<Utc>, FieldError> {
        let raw = first_text(doc, &["span.date"])?;
        Ok(parse_local_date(&strip_decorations(&raw), DATE_FORMAT, New_York)?)
    }

    fn noise_selectors(&self) -> &'static [&'static str] {
        &[".bucketwrap", ".credit", ".caption", ".enlarge_measure"]
    }

    fn content(&self, doc: &Document) -> Result<String, FieldError> {
        container_text(doc, &["#storytext"])
    }
}
