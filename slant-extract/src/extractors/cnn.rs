use chrono::{DateTime, Utc};
use chrono_tz::America::New_York;
use dom_query::Document;

use super::{FieldError, SiteRules, before, container_text, first_text, names};
use crate::article::Author;
use crate::dates::{parse_local, strip_decorations};

/// CNN timestamps read like "Updated 10:42 AM EDT, Tue March 5, 2024".
const DATE_FORMAT: &str = "%I:%M %p, %a %B %d, %Y";

pub struct Cnn;

impl SiteRules for Cnn {
    fn name(&self) -> &'static str {
        "cnn"
    }

    fn headline(&self, doc: &Document) -> Result<String, FieldError> {
        first_text(doc, &["h1.headline__text", "h1[data-editable=\"headlineText\"]"])
    }

    fn split_title<'a>(&self, title: &'a str) -> &'a str {
        before(title, "|")
    }

    fn author(&self, doc: &Document) -> Result<Author, FieldError> {
        names(doc, ".byline__name")
    }

    fn date(&self, doc: &Document) -> Result<DateTime<Utc>, FieldError> {
        let raw = first_text(doc, &[".timestamp"])?;
        Ok(parse_local(&strip_decorations(&raw), DATE_FORMAT, New_York)?)
    }

    fn noise_selectors(&self) -> &'static [&'static str] {
        &[
            ".ad-slot",
            ".ad-feedback-link",
            ".image__caption",
            ".video-resource",
            ".related-content",
            ".social-share",
        ]
    }

    fn content(&self, doc: &Document) -> Result<String, FieldError> {
        container_text(doc, &[".article__content", ".zn-body__paragraph"])
    }
}
