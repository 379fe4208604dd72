use chrono::{DateTime, Utc};
use chrono_tz::America::New_York;
use dom_query::Document;

use super::{FieldError, SiteRules, before, container_text, first_text, names};
use crate::article::Author;
use crate::dates::{parse_local, strip_decorations};

/// "March 5, 2024 10:42am EST"
const DATE_FORMAT: &str = "%B %d, %Y %I:%M%p";

pub struct FoxNews;

impl SiteRules for FoxNews {
    fn name(&self) -> &'static str {
        "foxnews"
    }

    fn headline(&self, doc: &Document) -> Result<String, FieldError> {
        first_text(doc, &["h1.headline", "h1.headline.speakable"])
    }

    fn split_title<'a>(&self, title: &'a str) -> &'a str {
        before(title, "|")
    }

    fn author(&self, doc: &Document) -> Result<Author, FieldError> {
        names(doc, ".author-byline span a")
    }

    fn date(&self, doc: &Document) -> Result<DateTime<Utc>, FieldError> {
        let raw = first_text(doc, &[".article-date time"])?;
        Ok(parse_local(&strip_decorations(&raw), DATE_FORMAT, New_York)?)
    }

    fn noise_selectors(&self) -> &'static [&'static str] {
        &[
            ".ad-container",
            ".caption",
            ".featured-video",
            ".video-container",
            ".social-share",
            ".article-footer",
        ]
    }

    fn content(&self, doc: &Document) -> Result<String, FieldError> {
        container_text(doc, &[".article-body"])
    }
}
