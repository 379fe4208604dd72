//! Page markup normalization and article extraction.
//!
//! - [`normalize`]: deterministic noise strip producing cleaned HTML, body
//!   text and head text
//! - [`extractors`]: per-publisher field extraction (title, byline, date,
//!   article text)
//! - [`registry`]: hostname → extractor lookup with a generic fallback
//!
//! ```
//! use slant_extract::{normalize, registry};
//!
//! let raw = "<html><head><title>Hello | Example</title></head>\
//!            <body><div class=\"x\"><p>Body text</p></div><script>x()</script></body></html>";
//! let doc = normalize(raw);
//! assert_eq!(doc.body, "Body text");
//! assert_eq!(doc.head, "Hello | Example");
//!
//! let article = registry::select("https://example.com/story").parse("https://example.com/story", raw);
//! assert_eq!(article.title, "Hello | Example");
//! ```

pub mod article;
pub mod dates;
pub mod extractors;
pub mod normalize;
pub mod registry;
mod text;

pub use article::{ArticleData, Author, PageContent};
pub use extractors::{Extractor, ExtractorKind};
pub use normalize::{NormalizedDocument, normalize};
