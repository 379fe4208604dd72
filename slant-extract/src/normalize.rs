//! Deterministic markup normalization.
//!
//! The output of [`normalize`] never contains scripts, styles, comments, media,
//! page chrome (`nav`, `footer`, `aside`), attributes, empty leaf elements or
//! `div` wrappers. Whitespace is collapsed in all three artifacts.

use dom_query::{Document, NodeRef};
use serde::{Deserialize, Serialize};

use crate::text::collapse_whitespace;

/// Element kinds removed together with their whole subtree.
pub const NOISE_TAGS: &[&str] = &[
    "script", "style", "noscript", "picture", "svg", "button", "source", "iframe", "footer",
    "nav", "aside", "link", "img", "meta",
];

/// Document scaffolding kept even when empty so the serialization shape is stable.
const SCAFFOLD_TAGS: &[&str] = &["html", "head", "body"];

/// Upper bound on serialize-and-reparse rounds.
const MAX_REPARSES: usize = 4;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedDocument {
    /// Text of `<head>` (in practice the page title).
    pub head: String,
    /// Visible text of `<body>`.
    pub body: String,
    /// Cleaned, attribute-free serialization of the whole document.
    pub html: String,
}

/// Normalize raw page markup. Never fails: malformed input is repaired by the
/// HTML5 parser and empty input yields an empty document.
pub fn normalize(raw_html: &str) -> NormalizedDocument {
    if raw_html.trim().is_empty() {
        return NormalizedDocument::default();
    }

    let mut doc = Document::from(raw_html);
    let mut html = clean(&doc);
    // Unwrapping divs can leave nesting the parser restructures on the way
    // back in (a heading inside a heading), so reparse until stable.
    for round in 1..=MAX_REPARSES {
        let again = Document::from(html.as_str());
        let next = clean(&again);
        if next == html {
            break;
        }
        tracing::trace!(round, "normalize.reparse");
        doc = again;
        html = next;
    }

    NormalizedDocument {
        head: collapse_whitespace(&doc.select("head").text()),
        body: collapse_whitespace(&doc.select("body").text()),
        html,
    }
}

/// Run the cleaning steps in place and return the collapsed serialization.
fn clean(doc: &Document) -> String {
    remove_comments(doc);
    remove_noise(doc);
    doc.select("*").remove_all_attrs();
    let passes = remove_empty_elements(doc);
    doc.select("html").strip_elements(&["div"]);
    tracing::trace!(passes, "normalize.empty_sweep");
    collapse_whitespace(&doc.html())
}

/// Drop every comment node anywhere in the tree.
pub(crate) fn remove_comments(doc: &Document) {
    let comments: Vec<NodeRef> = doc
        .root()
        .descendants()
        .into_iter()
        .filter(|n| n.is_comment())
        .collect();
    for node in comments {
        node.remove_from_parent();
    }
}

/// Drop every element listed in [`NOISE_TAGS`].
pub(crate) fn remove_noise(doc: &Document) {
    doc.select(&NOISE_TAGS.join(", ")).remove();
}

/// Remove elements without element children and without text, repeating
/// until a pass removes nothing. Returns the number of passes that removed
/// something.
fn remove_empty_elements(doc: &Document) -> usize {
    let mut passes = 0;
    loop {
        let empties: Vec<NodeRef> = doc
            .root()
            .descendants()
            .into_iter()
            .filter(|n| is_empty_leaf(n))
            .collect();
        if empties.is_empty() {
            return passes;
        }
        for node in empties {
            node.remove_from_parent();
        }
        passes += 1;
    }
}

fn is_empty_leaf(node: &NodeRef) -> bool {
    if !node.is_element() {
        return false;
    }
    let is_scaffold = node
        .node_name()
        .is_some_and(|name| SCAFFOLD_TAGS.iter().any(|t| name.eq_ignore_ascii_case(t)));
    if is_scaffold {
        return false;
    }
    let has_element_child = node.children().iter().any(|c| c.is_element());
    !has_element_child && node.text().trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_empty_document() {
        assert_eq!(normalize(""), NormalizedDocument::default());
        assert_eq!(normalize(" \n\t "), NormalizedDocument::default());
    }

    #[test]
    fn strips_noise_and_attributes() {
        let raw = r#"<!DOCTYPE html>
            <html lang="en">
              <head>
                <title>Story | Daily</title>
                <meta name="description" content="x">
                <link rel="stylesheet" href="a.css">
                <style>body { color: red }</style>
              </head>
              <body class="page">
                <!-- tracking pixel -->
                <nav><a href="/">Home</a></nav>
                <article id="main" style="margin:0">
                  <h1 class="headline">Story</h1>
                  <p data-x="1">First <b>para</b>.</p>
                  <img src="a.png">
                  <button>Share</button>
                </article>
                <script>window.ads = 1;</script>
                <footer>Copyright</footer>
              </body>
            </html>"#;
        let doc = normalize(raw);

        assert!(!doc.html.contains("<script"));
        assert!(!doc.html.contains("<style"));
        assert!(!doc.html.contains("<!--"));
        assert!(!doc.html.contains("<img"));
        assert!(!doc.html.contains("<nav"));
        assert!(!doc.html.contains("<footer"));
        assert!(!doc.html.contains("class="));
        assert!(!doc.html.contains("id="));
        assert!(!doc.html.contains("lang="));
        assert!(doc.html.contains("<h1>Story</h1>"));
        assert!(doc.html.contains("<p>First <b>para</b>.</p>"));
        assert_eq!(doc.head, "Story | Daily");
        assert_eq!(doc.body, "Story First para.");
    }

    #[test]
    fn nested_empty_divs_vanish() {
        let doc = normalize("<div><div><div> </div></div><div></div></div>");
        assert_eq!(doc.body, "");
        assert!(doc.html.contains("<body></body>"));
    }

    #[test]
    fn emptiness_propagates_upwards() {
        let doc = normalize("<section><p><span><img src=x></span></p></section><p>kept</p>");
        assert!(!doc.html.contains("<section>"));
        assert!(!doc.html.contains("<span>"));
        assert!(doc.html.contains("<p>kept</p>"));
    }

    #[test]
    fn divs_are_unwrapped_in_order() {
        let doc = normalize("<div class=a><p>one</p><div><p>two</p></div></div><p>three</p>");
        assert!(doc.html.contains("<body><p>one</p><p>two</p><p>three</p></body>"));
    }

    #[test]
    fn whitespace_is_collapsed() {
        let doc = normalize("<p>a\n\n   b</p>\n\n<p>c</p>");
        assert!(!doc.html.contains('\n'));
        assert!(!doc.html.contains("  "));
        assert!(doc.html.contains("<p>a b</p> <p>c</p>"));
        assert_eq!(doc.body, "a b c");
    }

    #[test]
    fn idempotent_on_own_output() {
        let raw = "<html><head><title>T</title><script>1</script></head>\
                   <body><div id=x><p>Hello <em>world</em></p><div></div>\
                   <ul><li>a</li><li> </li></ul><table><tr><td>c</td></tr></table></div></body></html>";
        let once = normalize(raw);
        let twice = normalize(&once.html);
        assert_eq!(once.html, twice.html);
        assert_eq!(once.body, twice.body);
        assert_eq!(once.head, twice.head);
    }

    #[test]
    fn unwrapped_nesting_reaches_a_fixpoint() {
        let raw = "<h1>Title<div><h2>Sub</h2></div></h1><p>x</p>";
        let once = normalize(raw);
        let twice = normalize(&once.html);
        assert_eq!(once.html, twice.html);
        assert!(once.html.contains("<h1>Title</h1><h2>Sub</h2>"));
    }

    #[test]
    fn malformed_markup_is_repaired() {
        let doc = normalize("<p>unclosed <b>bold <i>both</p> trailing </div></span>");
        assert!(doc.body.contains("unclosed"));
        assert!(doc.body.contains("trailing"));
    }
}
