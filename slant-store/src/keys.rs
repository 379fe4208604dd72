//! Storage keys derived from a page URL.
//!
//! The base key is the URL with its fragment dropped, percent-encoded as a
//! form component so every key is a flat ASCII string. Derived keys:
//!
//! | key                              | holds                     |
//! |----------------------------------|---------------------------|
//! | `<url>`                          | quick-parse record        |
//! | `<url>_detailed`                 | detailed-analysis record  |
//! | `quick_parse_state_<url>`        | phase-1 state             |
//! | `detailed_analysis_state_<url>`  | phase-2 state             |

use url::{form_urlencoded, Url};

const DETAILED_SUFFIX: &str = "_detailed";
const QUICK_STATE_PREFIX: &str = "quick_parse_state_";
const DETAILED_STATE_PREFIX: &str = "detailed_analysis_state_";

/// Canonical URL: parsed, fragment removed. Unparsable input is only trimmed.
pub fn normalize_url(url: &str) -> String {
    match Url::parse(url.trim()) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.trim().to_string(),
    }
}

pub fn url_key(url: &str) -> String {
    form_urlencoded::byte_serialize(normalize_url(url).as_bytes()).collect()
}

pub fn detailed_key(url: &str) -> String {
    format!("{}{DETAILED_SUFFIX}", url_key(url))
}

pub fn quick_state_key(url: &str) -> String {
    format!("{QUICK_STATE_PREFIX}{}", url_key(url))
}

pub fn detailed_state_key(url: &str) -> String {
    format!("{DETAILED_STATE_PREFIX}{}", url_key(url))
}

/// Every key persisted for `url`.
pub fn all_keys(url: &str) -> Vec<String> {
    vec![
        url_key(url),
        detailed_key(url),
        quick_state_key(url),
        detailed_state_key(url),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_is_ignored() {
        assert_eq!(
            url_key("https://example.com/a?b=1#comments"),
            url_key("https://example.com/a?b=1")
        );
    }

    #[test]
    fn keys_are_flat_ascii() {
        let key = url_key("https://example.com/a b?q=ü");
        assert!(key.is_ascii());
        assert!(!key.contains('/'));
        assert!(!key.contains('?'));
    }

    #[test]
    fn derived_keys_share_the_base() {
        let url = "https://example.com/story";
        let base = url_key(url);
        assert_eq!(base, "https%3A%2F%2Fexample.com%2Fstory");
        assert_eq!(detailed_key(url), format!("{base}_detailed"));
        assert_eq!(quick_state_key(url), format!("quick_parse_state_{base}"));
        assert_eq!(detailed_state_key(url), format!("detailed_analysis_state_{base}"));
        assert_eq!(all_keys(url).len(), 4);
    }

    #[test]
    fn unparsable_url_still_yields_a_key() {
        assert_eq!(url_key("  not a url "), "not+a+url");
    }
}
