//! Hostname → extractor lookup.

use std::sync::LazyLock;

use url::Url;

use crate::extractors::ExtractorKind;

/// Registered publisher domains. A host matches a domain when it equals it or
/// is a subdomain of it (`edition.cnn.com` → `cnn.com`).
static HOSTS: LazyLock<Vec<(&'static str, ExtractorKind)>> = LazyLock::new(|| {
    vec![
        ("cnn.com", ExtractorKind::Cnn),
        ("foxnews.com", ExtractorKind::FoxNews),
        ("theguardian.com", ExtractorKind::Guardian),
        ("guardian.co.uk", ExtractorKind::Guardian),
        ("npr.org", ExtractorKind::Npr),
    ]
});

/// Pick the extractor for `url`. Unknown hosts and unparsable URLs get
/// [`ExtractorKind::Generic`].
pub fn select(url: &str) -> ExtractorKind {
    match hostname(url) {
        Some(host) => select_host(&host),
        None => {
            tracing::debug!(url, "registry.unparsable_url");
            ExtractorKind::Generic
        }
    }
}

/// Pick the extractor for a bare hostname.
pub fn select_host(host: &str) -> ExtractorKind {
    let host = host.trim().trim_end_matches('.').to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    HOSTS
        .iter()
        .find(|(domain, _)| {
            host == *domain
                || host
                    .strip_suffix(domain)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
        .map(|(_, kind)| *kind)
        .unwrap_or(ExtractorKind::Generic)
}

/// Lower-cased hostname of `url`, if it parses and has one.
pub fn hostname(url: &str) -> Option<String> {
    Url::parse(url.trim())
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_hosts_and_subdomains() {
        assert_eq!(select("https://www.cnn.com/2024/03/05/x"), ExtractorKind::Cnn);
        assert_eq!(select("https://edition.cnn.com/a"), ExtractorKind::Cnn);
        assert_eq!(select("https://WWW.FOXNEWS.COM/politics/x"), ExtractorKind::FoxNews);
        assert_eq!(select("https://www.theguardian.com/world/x"), ExtractorKind::Guardian);
        assert_eq!(select("https://www.npr.org/2024/03/05/x"), ExtractorKind::Npr);
    }

    #[test]
    fn lookalikes_fall_back_to_generic() {
        assert_eq!(select("https://notcnn.com/a"), ExtractorKind::Generic);
        assert_eq!(select("https://cnn.com.evil.example/a"), ExtractorKind::Generic);
        assert_eq!(select("https://example.org"), ExtractorKind::Generic);
    }

    #[test]
    fn unparsable_urls_are_generic() {
        assert_eq!(select("not a url"), ExtractorKind::Generic);
        assert_eq!(select(""), ExtractorKind::Generic);
        assert_eq!(select("file:///tmp/page.html"), ExtractorKind::Generic);
    }
}
