//! Page identity extraction and URL normalization
//!
//! Workspace page URLs end in a slugged name followed by a 32-hex content
//! identifier, either bare (`...-0123456789abcdef0123456789abcdef`) or in
//! dashed UUID form. The identifier is the page's stable identity; the
//! slug and host casing are presentation noise.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;
use xxhash_rust::xxh3::xxh3_64;

// Static patterns, compiled once
static BARE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9a-fA-F]{32})(?:[^0-9a-fA-F]|$)").expect("static page id pattern")
});

static DASHED_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"([0-9a-fA-F]{8})-([0-9a-fA-F]{4})-([0-9a-fA-F]{4})-([0-9a-fA-F]{4})-([0-9a-fA-F]{12})",
    )
    .expect("static dashed id pattern")
});

/// Extract the stable 32-hex page identity from a URL, if present
///
/// The last match in the URL wins: slugs occasionally contain hex runs,
/// but the identity always trails the path.
#[must_use]
pub fn extract_page_id(url: &str) -> Option<String> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);

    if let Some(caps) = DASHED_ID.captures_iter(without_query).last() {
        let joined: String = (1..=5)
            .filter_map(|i| caps.get(i))
            .map(|m| m.as_str())
            .collect();
        return Some(joined.to_lowercase());
    }

    BARE_ID
        .captures_iter(without_query)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
}

/// Derive an identity for a URL, falling back to a content hash when the
/// URL carries no recognizable page id
#[must_use]
pub fn page_identity(url: &str) -> String {
    extract_page_id(url).unwrap_or_else(|| format!("u{:016x}", xxh3_64(normalize_url(url).as_bytes())))
}

/// Normalize a URL for duplicate detection during discovery
///
/// Drops the fragment, lowercases the host, and trims the trailing slash.
/// Variants that still normalize differently for the same page are the
/// conflict resolver's problem, by policy.
#[must_use]
pub fn normalize_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            let mut s = parsed.to_string();
            while s.ends_with('/') && parsed.path() != "/" {
                s.pop();
            }
            if parsed.path() == "/" && s.ends_with('/') {
                s.pop();
            }
            s
        }
        Err(_) => url.trim_end_matches('/').to_string(),
    }
}

/// Whether a link stays inside the crawled workspace
#[must_use]
pub fn is_in_graph(url: &str, workspace_host: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https")
                && parsed
                    .host_str()
                    .is_some_and(|h| h.eq_ignore_ascii_case(workspace_host))
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_bare_and_dashed_ids() {
        assert_eq!(
            extract_page_id("https://ws.example/My-Page-0123456789abcdef0123456789ABCDEF"),
            Some("0123456789abcdef0123456789abcdef".to_string())
        );
        assert_eq!(
            extract_page_id("https://ws.example/p/01234567-89ab-cdef-0123-456789abcdef"),
            Some("0123456789abcdef0123456789abcdef".to_string())
        );
        assert_eq!(extract_page_id("https://ws.example/plain-page"), None);
    }

    #[test]
    fn query_and_fragment_do_not_leak_ids() {
        assert_eq!(
            extract_page_id("https://ws.example/page?v=0123456789abcdef0123456789abcdef"),
            None
        );
    }

    #[test]
    fn normalization_strips_fragment_and_case() {
        assert_eq!(
            normalize_url("https://WS.Example/Page-abc/#frag"),
            normalize_url("https://ws.example/Page-abc")
        );
    }

    #[test]
    fn hash_identity_is_stable() {
        let a = page_identity("https://ws.example/no-id-here");
        let b = page_identity("https://ws.example/no-id-here#section");
        assert_eq!(a, b);
        assert!(a.starts_with('u'));
    }
}
