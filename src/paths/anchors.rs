//! Block anchor formatting with a per-page mapping cache
//!
//! Pages can publish a block id → anchor slug map after rendering; links
//! into such a page use the published slug. For pages without a map (not
//! yet rendered, or no named anchors) the fallback formatter produces the
//! canonical form of the raw block id.

use std::collections::HashMap;
use std::num::NonZeroUsize;

use lru::LruCache;

const DEFAULT_CACHE_PAGES: usize = 256;

/// Canonical anchor form of a raw block id: alphanumerics only
///
/// Dashed and bare forms of the same id collapse to one fragment, so a
/// link written against either form lands on the same element.
#[must_use]
pub fn fallback_anchor(block_id: &str) -> String {
    block_id.chars().filter(char::is_ascii_alphanumeric).collect()
}

/// Bounded cache of per-target-page anchor maps
#[derive(Debug)]
pub struct BlockAnchorCache {
    pages: LruCache<String, HashMap<String, String>>,
}

impl Default for BlockAnchorCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_PAGES)
    }
}

impl BlockAnchorCache {
    #[must_use]
    pub fn new(max_pages: usize) -> Self {
        let cap = NonZeroUsize::new(max_pages.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            pages: LruCache::new(cap),
        }
    }

    /// Publish a rendered page's block id → anchor slug map
    pub fn insert_page_map(&mut self, page_id: &str, map: HashMap<String, String>) {
        self.pages.put(page_id.to_string(), map);
    }

    /// Format a block id for a link targeting `page_id`
    ///
    /// Uses the page's published map when one is cached, falling back to
    /// [`fallback_anchor`]. The fallback also covers ids missing from a
    /// published map.
    pub fn format(&mut self, page_id: &str, block_id: &str) -> String {
        if let Some(map) = self.pages.get(page_id) {
            if let Some(slug) = map.get(block_id).or_else(|| map.get(&fallback_anchor(block_id))) {
                return slug.clone();
            }
        }
        fallback_anchor(block_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_strips_punctuation() {
        assert_eq!(fallback_anchor("ab-cd_ef.12"), "abcdef12");
        assert_eq!(fallback_anchor(""), "");
    }

    #[test]
    fn published_map_wins_over_fallback() {
        let mut cache = BlockAnchorCache::new(4);
        let mut map = HashMap::new();
        map.insert("deadbeef".to_string(), "setup-notes".to_string());
        cache.insert_page_map("page1", map);

        assert_eq!(cache.format("page1", "dead-beef"), "setup-notes");
        assert_eq!(cache.format("page1", "unknown"), "unknown");
        assert_eq!(cache.format("page2", "dead-beef"), "deadbeef");
    }

    #[test]
    fn cache_evicts_least_recently_used_page() {
        let mut cache = BlockAnchorCache::new(1);
        cache.insert_page_map("one", HashMap::from([("x".into(), "anchor-x".into())]));
        cache.insert_page_map("two", HashMap::new());

        // "one" was evicted, so its published slug is gone
        assert_eq!(cache.format("one", "x"), "x");
    }
}
