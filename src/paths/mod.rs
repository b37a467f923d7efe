//! Href computation between mirrored pages
//!
//! A closed set of strategies replaces dynamic dispatch: given a source
//! context and an optional target context, exactly one of `Intra`,
//! `Inter`, or `External` applies. Predicates are evaluated in that
//! order; external is the fallback when the target is unknown, never the
//! first check, so internal links cannot be misclassified as external.
//!
//! Everything here is purely functional over immutable contexts. Path
//! computation uses the precomputed `path_segments` snapshot; rebuilding
//! segments from parent links is the hierarchy's job and only works
//! before a serialization boundary.

pub mod anchors;

pub use anchors::{BlockAnchorCache, fallback_anchor};

use crate::hierarchy::PageContext;

/// Link resolution strategies, in evaluation priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStrategy {
    /// Source and target are the same page: fragment-only link
    Intra,
    /// Distinct internal pages: relative filesystem path
    Inter,
    /// Target unknown to the mirror: keep the original URL
    External,
}

/// Optional inputs carried alongside the (source, target) pair
#[derive(Debug, Default, Clone, Copy)]
pub struct ResolveOptions<'a> {
    /// URL as it appeared in the document, for the external fallback
    pub original_url: Option<&'a str>,
    /// Block-level anchor id to append as a fragment
    pub block_id: Option<&'a str>,
}

impl PathStrategy {
    pub const PRIORITY: [PathStrategy; 3] = [Self::Intra, Self::Inter, Self::External];

    #[must_use]
    pub fn supports(self, source: &PageContext, target: Option<&PageContext>) -> bool {
        match self {
            Self::Intra => target.is_some_and(|t| t.id == source.id),
            Self::Inter => target.is_some_and(|t| !t.id.is_empty() && t.id != source.id),
            Self::External => target.is_none_or(|t| t.id.is_empty()),
        }
    }

    /// Compute the href for a pair this strategy supports
    ///
    /// `None` means "leave the link alone": an external target with no
    /// recorded URL has nothing to rewrite to.
    #[must_use]
    pub fn resolve(
        self,
        source: &PageContext,
        target: Option<&PageContext>,
        options: ResolveOptions<'_>,
        anchors: &mut BlockAnchorCache,
    ) -> Option<String> {
        match self {
            Self::Intra => {
                let target = target?;
                match options.block_id {
                    Some(block) => Some(format!("#{}", anchors.format(&target.id, block))),
                    None => Some("#".to_string()),
                }
            }
            Self::Inter => {
                let target = target?;
                let mut href =
                    relative_path_between(&source.path_segments, &target.path_segments);
                if let Some(block) = options.block_id {
                    href.push('#');
                    href.push_str(&anchors.format(&target.id, block));
                }
                Some(href)
            }
            Self::External => options.original_url.map(str::to_string),
        }
    }
}

/// Resolve one href by trying each strategy in priority order
#[must_use]
pub fn resolve_href(
    source: &PageContext,
    target: Option<&PageContext>,
    options: ResolveOptions<'_>,
    anchors: &mut BlockAnchorCache,
) -> Option<String> {
    PathStrategy::PRIORITY
        .iter()
        .find(|s| s.supports(source, target))
        .and_then(|s| s.resolve(source, target, options, anchors))
}

/// Relative path from one page's document to another's
///
/// Both pages render as `<segments>/index.html`, so the link resolves
/// against the source's directory: climb out of the segments below the
/// longest common prefix, then descend the target's remainder.
#[must_use]
pub fn relative_path_between(source: &[String], target: &[String]) -> String {
    let common = source
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let ups = source.len() - common;

    let mut href = String::new();
    for _ in 0..ups {
        href.push_str("../");
    }
    for seg in &target[common..] {
        href.push_str(seg);
        href.push('/');
    }
    href.push_str("index.html");
    href
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(id: &str, segments: &[&str]) -> PageContext {
        let mut ctx = PageContext::root(id.to_string(), format!("https://ws.example/{id}"));
        ctx.depth = segments.len() as u32;
        ctx.path_segments = segments.iter().map(|s| (*s).to_string()).collect();
        ctx
    }

    #[test]
    fn root_to_child() {
        assert_eq!(
            relative_path_between(&[], &["Lab1".into()]),
            "Lab1/index.html"
        );
    }

    #[test]
    fn child_to_root() {
        assert_eq!(relative_path_between(&["Lab1".into()], &[]), "../index.html");
    }

    #[test]
    fn sibling_to_sibling() {
        assert_eq!(
            relative_path_between(&["Lab1".into()], &["Lab2".into()]),
            "../Lab2/index.html"
        );
    }

    #[test]
    fn deep_to_root_and_section() {
        let deep: Vec<String> = ["Section", "Subsection", "Deep"]
            .iter()
            .map(|s| (*s).to_string())
            .collect();
        assert_eq!(relative_path_between(&deep, &[]), "../../../index.html");
        assert_eq!(
            relative_path_between(&deep, &["Section".into()]),
            "../../index.html"
        );
    }

    #[test]
    fn cousins_across_branches() {
        let a: Vec<String> = vec!["BranchA".into(), "LeafA".into()];
        let b: Vec<String> = vec!["BranchB".into(), "LeafB".into()];
        assert_eq!(relative_path_between(&a, &b), "../../BranchB/LeafB/index.html");
    }

    #[test]
    fn strategy_priority_prefers_internal() {
        let mut anchors = BlockAnchorCache::default();
        let src = page("a", &["A"]);
        let tgt = page("b", &["B"]);
        let options = ResolveOptions {
            original_url: Some("https://ws.example/b"),
            ..Default::default()
        };

        // Target known: relative path wins over the original URL
        assert_eq!(
            resolve_href(&src, Some(&tgt), options, &mut anchors),
            Some("../B/index.html".to_string())
        );
        // Target unknown: original URL survives unchanged
        assert_eq!(
            resolve_href(&src, None, options, &mut anchors),
            Some("https://ws.example/b".to_string())
        );
        // Unknown target with no URL: nothing to rewrite
        assert_eq!(
            resolve_href(&src, None, ResolveOptions::default(), &mut anchors),
            None
        );
    }

    #[test]
    fn same_page_yields_fragment() {
        let mut anchors = BlockAnchorCache::default();
        let src = page("a", &["A"]);
        let options = ResolveOptions {
            block_id: Some("0123-4567"),
            ..Default::default()
        };
        assert_eq!(
            resolve_href(&src, Some(&src.clone()), options, &mut anchors),
            Some("#01234567".to_string())
        );
        assert_eq!(
            resolve_href(&src, Some(&src.clone()), ResolveOptions::default(), &mut anchors),
            Some("#".to_string())
        );
    }

    #[test]
    fn cross_page_anchor_appended() {
        let mut anchors = BlockAnchorCache::default();
        let src = page("a", &["A"]);
        let tgt = page("b", &["B"]);
        let options = ResolveOptions {
            block_id: Some("de-ad-be-ef"),
            ..Default::default()
        };
        assert_eq!(
            resolve_href(&src, Some(&tgt), options, &mut anchors),
            Some("../B/index.html#deadbeef".to_string())
        );
    }
}
