//! Conflict resolution between the discover and download phases
//!
//! Discovery can reach the same page identity through several URLs and
//! record several contexts for it. Before anything is written to disk,
//! each identity must collapse to exactly one canonical context so the
//! mirror contains one file per page and every rewritten link points at
//! it. The survivor is the context closest to the root; at equal depth
//! the earliest-discovered wins, which keeps resolution deterministic
//! across runs of the same workspace.

use std::collections::HashMap;

use crate::hierarchy::{PageContext, TitleRegistry};

/// Output of one resolution pass
#[derive(Debug)]
pub struct ConflictResolution {
    /// Identity → surviving context, titles filled from the registry
    pub canonical: HashMap<String, PageContext>,
    /// Identity → mirror-relative path of the survivor
    ///
    /// Closed over the input: every identity seen during discovery is a
    /// key here, so link rewriting never needs a fallback lookup.
    pub rewrite_map: HashMap<String, String>,
    pub stats: ResolutionStats,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionStats {
    /// Distinct identities seen
    pub identities: usize,
    /// Identities that had more than one context
    pub conflicted: usize,
    /// Contexts discarded in favor of a survivor
    pub discarded: usize,
}

/// Collapse every identity to one canonical context
///
/// Input order is discovery order; it is the tie-breaker for contexts at
/// equal depth. Inputs are not mutated; the canonical contexts are fresh
/// clones with registry titles applied.
pub fn resolve_conflicts<'a, I>(contexts: I, registry: &TitleRegistry) -> ConflictResolution
where
    I: IntoIterator<Item = &'a PageContext>,
{
    // One pass keeps first-at-min-depth as survivor without sorting
    let mut survivors: HashMap<String, &PageContext> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    let mut total = 0usize;
    let mut conflicted_ids: HashMap<String, usize> = HashMap::new();

    for ctx in contexts {
        total += 1;
        match survivors.get(&ctx.id) {
            None => {
                order.push(ctx.id.clone());
                survivors.insert(ctx.id.clone(), ctx);
            }
            Some(current) => {
                *conflicted_ids.entry(ctx.id.clone()).or_insert(1) += 1;
                if ctx.depth < current.depth {
                    survivors.insert(ctx.id.clone(), ctx);
                }
            }
        }
    }

    let mut canonical = HashMap::with_capacity(survivors.len());
    let mut rewrite_map = HashMap::with_capacity(survivors.len());
    for id in &order {
        let Some(survivor) = survivors.get(id) else {
            continue;
        };
        let mut ctx = (*survivor).clone();
        if ctx.title.is_none() {
            if let Some(title) = registry.get(id) {
                ctx.resolve_title(title);
            }
        }
        rewrite_map.insert(id.clone(), ctx.relative_path());
        canonical.insert(id.clone(), ctx);
    }

    let stats = ResolutionStats {
        identities: order.len(),
        conflicted: conflicted_ids.len(),
        discarded: total - order.len(),
    };
    log::info!(
        "conflict resolution: {} identities, {} conflicted, {} contexts discarded",
        stats.identities,
        stats.conflicted,
        stats.discarded
    );

    ConflictResolution {
        canonical,
        rewrite_map,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(id: &str, depth: u32, segments: &[&str]) -> PageContext {
        let mut c = PageContext::root(id.to_string(), format!("https://ws.example/{id}"));
        c.depth = depth;
        c.path_segments = segments.iter().map(|s| (*s).to_string()).collect();
        if depth > 0 {
            c.parent_id = Some("parent".to_string());
        }
        c
    }

    #[test]
    fn shallower_context_survives() {
        let shallow = ctx("a", 1, &["Top"]);
        let deep = ctx("a", 3, &["Top", "Mid", "Leaf"]);
        let resolution = resolve_conflicts([&deep, &shallow], &TitleRegistry::new());

        let survivor = resolution.canonical.get("a").expect("survivor");
        assert_eq!(survivor.depth, 1);
        assert_eq!(resolution.rewrite_map["a"], "Top/index.html");
        assert_eq!(resolution.stats.discarded, 1);
        assert_eq!(resolution.stats.conflicted, 1);
    }

    #[test]
    fn equal_depth_keeps_first_discovered() {
        let first = ctx("a", 2, &["X", "First"]);
        let second = ctx("a", 2, &["Y", "Second"]);
        let resolution = resolve_conflicts([&first, &second], &TitleRegistry::new());

        assert_eq!(resolution.rewrite_map["a"], "X/First/index.html");
    }

    #[test]
    fn rewrite_map_covers_every_identity() {
        let a1 = ctx("a", 1, &["A"]);
        let a2 = ctx("a", 2, &["B", "A"]);
        let b = ctx("b", 1, &["B"]);
        let c = ctx("c", 0, &[]);
        let resolution = resolve_conflicts([&a1, &a2, &b, &c], &TitleRegistry::new());

        for id in ["a", "b", "c"] {
            assert!(resolution.rewrite_map.contains_key(id), "missing {id}");
        }
        assert_eq!(resolution.rewrite_map["c"], "index.html");
    }

    #[test]
    fn registry_title_fills_untitled_survivor() {
        let mut registry = TitleRegistry::new();
        registry.resolve("a", "Resolved Title");
        let untitled = ctx("a", 1, &["A"]);
        let resolution = resolve_conflicts([&untitled], &registry);

        assert_eq!(
            resolution.canonical["a"].title.as_deref(),
            Some("Resolved Title")
        );
    }
}
