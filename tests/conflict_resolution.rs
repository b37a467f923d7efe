//! Conflict resolver closure and survivor-selection properties

use proptest::prelude::*;

use pagevault::hierarchy::{PageContext, TitleRegistry};
use pagevault::resolver::resolve_conflicts;

fn ctx(id: &str, depth: u32, segments: Vec<String>) -> PageContext {
    let mut c = PageContext::root(id.to_string(), format!("https://ws.example/{id}"));
    c.depth = depth;
    c.path_segments = segments;
    if depth > 0 {
        c.parent_id = Some("p".to_string());
    }
    c
}

#[test]
fn duplicates_collapse_to_min_depth_survivor() {
    let contexts = vec![
        ctx("a", 2, vec!["X".into(), "A".into()]),
        ctx("a", 1, vec!["A".into()]),
        ctx("b", 1, vec!["B".into()]),
    ];
    let registry = TitleRegistry::new();
    let resolution = resolve_conflicts(contexts.iter(), &registry);

    assert_eq!(resolution.canonical.len(), 2);
    assert_eq!(resolution.rewrite_map["a"], "A/index.html");
    assert_eq!(resolution.rewrite_map["b"], "B/index.html");
    assert_eq!(resolution.stats.conflicted, 1);
    assert_eq!(resolution.stats.discarded, 1);
}

#[test]
fn inputs_are_not_mutated() {
    let contexts = vec![ctx("a", 1, vec!["A".into()]), ctx("a", 3, vec!["Z".into()])];
    let mut registry = TitleRegistry::new();
    registry.resolve("a", "Title A");

    let snapshot = contexts.clone();
    let resolution = resolve_conflicts(contexts.iter(), &registry);

    assert_eq!(contexts, snapshot);
    assert_eq!(resolution.canonical["a"].title.as_deref(), Some("Title A"));
    assert!(contexts[0].title.is_none());
}

fn arb_context() -> impl Strategy<Value = PageContext> {
    (
        0..6u32,
        0..8u32,
        prop::collection::vec("[A-Za-z][A-Za-z0-9_]{0,6}", 0..4),
    )
        .prop_map(|(id, depth, segments)| ctx(&format!("id{id}"), depth, segments))
}

proptest! {
    /// Every identity in the input, survivor or discard, is keyed in the
    /// rewrite map, and the mapped path is the survivor's resolved path.
    #[test]
    fn rewrite_map_is_closed_over_input(contexts in prop::collection::vec(arb_context(), 1..24)) {
        let registry = TitleRegistry::new();
        let resolution = resolve_conflicts(contexts.iter(), &registry);

        for c in &contexts {
            let path = resolution.rewrite_map.get(&c.id);
            prop_assert!(path.is_some(), "identity {} missing from rewrite map", c.id);
            let survivor = &resolution.canonical[&c.id];
            prop_assert_eq!(path.expect("checked"), &survivor.relative_path());
        }
        for id in resolution.canonical.keys() {
            prop_assert!(resolution.rewrite_map.contains_key(id));
        }
    }

    /// The survivor is never deeper than any context sharing its identity.
    #[test]
    fn survivor_depth_is_minimal(contexts in prop::collection::vec(arb_context(), 1..24)) {
        let registry = TitleRegistry::new();
        let resolution = resolve_conflicts(contexts.iter(), &registry);

        for c in &contexts {
            let survivor = &resolution.canonical[&c.id];
            prop_assert!(survivor.depth <= c.depth);
        }
    }
}
