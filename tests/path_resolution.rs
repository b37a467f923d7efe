//! Relative href computation over literal hierarchies

use pagevault::engine::DiscoveredLink;
use pagevault::hierarchy::{PageContext, PageHierarchy};
use pagevault::paths::{BlockAnchorCache, ResolveOptions, resolve_href};

fn page_url(slug: &str, hex: &str) -> String {
    format!("https://ws.example/{slug}-{hex}")
}

fn link(slug: &str, hex: &str, title: &str) -> DiscoveredLink {
    DiscoveredLink {
        url: page_url(slug, hex),
        title: title.to_string(),
    }
}

fn resolve(source: &PageContext, target: &PageContext) -> String {
    let mut anchors = BlockAnchorCache::default();
    resolve_href(source, Some(target), ResolveOptions::default(), &mut anchors)
        .expect("internal pair resolves")
}

struct Fixture {
    hierarchy: PageHierarchy,
    root: String,
}

impl Fixture {
    fn new() -> Self {
        let mut hierarchy = PageHierarchy::new();
        let root = hierarchy
            .register_root(&page_url("Root", "00000000000000000000000000000000"))
            .expect("root");
        Self { hierarchy, root }
    }

    fn add(&mut self, parent: &str, slug: &str, hex: &str, title: &str) -> String {
        self.hierarchy
            .register_link(parent, &link(slug, hex, title))
            .expect("register")
            .id()
            .to_string()
    }

    fn ctx(&self, id: &str) -> PageContext {
        self.hierarchy.get(id).expect("context").clone()
    }
}

#[test]
fn root_and_sibling_hops() {
    let mut f = Fixture::new();
    let lab1 = f.add(&f.root.clone(), "Lab1", "11111111111111111111111111111111", "Lab1");
    let lab2 = f.add(&f.root.clone(), "Lab2", "22222222222222222222222222222222", "Lab2");

    let root = f.ctx(&f.root);
    let lab1 = f.ctx(&lab1);
    let lab2 = f.ctx(&lab2);

    assert_eq!(resolve(&root, &lab1), "Lab1/index.html");
    assert_eq!(resolve(&lab1, &root), "../index.html");
    assert_eq!(resolve(&lab1, &lab2), "../Lab2/index.html");
}

#[test]
fn deep_hierarchy_climbs() {
    let mut f = Fixture::new();
    let section = f.add(&f.root.clone(), "S", "11111111111111111111111111111111", "Section");
    let subsection = f.add(&section, "Sub", "22222222222222222222222222222222", "Subsection");
    let deep = f.add(&subsection, "D", "33333333333333333333333333333333", "Deep");

    let root = f.ctx(&f.root);
    let section = f.ctx(&section);
    let deep = f.ctx(&deep);

    assert_eq!(resolve(&deep, &root), "../../../index.html");
    assert_eq!(resolve(&deep, &section), "../../index.html");
}

#[test]
fn cousins_across_branches() {
    let mut f = Fixture::new();
    let branch_a = f.add(&f.root.clone(), "BA", "11111111111111111111111111111111", "BranchA");
    let branch_b = f.add(&f.root.clone(), "BB", "22222222222222222222222222222222", "BranchB");
    let leaf_a = f.add(&branch_a, "LA", "33333333333333333333333333333333", "LeafA");
    let leaf_b = f.add(&branch_b, "LB", "44444444444444444444444444444444", "LeafB");

    let leaf_a = f.ctx(&leaf_a);
    let leaf_b = f.ctx(&leaf_b);
    assert_eq!(resolve(&leaf_a, &leaf_b), "../../BranchB/LeafB/index.html");
}

#[test]
fn contexts_survive_serialization_without_parents() {
    let mut f = Fixture::new();
    let section = f.add(&f.root.clone(), "S", "11111111111111111111111111111111", "Section");
    let page = f.add(&section, "P", "22222222222222222222222222222222", "Page");

    let live_root = f.ctx(&f.root);
    let live_page = f.ctx(&page);
    let before = resolve(&live_page, &live_root);

    // Round-trip through JSON: the parent reference is an id, not a live
    // link, and the segment snapshot must come back intact
    let encoded = serde_json::to_string(&live_page).expect("serialize");
    let revived: PageContext = serde_json::from_str(&encoded).expect("deserialize");
    assert_eq!(revived.path_segments, vec!["Section".to_string(), "Page".to_string()]);

    let revived_root: PageContext =
        serde_json::from_str(&serde_json::to_string(&live_root).expect("serialize"))
            .expect("deserialize");
    assert_eq!(resolve(&revived, &revived_root), before);
}
