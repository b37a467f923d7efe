//! Page hierarchy arena and identity handling
//!
//! Contexts are owned by an id-keyed map; parent/child relations are id
//! lookups rather than references, so registering and serializing never
//! fight over ownership and nothing cyclic exists to leak. Duplicate
//! identities reached through new URLs are recorded on the side for the
//! conflict resolver instead of being re-crawled.

pub mod context;
pub mod page_id;
pub mod registry;
pub mod sanitize;

pub use context::PageContext;
pub use page_id::{extract_page_id, is_in_graph, normalize_url, page_identity};
pub use registry::TitleRegistry;
pub use sanitize::sanitize_segment;

use std::collections::HashMap;

use crate::engine::DiscoveredLink;

/// Outcome of registering one discovered link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// Previously-unseen identity; a new context was created and should be
    /// queued for discovery at the next depth level
    New(String),
    /// URL already registered; linked to the parent, nothing new to crawl
    AlreadyKnown(String),
    /// New URL for an already-registered identity; a duplicate context was
    /// recorded for the conflict resolver, nothing queued
    Duplicate(String),
}

impl Registration {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::New(id) | Self::AlreadyKnown(id) | Self::Duplicate(id) => id,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HierarchyError {
    #[error("root already registered")]
    RootAlreadyRegistered,
    #[error("unknown parent page `{0}`")]
    UnknownParent(String),
}

/// Arena of discovered page contexts, keyed by page identity
#[derive(Debug, Default)]
pub struct PageHierarchy {
    nodes: HashMap<String, PageContext>,
    /// Registration order of canonical contexts
    order: Vec<String>,
    /// Normalized URL → id, the discovery-time duplicate gate
    by_url: HashMap<String, String>,
    /// Same-identity contexts reached through new URLs; conflict resolver
    /// input, never crawled themselves
    duplicates: Vec<PageContext>,
    root_id: Option<String>,
}

impl PageHierarchy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the workspace root; must be the first registration
    pub fn register_root(&mut self, url: &str) -> Result<String, HierarchyError> {
        if self.root_id.is_some() {
            return Err(HierarchyError::RootAlreadyRegistered);
        }
        let id = page_identity(url);
        let ctx = PageContext::root(id.clone(), url.to_string());
        self.by_url.insert(normalize_url(url), id.clone());
        self.order.push(id.clone());
        self.nodes.insert(id.clone(), ctx);
        self.root_id = Some(id.clone());
        Ok(id)
    }

    /// Register one discovered link under its parent
    ///
    /// URL-level dedup happens here; identity-level duplicates that slip
    /// past it become side-recorded duplicate contexts. New identities get
    /// their immutable `path_segments` snapshot computed from the parent's
    /// snapshot plus the link title, with a short id suffix on sibling
    /// segment collisions.
    pub fn register_link(
        &mut self,
        parent_id: &str,
        link: &DiscoveredLink,
    ) -> Result<Registration, HierarchyError> {
        let norm = normalize_url(&link.url);
        if let Some(existing) = self.by_url.get(&norm) {
            let existing = existing.clone();
            self.link_child(parent_id, &existing)?;
            return Ok(Registration::AlreadyKnown(existing));
        }

        let id = page_identity(&link.url);
        if !self.nodes.contains_key(parent_id) {
            return Err(HierarchyError::UnknownParent(parent_id.to_string()));
        }

        let segment = self.dedupe_segment(parent_id, sanitize_segment(&link.title), &id);
        let parent = self
            .nodes
            .get(parent_id)
            .ok_or_else(|| HierarchyError::UnknownParent(parent_id.to_string()))?;
        let ctx = PageContext::child_of(parent, id.clone(), link.url.clone(), segment);

        self.by_url.insert(norm, id.clone());

        if self.nodes.contains_key(&id) {
            self.duplicates.push(ctx);
            self.link_child(parent_id, &id)?;
            return Ok(Registration::Duplicate(id));
        }

        self.order.push(id.clone());
        self.nodes.insert(id.clone(), ctx);
        self.link_child(parent_id, &id)?;
        Ok(Registration::New(id))
    }

    fn link_child(&mut self, parent_id: &str, child_id: &str) -> Result<(), HierarchyError> {
        let parent = self
            .nodes
            .get_mut(parent_id)
            .ok_or_else(|| HierarchyError::UnknownParent(parent_id.to_string()))?;
        if !parent.children.iter().any(|c| c == child_id) {
            parent.children.push(child_id.to_string());
        }
        Ok(())
    }

    /// Append a short id suffix when a sibling already claimed the segment
    fn dedupe_segment(&self, parent_id: &str, segment: String, id: &str) -> String {
        let Some(parent) = self.nodes.get(parent_id) else {
            return segment;
        };
        let taken = parent.children.iter().any(|child_id| {
            self.nodes
                .get(child_id)
                .and_then(|c| c.path_segments.last())
                .is_some_and(|last| last == &segment)
        });
        if taken {
            let suffix: String = id.chars().take(8).collect();
            format!("{segment}-{suffix}")
        } else {
            segment
        }
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&PageContext> {
        self.nodes.get(id)
    }

    #[must_use]
    pub fn root_id(&self) -> Option<&str> {
        self.root_id.as_deref()
    }

    /// Resolve a context's title (write-once, mirrors the registry rule)
    pub fn resolve_title(&mut self, id: &str, title: &str) -> bool {
        self.nodes
            .get_mut(id)
            .map(|ctx| ctx.resolve_title(title))
            .unwrap_or(false)
    }

    /// Canonical contexts in registration order
    pub fn contexts(&self) -> impl Iterator<Item = &PageContext> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Canonical contexts plus recorded duplicates: the conflict resolver
    /// input set
    pub fn all_contexts(&self) -> impl Iterator<Item = &PageContext> {
        self.contexts().chain(self.duplicates.iter())
    }

    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.duplicates.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Rebuild a segment path by walking parent ids
    ///
    /// Fallback for contexts whose snapshot is absent. Only meaningful
    /// before any serialization boundary: the walk needs the live arena.
    #[must_use]
    pub fn walk_segments(&self, id: &str) -> Option<Vec<String>> {
        let mut segments = Vec::new();
        let mut current = self.nodes.get(id)?;
        loop {
            match &current.parent_id {
                None => break,
                Some(pid) => {
                    segments.push(current.path_segments.last()?.clone());
                    current = self.nodes.get(pid)?;
                }
            }
        }
        segments.reverse();
        Some(segments)
    }
}
