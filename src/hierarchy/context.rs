//! The node type representing one discovered page

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One discovered page: identity, hierarchy position, path snapshot
///
/// Parent/child relations are id lookups into the owning
/// [`PageHierarchy`](super::PageHierarchy), never references, so a context
/// serializes cleanly across the worker boundary. `path_segments` is
/// computed once at registration and is the single source of truth for
/// path resolution afterward; nothing may re-derive it from the parent
/// chain once a context has crossed a serialization boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContext {
    pub id: String,
    pub url: String,
    pub depth: u32,
    pub parent_id: Option<String>,
    /// Sanitized name components from the root (exclusive) to this page
    pub path_segments: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Ids of owned children, in discovery order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
}

impl PageContext {
    /// Construct the root context (depth 0, empty segment path)
    #[must_use]
    pub fn root(id: String, url: String) -> Self {
        Self {
            id,
            url,
            depth: 0,
            parent_id: None,
            path_segments: Vec::new(),
            title: None,
            children: Vec::new(),
        }
    }

    /// Construct a child context under an already-registered parent
    #[must_use]
    pub fn child_of(parent: &PageContext, id: String, url: String, segment: String) -> Self {
        let mut path_segments = parent.path_segments.clone();
        path_segments.push(segment);
        Self {
            id,
            url,
            depth: parent.depth + 1,
            parent_id: Some(parent.id.clone()),
            path_segments,
            title: None,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.depth == 0
    }

    /// Resolve the title exactly once; later calls are ignored
    ///
    /// Returns whether this call set the title.
    pub fn resolve_title(&mut self, title: &str) -> bool {
        if self.title.is_some() {
            return false;
        }
        self.title = Some(title.to_string());
        true
    }

    /// Mirror-relative path of this page's rendered document
    ///
    /// Root maps to `index.html`; everything else to
    /// `<segments joined by '/'>/index.html`.
    #[must_use]
    pub fn relative_path(&self) -> String {
        if self.path_segments.is_empty() {
            "index.html".to_string()
        } else {
            format!("{}/index.html", self.path_segments.join("/"))
        }
    }

    /// Absolute on-disk save path under the mirror output directory
    #[must_use]
    pub fn save_path(&self, output_dir: &Path) -> PathBuf {
        let mut path = output_dir.to_path_buf();
        for seg in &self.path_segments {
            path.push(seg);
        }
        path.push("index.html");
        path
    }

    /// Directory holding this page's localized assets (`files/` sibling of
    /// the rendered document, matching the mirror layout)
    #[must_use]
    pub fn asset_dir(&self, output_dir: &Path) -> PathBuf {
        let mut path = output_dir.to_path_buf();
        for seg in &self.path_segments {
            path.push(seg);
        }
        path.push("files");
        path
    }
}
