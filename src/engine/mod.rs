//! Collaborator interfaces for the out-of-scope rendering engine
//!
//! The core never drives a browser itself. Workers call through
//! [`RenderEngine`] to discover a page's title and outgoing links, and to
//! render and persist a page with its links rewritten. Implementations
//! live outside this crate; tests supply fakes.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;

/// Opaque cookie value captured once at bootstrap and propagated untouched
pub type Cookie = serde_json::Value;

/// Boxed future returned by engine trait methods
pub type EngineFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// One outgoing link extracted from a rendered page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredLink {
    pub url: String,
    /// Display text of the link, used for the target's path segment
    pub title: String,
}

/// Result of a discovery pass over one page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredPage {
    pub title: String,
    pub links: Vec<DiscoveredLink>,
    /// Session cookies, returned only when capture was requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookies: Option<Vec<Cookie>>,
}

/// Result of rendering and persisting one page
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedPage {
    pub assets_downloaded: usize,
    pub links_rewritten: usize,
}

/// Per-worker session state handed to every engine call
///
/// Carries the worker identity, the opaque cookie set, and the title
/// registry snapshot the master has pushed so far.
#[derive(Debug, Clone, Default)]
pub struct WorkerSession {
    pub worker_id: String,
    pub cookies: Vec<Cookie>,
    pub title_registry: HashMap<String, String>,
}

/// The rendering engine seam
///
/// Both methods run inside a worker runtime, never on the master.
pub trait RenderEngine: Send + Sync {
    /// Extract the title and outgoing links of one page
    ///
    /// `is_first_page` requests cookie capture: the returned page should
    /// carry the authenticated session's cookies for later broadcast.
    fn discover<'a>(
        &'a self,
        session: &'a WorkerSession,
        url: &'a str,
        is_first_page: bool,
    ) -> EngineFuture<'a, DiscoveredPage>;

    /// Render one page, rewrite its internal links through `rewrite_map`,
    /// localize assets, and write the result under `save_path`
    fn render_and_save<'a>(
        &'a self,
        session: &'a WorkerSession,
        url: &'a str,
        save_path: &'a Path,
        rewrite_map: &'a HashMap<String, String>,
    ) -> EngineFuture<'a, SavedPage>;
}
