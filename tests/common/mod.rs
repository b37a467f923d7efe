//! Scripted rendering engine shared by integration tests
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::anyhow;
use parking_lot::Mutex;
use serde_json::json;

use pagevault::engine::{
    DiscoveredLink, DiscoveredPage, EngineFuture, RenderEngine, SavedPage, WorkerSession,
};

/// One recorded render call: url, save path, cookie count, rewrite entries
#[derive(Debug, Clone)]
pub struct SaveCall {
    pub url: String,
    pub save_path: PathBuf,
    pub cookies_seen: usize,
    pub rewrite_entries: usize,
}

/// In-memory engine scripted from a fixed page graph
#[derive(Default)]
pub struct ScriptedEngine {
    pages: HashMap<String, DiscoveredPage>,
    fail_always: HashSet<String>,
    panic_once: Mutex<HashSet<String>>,
    pub saved: Mutex<Vec<SaveCall>>,
}

/// RUST_LOG-controlled logging for test runs; safe to call repeatedly
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page with its title and outgoing links
    pub fn page(mut self, url: &str, title: &str, links: &[(&str, &str)]) -> Self {
        let links = links
            .iter()
            .map(|(url, title)| DiscoveredLink {
                url: (*url).to_string(),
                title: (*title).to_string(),
            })
            .collect();
        self.pages.insert(
            url.to_string(),
            DiscoveredPage {
                title: title.to_string(),
                links,
                cookies: None,
            },
        );
        self
    }

    /// Every discovery of this url fails with a task error
    pub fn fail_always(mut self, url: &str) -> Self {
        self.fail_always.insert(url.to_string());
        self
    }

    /// The first discovery of this url panics the worker task
    pub fn panic_once(self, url: &str) -> Self {
        self.panic_once.lock().insert(url.to_string());
        self
    }
}

impl RenderEngine for ScriptedEngine {
    fn discover<'a>(
        &'a self,
        _session: &'a WorkerSession,
        url: &'a str,
        is_first_page: bool,
    ) -> EngineFuture<'a, DiscoveredPage> {
        Box::pin(async move {
            if self.panic_once.lock().remove(url) {
                panic!("scripted worker crash");
            }
            if self.fail_always.contains(url) {
                return Err(anyhow!("scripted discovery failure for {url}"));
            }
            let mut page = self
                .pages
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow!("no scripted page for {url}"))?;
            if is_first_page {
                page.cookies = Some(vec![json!({ "name": "session", "value": "s3cr3t" })]);
            }
            Ok(page)
        })
    }

    fn render_and_save<'a>(
        &'a self,
        session: &'a WorkerSession,
        url: &'a str,
        save_path: &'a Path,
        rewrite_map: &'a HashMap<String, String>,
    ) -> EngineFuture<'a, SavedPage> {
        Box::pin(async move {
            self.saved.lock().push(SaveCall {
                url: url.to_string(),
                save_path: save_path.to_path_buf(),
                cookies_seen: session.cookies.len(),
                rewrite_entries: rewrite_map.len(),
            });
            Ok(SavedPage {
                assets_downloaded: 1,
                links_rewritten: rewrite_map.len(),
            })
        })
    }
}
