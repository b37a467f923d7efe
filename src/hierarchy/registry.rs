//! Append-only page identity → display title registry

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One authoritative copy lives on the orchestrator; workers receive it
/// wholesale at `Init` and as deltas via `UpdateRegistry`. Entries are
/// immutable once set: the first resolved title for an identity wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TitleRegistry {
    titles: HashMap<String, String>,
    /// Ids resolved since the last delta flush
    #[serde(skip)]
    dirty: Vec<String>,
}

impl TitleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a resolved title; returns whether the entry was inserted
    ///
    /// A second resolution for the same identity is ignored, which is what
    /// makes interleaved discovery results for duplicate pages safe
    /// without any locking.
    pub fn resolve(&mut self, id: &str, title: &str) -> bool {
        if self.titles.contains_key(id) {
            return false;
        }
        self.titles.insert(id.to_string(), title.to_string());
        self.dirty.push(id.to_string());
        true
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&str> {
        self.titles.get(id).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.titles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    /// Full snapshot for `Init` payloads
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.titles.clone()
    }

    /// Entries resolved since the last call, for `UpdateRegistry` deltas
    pub fn take_delta(&mut self) -> HashMap<String, String> {
        let mut delta = HashMap::with_capacity(self.dirty.len());
        for id in self.dirty.drain(..) {
            if let Some(title) = self.titles.get(&id) {
                delta.insert(id, title.clone());
            }
        }
        delta
    }
}
