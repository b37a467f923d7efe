//! Getter methods for `MirrorConfig`

use std::path::PathBuf;
use std::time::Duration;

use super::types::MirrorConfig;

impl MirrorConfig {
    #[must_use]
    pub fn output_dir(&self) -> &PathBuf {
        &self.output_dir
    }

    #[must_use]
    pub fn start_url(&self) -> &str {
        &self.start_url
    }

    /// Lowercased host of the start URL; the in-graph boundary for
    /// discovered links
    #[must_use]
    pub fn workspace_host(&self) -> &str {
        &self.workspace_host
    }

    #[must_use]
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    #[must_use]
    pub fn worker_memory_budget_bytes(&self) -> u64 {
        self.worker_memory_budget_bytes
    }

    #[must_use]
    pub fn max_workers(&self) -> Option<usize> {
        self.max_workers
    }

    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    #[must_use]
    pub fn task_retry_limit(&self) -> u32 {
        self.task_retry_limit
    }

    #[must_use]
    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity
    }

    #[must_use]
    pub fn event_bus_capacity(&self) -> usize {
        self.event_bus_capacity
    }

    /// Worker-relevant subset serialized into `Init` payloads
    ///
    /// Workers never see the whole config; they get what rendering
    /// needs and nothing that only the master acts on.
    #[must_use]
    pub fn worker_init_config(&self) -> serde_json::Value {
        serde_json::json!({
            "startUrl": self.start_url,
            "workspaceHost": self.workspace_host,
            "outputDir": self.output_dir,
            "maxDepth": self.max_depth,
        })
    }
}
