//! Type-safe builder for `MirrorConfig` using the typestate pattern
//!
//! The two required fields (output directory and start URL) are enforced
//! at compile time: `build` only exists once both have been supplied.

use anyhow::{Result, anyhow};
use std::marker::PhantomData;
use std::path::PathBuf;

use super::types::MirrorConfig;

// Type states for the builder
pub struct WithOutputDir;
pub struct WithStartUrl;

pub struct MirrorConfigBuilder<State = ()> {
    pub(crate) output_dir: Option<PathBuf>,
    pub(crate) start_url: Option<String>,
    pub(crate) max_depth: u32,
    pub(crate) worker_memory_budget_bytes: u64,
    pub(crate) max_workers: Option<usize>,
    pub(crate) shutdown_grace_secs: u64,
    pub(crate) task_retry_limit: u32,
    pub(crate) channel_capacity: usize,
    pub(crate) event_bus_capacity: usize,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for MirrorConfigBuilder<()> {
    fn default() -> Self {
        let defaults = MirrorConfig::default();
        Self {
            output_dir: None,
            start_url: None,
            max_depth: defaults.max_depth,
            worker_memory_budget_bytes: defaults.worker_memory_budget_bytes,
            max_workers: defaults.max_workers,
            shutdown_grace_secs: defaults.shutdown_grace_secs,
            task_retry_limit: defaults.task_retry_limit,
            channel_capacity: defaults.channel_capacity,
            event_bus_capacity: defaults.event_bus_capacity,
            _phantom: PhantomData,
        }
    }
}

impl MirrorConfig {
    /// Create a builder for configuring a `MirrorConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> MirrorConfigBuilder<()> {
        MirrorConfigBuilder::default()
    }
}

impl MirrorConfigBuilder<()> {
    pub fn output_dir(self, dir: impl Into<PathBuf>) -> MirrorConfigBuilder<WithOutputDir> {
        MirrorConfigBuilder {
            output_dir: Some(dir.into()),
            start_url: self.start_url,
            max_depth: self.max_depth,
            worker_memory_budget_bytes: self.worker_memory_budget_bytes,
            max_workers: self.max_workers,
            shutdown_grace_secs: self.shutdown_grace_secs,
            task_retry_limit: self.task_retry_limit,
            channel_capacity: self.channel_capacity,
            event_bus_capacity: self.event_bus_capacity,
            _phantom: PhantomData,
        }
    }
}

impl MirrorConfigBuilder<WithOutputDir> {
    pub fn start_url(self, url: impl Into<String>) -> MirrorConfigBuilder<WithStartUrl> {
        let url_string = url.into();

        // Normalize URL: add https:// if no scheme is present
        let normalized_url =
            if url_string.starts_with("http://") || url_string.starts_with("https://") {
                url_string
            } else {
                format!("https://{url_string}")
            };

        MirrorConfigBuilder {
            output_dir: self.output_dir,
            start_url: Some(normalized_url),
            max_depth: self.max_depth,
            worker_memory_budget_bytes: self.worker_memory_budget_bytes,
            max_workers: self.max_workers,
            shutdown_grace_secs: self.shutdown_grace_secs,
            task_retry_limit: self.task_retry_limit,
            channel_capacity: self.channel_capacity,
            event_bus_capacity: self.event_bus_capacity,
            _phantom: PhantomData,
        }
    }
}

// Build method only available when all required fields are set
impl MirrorConfigBuilder<WithStartUrl> {
    pub fn build(self) -> Result<MirrorConfig> {
        let output_dir = self
            .output_dir
            .ok_or_else(|| anyhow!("output_dir is required"))?;
        let start_url = self
            .start_url
            .ok_or_else(|| anyhow!("start_url is required"))?;

        // Absolute output dir: worker save paths must not depend on cwd
        let output_dir = if output_dir.is_absolute() {
            output_dir
        } else {
            std::env::current_dir()
                .map_err(|e| anyhow!("cannot resolve working directory: {e}"))?
                .join(output_dir)
        };

        let workspace_host = url::Url::parse(&start_url)
            .map_err(|e| anyhow!("invalid start URL '{start_url}': {e}"))?
            .host_str()
            .ok_or_else(|| anyhow!("start URL '{start_url}' has no host"))?
            .to_ascii_lowercase();

        Ok(MirrorConfig {
            output_dir,
            start_url,
            workspace_host,
            max_depth: self.max_depth,
            worker_memory_budget_bytes: self.worker_memory_budget_bytes,
            max_workers: self.max_workers,
            shutdown_grace_secs: self.shutdown_grace_secs,
            task_retry_limit: self.task_retry_limit,
            channel_capacity: self.channel_capacity.max(1),
            event_bus_capacity: self.event_bus_capacity.max(1),
        })
    }
}

// Optional knobs, available at any builder state
impl<State> MirrorConfigBuilder<State> {
    /// Set maximum discovery depth below the root page
    #[must_use]
    pub fn max_depth(mut self, depth: u32) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set the per-worker memory budget used when sizing the pool
    #[must_use]
    pub fn worker_memory_budget_bytes(mut self, bytes: u64) -> Self {
        self.worker_memory_budget_bytes = bytes;
        self
    }

    /// Cap the worker pool regardless of available memory
    #[must_use]
    pub fn max_workers(mut self, workers: usize) -> Self {
        self.max_workers = Some(workers);
        self
    }

    /// Set the grace period between `Shutdown` and forceful abort
    #[must_use]
    pub fn shutdown_grace_secs(mut self, secs: u64) -> Self {
        self.shutdown_grace_secs = secs;
        self
    }

    /// Set how many times a crash-failed task is requeued
    ///
    /// Zero disables retries: a crash permanently fails its task.
    #[must_use]
    pub fn task_retry_limit(mut self, limit: u32) -> Self {
        self.task_retry_limit = limit;
        self
    }

    /// Set per-direction worker channel capacity
    #[must_use]
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Set the event bus broadcast capacity
    #[must_use]
    pub fn event_bus_capacity(mut self, capacity: usize) -> Self {
        self.event_bus_capacity = capacity;
        self
    }
}
