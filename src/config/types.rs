//! Core configuration types for mirror runs
//!
//! This module contains the main `MirrorConfig` struct that defines the
//! parameters for one workspace mirror run.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration struct for one mirror run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Output directory for the mirrored workspace.
    ///
    /// **INVARIANT:** Always an absolute path (normalized in builder).
    /// Worker save paths are derived from it, and workers must never
    /// depend on the master's working directory.
    pub(crate) output_dir: PathBuf,
    pub(crate) start_url: String,

    /// Host component of `start_url`, the in-graph boundary.
    /// Precomputed at build time to avoid re-parsing in the discovery
    /// hot path.
    pub(crate) workspace_host: String,

    /// Maximum discovery depth below the root page
    pub(crate) max_depth: u32,

    /// Memory assumed per worker when sizing the pool
    pub(crate) worker_memory_budget_bytes: u64,

    /// Hard cap on pool size, on top of the memory-derived count
    pub(crate) max_workers: Option<usize>,

    /// Grace period a worker gets between `Shutdown` and abort
    pub(crate) shutdown_grace_secs: u64,

    /// How many times a task failed by a worker crash is requeued
    pub(crate) task_retry_limit: u32,

    /// Per-direction capacity of each worker's command/reply channels
    pub(crate) channel_capacity: usize,

    /// Broadcast capacity of the run's event bus
    pub(crate) event_bus_capacity: usize,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./mirror"),
            start_url: String::new(),
            workspace_host: String::new(),
            max_depth: 3,
            worker_memory_budget_bytes: 512 * 1024 * 1024,
            max_workers: None,
            shutdown_grace_secs: 5,
            task_retry_limit: 1,
            channel_capacity: 64,
            event_bus_capacity: 256,
        }
    }
}
