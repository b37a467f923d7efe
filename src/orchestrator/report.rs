//! Final mirror run report

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::protocol::TaskKind;
use crate::resolver::ResolutionStats;

/// One task that failed permanently (exhausted retries, or no worker left
/// to run it)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedTask {
    pub page_id: String,
    pub url: String,
    pub kind: TaskKind,
    pub error: String,
}

/// Summary of one completed mirror run
///
/// A run that reaches the report "succeeded" in the sense that it ran to
/// completion; callers decide how to surface partial failure from
/// [`has_failures`](Self::has_failures).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorReport {
    /// Unique id of this run, stamped on its events and logs
    pub run_id: String,
    pub start_url: String,
    pub pages_discovered: usize,
    pub pages_saved: usize,
    /// Same-identity contexts collapsed by conflict resolution
    pub duplicates_resolved: usize,
    pub failed_tasks: Vec<FailedTask>,
    pub workers_spawned: usize,
    pub workers_crashed: usize,
    pub duration: Duration,
}

impl MirrorReport {
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failed_tasks.is_empty()
    }

    pub(crate) fn apply_resolution_stats(&mut self, stats: ResolutionStats) {
        self.duplicates_resolved = stats.discarded;
    }
}
