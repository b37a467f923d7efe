//! Event type definitions for the mirror run
//!
//! Published on the explicitly-constructed [`EventBus`](super::EventBus)
//! the orchestrator owns and threads into the queue and worker proxies.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::protocol::TaskKind;

/// Phases of one mirror run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MirrorPhase {
    Bootstrap,
    Discover,
    ConflictResolve,
    Download,
    Shutdown,
}

/// Reason for event bus shutdown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ShutdownReason {
    /// Mirror run completed (possibly with recorded task failures)
    RunCompleted,
    /// Unrecoverable setup failure aborted the run
    Error(String),
    /// Cancelled by the embedding application
    Cancelled,
}

/// Events emitted during a mirror run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MirrorEvent {
    MirrorStarted {
        run_id: String,
        start_url: String,
        output_dir: PathBuf,
        max_depth: u32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    PhaseChanged {
        phase: MirrorPhase,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    /// First item entered an empty queue
    QueueReady {
        phase: TaskKind,
        queue_length: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    /// Last queued item was dispatched; tasks may still be in flight
    QueueEmpty {
        phase: TaskKind,
        queue_length: usize,
        pending_count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    /// Queue drained and every dispatched task completed
    AllIdle {
        phase: TaskKind,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    WorkerReady {
        worker_id: String,
        pid: u32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    TaskStarted {
        worker_id: String,
        task_id: String,
        kind: TaskKind,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    TaskCompleted {
        worker_id: String,
        task_id: String,
        kind: TaskKind,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    TaskFailed {
        worker_id: String,
        task_id: String,
        kind: TaskKind,
        error: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    WorkerIdle {
        worker_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    WorkerCrashed {
        worker_id: String,
        detail: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    PageDiscovered {
        page_id: String,
        url: String,
        depth: u32,
        links_found: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    PageSaved {
        page_id: String,
        saved_path: PathBuf,
        assets_downloaded: usize,
        links_rewritten: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    MirrorCompleted {
        pages_discovered: usize,
        pages_saved: usize,
        failed_tasks: usize,
        duration: std::time::Duration,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
    /// Signals that the event bus is shutting down; subscribers should
    /// exit their event loops
    Shutdown {
        reason: ShutdownReason,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl MirrorEvent {
    #[must_use]
    pub fn mirror_started(
        run_id: String,
        start_url: String,
        output_dir: PathBuf,
        max_depth: u32,
    ) -> Self {
        Self::MirrorStarted {
            run_id,
            start_url,
            output_dir,
            max_depth,
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn phase_changed(phase: MirrorPhase) -> Self {
        Self::PhaseChanged {
            phase,
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn queue_ready(phase: TaskKind, queue_length: usize) -> Self {
        Self::QueueReady {
            phase,
            queue_length,
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn queue_empty(phase: TaskKind, pending_count: usize) -> Self {
        Self::QueueEmpty {
            phase,
            queue_length: 0,
            pending_count,
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn all_idle(phase: TaskKind) -> Self {
        Self::AllIdle {
            phase,
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn worker_ready(worker_id: String, pid: u32) -> Self {
        Self::WorkerReady {
            worker_id,
            pid,
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn task_started(worker_id: String, task_id: String, kind: TaskKind) -> Self {
        Self::TaskStarted {
            worker_id,
            task_id,
            kind,
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn task_completed(worker_id: String, task_id: String, kind: TaskKind) -> Self {
        Self::TaskCompleted {
            worker_id,
            task_id,
            kind,
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn task_failed(worker_id: String, task_id: String, kind: TaskKind, error: String) -> Self {
        Self::TaskFailed {
            worker_id,
            task_id,
            kind,
            error,
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn worker_idle(worker_id: String) -> Self {
        Self::WorkerIdle {
            worker_id,
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn worker_crashed(worker_id: String, detail: String) -> Self {
        Self::WorkerCrashed {
            worker_id,
            detail,
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn page_discovered(page_id: String, url: String, depth: u32, links_found: usize) -> Self {
        Self::PageDiscovered {
            page_id,
            url,
            depth,
            links_found,
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn page_saved(
        page_id: String,
        saved_path: PathBuf,
        assets_downloaded: usize,
        links_rewritten: usize,
    ) -> Self {
        Self::PageSaved {
            page_id,
            saved_path,
            assets_downloaded,
            links_rewritten,
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn mirror_completed(
        pages_discovered: usize,
        pages_saved: usize,
        failed_tasks: usize,
        duration: std::time::Duration,
    ) -> Self {
        Self::MirrorCompleted {
            pages_discovered,
            pages_saved,
            failed_tasks,
            duration,
            timestamp: chrono::Utc::now(),
        }
    }

    #[must_use]
    pub fn shutdown(reason: ShutdownReason) -> Self {
        Self::Shutdown {
            reason,
            timestamp: chrono::Utc::now(),
        }
    }
}
