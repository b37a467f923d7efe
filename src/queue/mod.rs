//! Two-phase task queue with completion and idle signaling
//!
//! One queue instance drives one phase (discover or download). Items are
//! FIFO; dispatched-but-incomplete tasks are tracked by page id so that
//! completion is idempotent and the pending count can never go negative.
//! "All idle" fires exactly once per drain-to-zero transition, which is
//! the signal the orchestrator's level-by-level discovery waits on.

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Notify;

use crate::events::{EventBus, MirrorEvent};
use crate::hierarchy::PageContext;
use crate::protocol::TaskKind;

/// Attachments carried by download-phase tasks
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadAttachments {
    /// Absolute path the rendered page must be written to
    pub save_path: PathBuf,
    /// Identity → mirror-relative path, shared across the whole phase
    pub rewrite_map: std::collections::HashMap<String, String>,
}

/// One unit of work, identified by its owning page context's id
#[derive(Debug, Clone)]
pub struct Task {
    pub id: String,
    pub kind: TaskKind,
    pub context: PageContext,
    pub attachments: Option<DownloadAttachments>,
}

impl Task {
    #[must_use]
    pub fn discover(context: PageContext) -> Self {
        Self {
            id: context.id.clone(),
            kind: TaskKind::Discover,
            context,
            attachments: None,
        }
    }

    #[must_use]
    pub fn download(context: PageContext, attachments: DownloadAttachments) -> Self {
        Self {
            id: context.id.clone(),
            kind: TaskKind::Download,
            context,
            attachments: Some(attachments),
        }
    }
}

/// Lifecycle signal returned by queue operations
///
/// The same signals are published on the event bus; the return values let
/// single-threaded callers react without subscribing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueSignal {
    /// First item entered an empty queue
    Ready { queue_length: usize },
    /// Head was dispatched and the queue is now empty
    Empty { pending_count: usize },
    /// Queue empty and nothing in flight
    AllIdle,
}

/// Per-phase FIFO of pending tasks plus in-flight tracking
#[derive(Debug)]
pub struct TaskQueue {
    phase: TaskKind,
    items: VecDeque<Task>,
    /// Ids queued or in flight; enforces one task per id per phase
    known: HashSet<String>,
    /// Ids dispatched but not yet completed
    pending: HashSet<String>,
    completed: usize,
    idle_notify: Arc<Notify>,
    bus: EventBus,
}

impl TaskQueue {
    #[must_use]
    pub fn new(phase: TaskKind, bus: EventBus) -> Self {
        Self {
            phase,
            items: VecDeque::new(),
            known: HashSet::new(),
            pending: HashSet::new(),
            completed: 0,
            idle_notify: Arc::new(Notify::new()),
            bus,
        }
    }

    #[must_use]
    pub fn phase(&self) -> TaskKind {
        self.phase
    }

    /// Append a task; returns `Ready` when it revives an empty queue
    ///
    /// A task whose id is already queued or in flight is rejected: at most
    /// one task per id may exist per phase.
    pub fn enqueue(&mut self, task: Task) -> Option<QueueSignal> {
        if !self.known.insert(task.id.clone()) {
            log::debug!("{} task for {} already tracked, skipping", self.phase, task.id);
            return None;
        }
        let was_empty = self.items.is_empty();
        self.items.push_back(task);
        if was_empty {
            let signal = QueueSignal::Ready {
                queue_length: self.items.len(),
            };
            self.bus
                .emit(MirrorEvent::queue_ready(self.phase, self.items.len()));
            return Some(signal);
        }
        None
    }

    /// Pop the head for dispatch; returns `Empty` when the queue drains
    pub fn next(&mut self) -> Option<(Task, Option<QueueSignal>)> {
        let task = self.items.pop_front()?;
        self.pending.insert(task.id.clone());
        let signal = if self.items.is_empty() {
            self.bus
                .emit(MirrorEvent::queue_empty(self.phase, self.pending.len()));
            Some(QueueSignal::Empty {
                pending_count: self.pending.len(),
            })
        } else {
            None
        };
        Some((task, signal))
    }

    /// Mark a dispatched task complete; idempotent
    ///
    /// Returns `true` only on the first completion of an actually-pending
    /// id. Fires `AllIdle` (return value, bus event, and notify) exactly
    /// when this completion empties both the queue and the pending set.
    pub fn mark_complete(&mut self, id: &str) -> bool {
        if !self.pending.remove(id) {
            log::debug!("{} completion for {id} ignored: not pending", self.phase);
            return false;
        }
        self.completed += 1;
        self.known.remove(id);
        if self.items.is_empty() && self.pending.is_empty() {
            self.bus.emit(MirrorEvent::all_idle(self.phase));
            self.idle_notify.notify_waiters();
        }
        true
    }

    /// Put a failed task back at the tail for one more attempt
    ///
    /// The caller must have `mark_complete`d the failure first; retry is
    /// a fresh enqueue, not a pending-count adjustment.
    pub fn requeue(&mut self, task: Task) -> Option<QueueSignal> {
        self.enqueue(task)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.completed
    }

    /// Queue drained and nothing in flight
    #[must_use]
    pub fn is_all_idle(&self) -> bool {
        self.items.is_empty() && self.pending.is_empty()
    }

    /// Handle for awaiting the all-idle transition without holding the
    /// queue borrow across an await point
    #[must_use]
    pub fn idle_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.idle_notify)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::PageContext;

    fn ctx(id: &str) -> PageContext {
        PageContext::root(id.to_string(), format!("https://ws.example/{id}"))
    }

    fn queue() -> TaskQueue {
        TaskQueue::new(TaskKind::Discover, EventBus::new(16))
    }

    #[test]
    fn ready_fires_only_into_empty_queue() {
        let mut q = queue();
        let first = q.enqueue(Task::discover(ctx("a")));
        assert_eq!(first, Some(QueueSignal::Ready { queue_length: 1 }));
        let second = q.enqueue(Task::discover(ctx("b")));
        assert_eq!(second, None);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut q = queue();
        q.enqueue(Task::discover(ctx("a")));
        assert_eq!(q.enqueue(Task::discover(ctx("a"))), None);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn empty_signal_reports_pending() {
        let mut q = queue();
        q.enqueue(Task::discover(ctx("a")));
        q.enqueue(Task::discover(ctx("b")));

        let (_, signal) = q.next().expect("a");
        assert_eq!(signal, None);
        let (_, signal) = q.next().expect("b");
        assert_eq!(signal, Some(QueueSignal::Empty { pending_count: 2 }));
    }

    #[test]
    fn mark_complete_is_idempotent_and_clamped() {
        let mut q = queue();
        q.enqueue(Task::discover(ctx("a")));
        let (task, _) = q.next().expect("task");

        assert!(q.mark_complete(&task.id));
        assert!(!q.mark_complete(&task.id));
        assert_eq!(q.pending_count(), 0);
        assert!(!q.mark_complete("never-dispatched"));
        assert_eq!(q.pending_count(), 0);
    }

    #[test]
    fn all_idle_requires_both_zero() {
        let mut q = queue();
        q.enqueue(Task::discover(ctx("a")));
        q.enqueue(Task::discover(ctx("b")));
        let (a, _) = q.next().expect("a");

        // One still queued: completing the dispatched task must not idle
        assert!(q.mark_complete(&a.id));
        assert!(!q.is_all_idle());

        let (b, _) = q.next().expect("b");
        assert!(q.mark_complete(&b.id));
        assert!(q.is_all_idle());
    }
}
