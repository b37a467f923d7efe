//! Broadcast event bus for mirror run events
//!
//! Constructed explicitly by the orchestrator and passed to the queue,
//! worker proxies, and any dashboard adapter as a constructor parameter.
//! There is deliberately no global instance.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, broadcast};

use super::errors::EventBusError;
use super::metrics::{EventBusMetrics, MetricsSnapshot};
use super::types::{MirrorEvent, ShutdownReason};

/// Event bus for publishing and subscribing to mirror events
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<MirrorEvent>,
    metrics: EventBusMetrics,
    shutdown: Arc<Notify>,
    shutdown_flag: Arc<AtomicBool>,
}

impl EventBus {
    /// Create a new bus buffering up to `capacity` events per subscriber
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            metrics: EventBusMetrics::new(),
            shutdown: Arc::new(Notify::new()),
            shutdown_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Publish an event to all subscribers
    ///
    /// Returns the number of active subscribers that received it.
    pub fn publish(&self, event: MirrorEvent) -> Result<usize, EventBusError> {
        match self.sender.send(event) {
            Ok(subscriber_count) => {
                self.metrics.increment_published();
                self.metrics.update_subscriber_count(subscriber_count);
                Ok(subscriber_count)
            }
            Err(_) => {
                self.metrics.increment_dropped();
                Err(EventBusError::NoSubscribers)
            }
        }
    }

    /// Publish, treating "nobody is listening" as uninteresting
    ///
    /// Queue and proxy lifecycle signals are advisory; a run with no
    /// dashboard attached must behave identically to one with ten.
    pub fn emit(&self, event: MirrorEvent) {
        if let Err(EventBusError::NoSubscribers) = self.publish(event) {
            log::trace!("event published with no active subscribers");
        }
    }

    /// Subscribe to events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<MirrorEvent> {
        self.sender.subscribe()
    }

    /// Subscribe as a `Stream`, for consumers built on stream combinators
    ///
    /// Lagged subscribers observe `BroadcastStreamRecvError` items instead
    /// of silently missing events.
    #[must_use]
    pub fn event_stream(&self) -> tokio_stream::wrappers::BroadcastStream<MirrorEvent> {
        tokio_stream::wrappers::BroadcastStream::new(self.sender.subscribe())
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        let count = self.sender.receiver_count();
        self.metrics.update_subscriber_count(count);
        count
    }

    #[must_use]
    pub fn has_subscribers(&self) -> bool {
        self.subscriber_count() > 0
    }

    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Signal shutdown to all subscribers; idempotent
    pub fn shutdown(&self) {
        self.shutdown_flag.store(true, Ordering::SeqCst);
        self.shutdown.notify_waiters();
        log::debug!("event bus shutdown signaled");
    }

    /// Wait for the shutdown signal (for `tokio::select!` in subscribers)
    pub async fn wait_for_shutdown(&self) {
        if self.is_shutdown() {
            return;
        }
        self.shutdown.notified().await;
    }

    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown_flag.load(Ordering::SeqCst)
    }

    /// Publish a final `Shutdown` event, give subscribers a short drain
    /// window, then signal shutdown complete
    pub async fn shutdown_gracefully(&self, reason: ShutdownReason) {
        log::info!("event bus shutting down: {reason:?}");
        self.shutdown_flag.store(true, Ordering::SeqCst);
        self.emit(MirrorEvent::shutdown(reason));

        // Heuristic drain window; subscribers have no ack channel
        tokio::time::sleep(Duration::from_millis(100)).await;
        self.shutdown.notify_waiters();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
