//! Master-side handle to one worker: state machine and result correlator
//!
//! States: `Spawning → Idle ⇄ Busy`, with `Stopping` on cooperative
//! shutdown and `Crashed` reachable from any state when the worker's
//! reply channel closes unexpectedly. The proxy never respawns a crashed
//! worker; that policy belongs to the orchestrator.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::engine::RenderEngine;
use crate::events::{EventBus, MirrorEvent};
use crate::protocol::{MasterCommand, ShutdownPayload, TaskKind, WireError, WorkerReply};

use super::channel::{MasterEndpoint, serialized_pair};
use super::runtime::worker_main;

/// Worker life-cycle states as seen by the master
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Spawned, `Ready` not yet received
    Spawning,
    /// Ready for a command
    Idle,
    /// One command in flight
    Busy,
    /// Cooperative shutdown in progress
    Stopping,
    /// Process exited without being asked to
    Crashed,
}

/// The dispatched-but-unresolved task a busy worker owns
#[derive(Debug, Clone)]
pub struct InFlightTask {
    pub task_id: String,
    pub kind: TaskKind,
}

/// Correlated notifications forwarded to the orchestrator's single event
/// stream
#[derive(Debug)]
pub enum ProxyEvent {
    Ready {
        worker_id: String,
        pid: u32,
    },
    TaskCompleted {
        worker_id: String,
        task_id: String,
        kind: TaskKind,
        data: Value,
    },
    TaskFailed {
        worker_id: String,
        task_id: String,
        kind: TaskKind,
        error: WireError,
    },
    Idle {
        worker_id: String,
    },
    Crashed {
        worker_id: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerProxyError {
    /// Dispatching while not idle is a caller error; queue instead
    #[error("worker {worker_id} cannot accept a command in state {state:?}")]
    NotIdle {
        worker_id: String,
        state: WorkerState,
    },
    #[error("worker {0} command channel closed")]
    ChannelClosed(String),
}

#[derive(Debug)]
struct ProxyShared {
    state: WorkerState,
    current: Option<InFlightTask>,
}

/// Master-side handle to one worker
#[derive(Debug)]
pub struct WorkerProxy {
    worker_id: String,
    shared: Arc<Mutex<ProxyShared>>,
    commands: mpsc::Sender<Value>,
    worker_task: JoinHandle<()>,
    listener_task: JoinHandle<()>,
    bus: EventBus,
}

impl WorkerProxy {
    /// Spawn a worker runtime and the listener that correlates its replies
    ///
    /// `events_tx` is the orchestrator's single event stream; every proxy
    /// forwards into the same sender.
    #[must_use]
    pub fn spawn(
        worker_id: String,
        engine: Arc<dyn RenderEngine>,
        bus: EventBus,
        events_tx: mpsc::Sender<ProxyEvent>,
        channel_capacity: usize,
    ) -> Self {
        let (master_ep, worker_ep) = serialized_pair(channel_capacity);
        let MasterEndpoint { commands, replies } = master_ep;

        let shared = Arc::new(Mutex::new(ProxyShared {
            state: WorkerState::Spawning,
            current: None,
        }));

        let worker_task = tokio::spawn(worker_main(worker_ep, engine));
        let listener_task = tokio::spawn(listen(
            worker_id.clone(),
            replies,
            Arc::clone(&shared),
            bus.clone(),
            events_tx,
        ));

        Self {
            worker_id,
            shared,
            commands,
            worker_task,
            listener_task,
            bus,
        }
    }

    #[must_use]
    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    #[must_use]
    pub fn state(&self) -> WorkerState {
        self.shared.lock().state
    }

    #[must_use]
    pub fn current_task(&self) -> Option<InFlightTask> {
        self.shared.lock().current.clone()
    }

    /// Dispatch a task command; only valid while `Idle`
    ///
    /// Transitions to `Busy`, records the in-flight task id, and emits a
    /// task-started signal. Callers seeing `NotIdle` should queue instead.
    pub async fn dispatch_task(
        &self,
        task_id: &str,
        kind: TaskKind,
        command: &MasterCommand,
    ) -> Result<(), WorkerProxyError> {
        let frame = command
            .to_frame()
            .map_err(|_| WorkerProxyError::ChannelClosed(self.worker_id.clone()))?;

        {
            let mut shared = self.shared.lock();
            if shared.state != WorkerState::Idle {
                return Err(WorkerProxyError::NotIdle {
                    worker_id: self.worker_id.clone(),
                    state: shared.state,
                });
            }
            shared.state = WorkerState::Busy;
            shared.current = Some(InFlightTask {
                task_id: task_id.to_string(),
                kind,
            });
        }

        if self.commands.send(frame).await.is_err() {
            // Channel closed underneath us; the listener's crash path owns
            // the in-flight failure
            return Err(WorkerProxyError::ChannelClosed(self.worker_id.clone()));
        }

        self.bus.emit(MirrorEvent::task_started(
            self.worker_id.clone(),
            task_id.to_string(),
            kind,
        ));
        Ok(())
    }

    /// Send a control command (`Init`, `SetCookies`, `UpdateRegistry`)
    ///
    /// Control commands do not occupy the worker; the runtime handles
    /// them inline between tasks.
    pub async fn send_control(&self, command: &MasterCommand) -> Result<(), WorkerProxyError> {
        if self.state() == WorkerState::Crashed {
            return Err(WorkerProxyError::ChannelClosed(self.worker_id.clone()));
        }
        let frame = command
            .to_frame()
            .map_err(|_| WorkerProxyError::ChannelClosed(self.worker_id.clone()))?;
        self.commands
            .send(frame)
            .await
            .map_err(|_| WorkerProxyError::ChannelClosed(self.worker_id.clone()))
    }

    /// Begin cooperative shutdown
    pub async fn shutdown(&self, reason: &str) -> Result<(), WorkerProxyError> {
        {
            let mut shared = self.shared.lock();
            if shared.state == WorkerState::Crashed {
                return Ok(());
            }
            shared.state = WorkerState::Stopping;
        }
        let command = MasterCommand::Shutdown(ShutdownPayload {
            reason: reason.to_string(),
        });
        self.send_control(&command).await
    }

    /// Wait for the worker to exit, aborting after the grace period
    pub async fn join(self, grace: Duration) {
        {
            let mut shared = self.shared.lock();
            if shared.state != WorkerState::Crashed {
                shared.state = WorkerState::Stopping;
            }
        }
        // Closing the command channel ends the runtime loop even if the
        // Shutdown frame was never processed
        drop(self.commands);

        let mut worker = self.worker_task;
        if tokio::time::timeout(grace, &mut worker).await.is_err() {
            log::warn!("worker {} did not exit in {grace:?}, aborting", self.worker_id);
            worker.abort();
        }
        let mut listener = self.listener_task;
        if tokio::time::timeout(grace, &mut listener).await.is_err() {
            listener.abort();
        }
    }
}

/// Reply-stream listener: drives the proxy state machine
async fn listen(
    worker_id: String,
    mut replies: mpsc::Receiver<Value>,
    shared: Arc<Mutex<ProxyShared>>,
    bus: EventBus,
    events_tx: mpsc::Sender<ProxyEvent>,
) {
    while let Some(frame) = replies.recv().await {
        let reply = match WorkerReply::from_frame(&frame) {
            Ok(reply) => reply,
            Err(e) => {
                log::warn!("worker {worker_id}: rejected reply frame: {e}");
                continue;
            }
        };

        match reply {
            WorkerReply::Ready(payload) => {
                {
                    let mut s = shared.lock();
                    if s.state == WorkerState::Spawning {
                        s.state = WorkerState::Idle;
                    }
                }
                bus.emit(MirrorEvent::worker_ready(worker_id.clone(), payload.pid));
                let _ = events_tx
                    .send(ProxyEvent::Ready {
                        worker_id: worker_id.clone(),
                        pid: payload.pid,
                    })
                    .await;
            }
            WorkerReply::Result(payload) => {
                let inflight = {
                    let mut s = shared.lock();
                    s.current.take()
                };
                let Some(inflight) = inflight else {
                    log::warn!("worker {worker_id}: result with no task in flight, ignoring");
                    continue;
                };

                let kind = payload.task_type;
                match payload.into_outcome() {
                    Ok(data) => {
                        bus.emit(MirrorEvent::task_completed(
                            worker_id.clone(),
                            inflight.task_id.clone(),
                            kind,
                        ));
                        let _ = events_tx
                            .send(ProxyEvent::TaskCompleted {
                                worker_id: worker_id.clone(),
                                task_id: inflight.task_id.clone(),
                                kind,
                                data,
                            })
                            .await;
                    }
                    Err(error) => {
                        bus.emit(MirrorEvent::task_failed(
                            worker_id.clone(),
                            inflight.task_id.clone(),
                            kind,
                            error.to_string(),
                        ));
                        let _ = events_tx
                            .send(ProxyEvent::TaskFailed {
                                worker_id: worker_id.clone(),
                                task_id: inflight.task_id.clone(),
                                kind,
                                error,
                            })
                            .await;
                    }
                }

                {
                    let mut s = shared.lock();
                    if s.state == WorkerState::Busy {
                        s.state = WorkerState::Idle;
                    }
                }
                bus.emit(MirrorEvent::worker_idle(worker_id.clone()));
                let _ = events_tx
                    .send(ProxyEvent::Idle {
                        worker_id: worker_id.clone(),
                    })
                    .await;
            }
            WorkerReply::Log(payload) => {
                log::log!(
                    payload.level.into(),
                    "[worker {worker_id}] {}: {}",
                    payload.category,
                    payload.message
                );
            }
        }
    }

    // Reply channel closed: clean exit if we asked for it, crash otherwise
    let (was_stopping, inflight) = {
        let mut s = shared.lock();
        let was_stopping = s.state == WorkerState::Stopping;
        if !was_stopping {
            s.state = WorkerState::Crashed;
        }
        (was_stopping, s.current.take())
    };

    if was_stopping {
        log::debug!("worker {worker_id} exited cleanly");
        return;
    }

    // Force-fail the in-flight task exactly once so the queue's pending
    // count is not leaked
    if let Some(inflight) = inflight {
        let error = WireError::worker_crashed(&worker_id);
        bus.emit(MirrorEvent::task_failed(
            worker_id.clone(),
            inflight.task_id.clone(),
            inflight.kind,
            error.to_string(),
        ));
        let _ = events_tx
            .send(ProxyEvent::TaskFailed {
                worker_id: worker_id.clone(),
                task_id: inflight.task_id,
                kind: inflight.kind,
                error,
            })
            .await;
    }

    bus.emit(MirrorEvent::worker_crashed(
        worker_id.clone(),
        "reply channel closed unexpectedly".to_string(),
    ));
    let _ = events_tx
        .send(ProxyEvent::Crashed {
            worker_id: worker_id.clone(),
        })
        .await;
}
