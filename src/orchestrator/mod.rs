//! Top-level driver for one mirror run
//!
//! Phases run strictly in order: `Bootstrap → Discover (level by level)
//! → ConflictResolve → Download → Shutdown`. The orchestrator owns the
//! hierarchy, the title registry, and the worker pool; workers never
//! mutate shared state, they only return data the master folds in from
//! its single control flow.

pub mod pool;
pub mod report;

pub use pool::{available_memory, worker_pool_size};
pub use report::{FailedTask, MirrorReport};

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use tokio::sync::mpsc;

use crate::config::MirrorConfig;
use crate::engine::{Cookie, RenderEngine};
use crate::events::{EventBus, MirrorEvent, MirrorPhase, ShutdownReason};
use crate::hierarchy::{PageHierarchy, Registration, TitleRegistry, is_in_graph};
use crate::protocol::{
    DiscoverData, DiscoverPayload, DownloadData, DownloadPayload, InitPayload, MasterCommand,
    SetCookiesPayload, TaskKind, UpdateRegistryPayload, WireError,
};
use crate::queue::{DownloadAttachments, Task, TaskQueue};
use crate::resolver::{ConflictResolution, resolve_conflicts};
use crate::worker::{ProxyEvent, WorkerProxy, WorkerProxyError, WorkerState};

/// Failures that abort a run instead of being recorded in the report
#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("root page discovery failed: {0}")]
    RootDiscoveryFailed(String),
    /// A canonical context missing from the rewrite map is a programming
    /// error, never a recoverable condition
    #[error("canonical context `{0}` missing from rewrite map")]
    ResolutionInconsistency(String),
}

/// Drives one workspace mirror run end to end
pub struct MirrorOrchestrator {
    run_id: String,
    config: MirrorConfig,
    engine: Arc<dyn RenderEngine>,
    bus: EventBus,

    hierarchy: PageHierarchy,
    registry: TitleRegistry,
    cookies: Vec<Cookie>,

    workers: HashMap<String, WorkerProxy>,
    idle_workers: VecDeque<String>,
    events_tx: mpsc::Sender<ProxyEvent>,
    events_rx: mpsc::Receiver<ProxyEvent>,

    /// Dispatched tasks by id, kept for retry on failure
    in_flight: HashMap<String, Task>,
    retries: HashMap<(TaskKind, String), u32>,
    /// Ids newly registered while draining the current discovery level
    next_level: Vec<String>,

    pages_discovered: usize,
    pages_saved: usize,
    failed: Vec<FailedTask>,
    workers_spawned: usize,
    workers_crashed: usize,
}

impl MirrorOrchestrator {
    #[must_use]
    pub fn new(config: MirrorConfig, engine: Arc<dyn RenderEngine>) -> Self {
        let bus = EventBus::new(config.event_bus_capacity());
        // Sized to the pool's worth of concurrent replies; exact capacity
        // only affects backpressure, not correctness
        let (events_tx, events_rx) = mpsc::channel(config.channel_capacity().max(16));
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            config,
            engine,
            bus,
            hierarchy: PageHierarchy::new(),
            registry: TitleRegistry::new(),
            cookies: Vec::new(),
            workers: HashMap::new(),
            idle_workers: VecDeque::new(),
            events_tx,
            events_rx,
            in_flight: HashMap::new(),
            retries: HashMap::new(),
            next_level: Vec::new(),
            pages_discovered: 0,
            pages_saved: 0,
            failed: Vec::new(),
            workers_spawned: 0,
            workers_crashed: 0,
        }
    }

    /// The run's event bus, for subscribing before [`run`](Self::run)
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    /// Execute the full mirror run
    ///
    /// Individual task failures are recorded in the report; only setup
    /// failures (unreachable root, no worker) abort with an error.
    pub async fn run(mut self) -> Result<MirrorReport> {
        let started = Instant::now();
        log::info!("mirror run {} starting: {}", self.run_id, self.config.start_url());
        self.bus.emit(MirrorEvent::mirror_started(
            self.run_id.clone(),
            self.config.start_url().to_string(),
            self.config.output_dir().clone(),
            self.config.max_depth(),
        ));

        let bootstrap = self.bootstrap().await;
        let run_result = match bootstrap {
            Ok(()) => self.crawl().await,
            Err(e) => Err(e),
        };

        self.change_phase(MirrorPhase::Shutdown);
        self.shutdown_workers("run finished").await;

        let resolution_stats = match run_result {
            Ok(stats) => stats,
            Err(e) => {
                self.bus
                    .shutdown_gracefully(ShutdownReason::Error(e.to_string()))
                    .await;
                return Err(e);
            }
        };

        let mut report = MirrorReport {
            run_id: self.run_id.clone(),
            start_url: self.config.start_url().to_string(),
            pages_discovered: self.pages_discovered,
            pages_saved: self.pages_saved,
            duplicates_resolved: 0,
            failed_tasks: std::mem::take(&mut self.failed),
            workers_spawned: self.workers_spawned,
            workers_crashed: self.workers_crashed,
            duration: started.elapsed(),
        };
        report.apply_resolution_stats(resolution_stats);

        self.bus.emit(MirrorEvent::mirror_completed(
            report.pages_discovered,
            report.pages_saved,
            report.failed_tasks.len(),
            report.duration,
        ));
        self.bus
            .shutdown_gracefully(ShutdownReason::RunCompleted)
            .await;

        log::info!(
            "mirror run finished: {} discovered, {} saved, {} failed in {:?}",
            report.pages_discovered,
            report.pages_saved,
            report.failed_tasks.len(),
            report.duration
        );
        Ok(report)
    }

    /// Bootstrap: one worker, root discovery, cookie capture
    async fn bootstrap(&mut self) -> Result<()> {
        self.change_phase(MirrorPhase::Bootstrap);

        let root_id = self
            .hierarchy
            .register_root(self.config.start_url())
            .context("registering root page")?;
        self.spawn_worker().await?;

        let root_ctx = self
            .hierarchy
            .get(&root_id)
            .cloned()
            .context("root context missing after registration")?;
        let mut queue = TaskQueue::new(TaskKind::Discover, self.bus.clone());
        queue.enqueue(Task::discover(root_ctx));
        self.drive_queue(&mut queue).await?;

        if let Some(failure) = self.failed.iter().find(|f| f.page_id == root_id) {
            return Err(MirrorError::RootDiscoveryFailed(failure.error.clone()).into());
        }
        if self.pages_discovered == 0 {
            return Err(
                MirrorError::RootDiscoveryFailed("no discovery result received".into()).into(),
            );
        }
        Ok(())
    }

    /// Discover levels, resolve conflicts, download canonical pages
    async fn crawl(&mut self) -> Result<crate::resolver::ResolutionStats> {
        self.grow_pool().await?;
        self.broadcast(&MasterCommand::SetCookies(SetCookiesPayload {
            cookies: self.cookies.clone(),
        }))
        .await;

        self.change_phase(MirrorPhase::Discover);
        let mut level = std::mem::take(&mut self.next_level);
        for depth in 1..=self.config.max_depth() {
            if level.is_empty() {
                log::debug!("discovery exhausted at depth {depth}");
                break;
            }
            log::info!("discovering depth {depth}: {} pages", level.len());
            let mut queue = TaskQueue::new(TaskKind::Discover, self.bus.clone());
            for id in &level {
                if let Some(ctx) = self.hierarchy.get(id) {
                    queue.enqueue(Task::discover(ctx.clone()));
                }
            }
            self.drive_queue(&mut queue).await?;
            level = std::mem::take(&mut self.next_level);
        }

        self.change_phase(MirrorPhase::ConflictResolve);
        let resolution = resolve_conflicts(self.hierarchy.all_contexts(), &self.registry);
        for id in resolution.canonical.keys() {
            if !resolution.rewrite_map.contains_key(id) {
                return Err(MirrorError::ResolutionInconsistency(id.clone()).into());
            }
        }

        self.change_phase(MirrorPhase::Download);
        self.download(&resolution).await?;
        Ok(resolution.stats)
    }

    async fn download(&mut self, resolution: &ConflictResolution) -> Result<()> {
        let mut queue = TaskQueue::new(TaskKind::Download, self.bus.clone());
        // Registration order keeps dispatch deterministic. Pages whose
        // discovery failed permanently have nothing to render and stay
        // out of the mirror; their failure is already on the report.
        let undiscovered: std::collections::HashSet<&str> = self
            .failed
            .iter()
            .filter(|f| f.kind == TaskKind::Discover)
            .map(|f| f.page_id.as_str())
            .collect();
        let canonical_ids: Vec<String> = self
            .hierarchy
            .contexts()
            .map(|c| c.id.clone())
            .filter(|id| {
                resolution.canonical.contains_key(id) && !undiscovered.contains(id.as_str())
            })
            .collect();
        for id in canonical_ids {
            let Some(ctx) = resolution.canonical.get(&id) else {
                continue;
            };
            let attachments = DownloadAttachments {
                save_path: ctx.save_path(self.config.output_dir()),
                rewrite_map: resolution.rewrite_map.clone(),
            };
            queue.enqueue(Task::download(ctx.clone(), attachments));
        }
        self.drive_queue(&mut queue).await
    }

    /// Dispatch and fold events until the queue reaches all-idle
    async fn drive_queue(&mut self, queue: &mut TaskQueue) -> Result<()> {
        loop {
            self.dispatch_available(queue).await?;
            if queue.is_all_idle() {
                return Ok(());
            }
            if !self.has_live_worker() {
                self.fail_remaining(queue, "worker pool exhausted");
                if queue.is_all_idle() {
                    return Ok(());
                }
                // In-flight force-fail events are still owed by listeners
            }
            let Some(event) = self.events_rx.recv().await else {
                bail!("worker event stream closed unexpectedly");
            };
            self.handle_event(event, queue).await?;
        }
    }

    async fn dispatch_available(&mut self, queue: &mut TaskQueue) -> Result<()> {
        while !queue.is_empty() {
            let Some(worker_id) = self.idle_workers.pop_front() else {
                break;
            };
            let Some(proxy) = self.workers.get(&worker_id) else {
                continue;
            };
            if proxy.state() != WorkerState::Idle {
                continue;
            }
            let Some((task, _)) = queue.next() else {
                break;
            };
            let command = self.command_for(&task)?;
            match proxy.dispatch_task(&task.id, task.kind, &command).await {
                Ok(()) => {
                    self.in_flight.insert(task.id.clone(), task);
                }
                Err(WorkerProxyError::NotIdle { .. }) => {
                    // Worker state changed under us; the proxy never
                    // recorded the task, so it goes back on the queue
                    queue.mark_complete(&task.id);
                    queue.requeue(task);
                }
                Err(e @ WorkerProxyError::ChannelClosed(_)) => {
                    // The proxy recorded the task before the send failed;
                    // the crash path force-fails it through the normal
                    // failure route
                    log::warn!("dispatch of {} to {worker_id} failed: {e}", task.id);
                    self.in_flight.insert(task.id.clone(), task);
                }
            }
        }
        Ok(())
    }

    fn command_for(&self, task: &Task) -> Result<MasterCommand> {
        match task.kind {
            TaskKind::Discover => Ok(MasterCommand::Discover(DiscoverPayload {
                url: task.context.url.clone(),
                page_id: task.id.clone(),
                parent_id: task.context.parent_id.clone(),
                depth: task.context.depth,
                is_first_page: task.context.is_root(),
                cookies: (!self.cookies.is_empty()).then(|| self.cookies.clone()),
            })),
            TaskKind::Download => {
                let attachments = task
                    .attachments
                    .as_ref()
                    .context("download task without attachments")?;
                Ok(MasterCommand::Download(DownloadPayload {
                    url: task.context.url.clone(),
                    page_id: task.id.clone(),
                    parent_id: task.context.parent_id.clone(),
                    depth: task.context.depth,
                    save_path: attachments.save_path.clone(),
                    cookies: self.cookies.clone(),
                    link_rewrite_map: attachments.rewrite_map.clone(),
                }))
            }
        }
    }

    async fn handle_event(&mut self, event: ProxyEvent, queue: &mut TaskQueue) -> Result<()> {
        match event {
            ProxyEvent::Ready { worker_id, pid } => {
                log::debug!("worker {worker_id} ready (pid {pid})");
                self.mark_idle(worker_id);
            }
            ProxyEvent::Idle { worker_id } => {
                self.mark_idle(worker_id);
            }
            ProxyEvent::TaskCompleted {
                task_id,
                kind,
                data,
                ..
            } => {
                queue.mark_complete(&task_id);
                let Some(task) = self.in_flight.remove(&task_id) else {
                    log::warn!("completion for untracked task {task_id}");
                    return Ok(());
                };
                match kind {
                    TaskKind::Discover => match serde_json::from_value::<DiscoverData>(data) {
                        Ok(result) => self.fold_discover(&task, result).await?,
                        Err(e) => self.record_failure(
                            &task,
                            &WireError::protocol_violation(&format!(
                                "malformed discover data: {e}"
                            )),
                        ),
                    },
                    TaskKind::Download => match serde_json::from_value::<DownloadData>(data) {
                        Ok(result) => self.fold_download(&result),
                        Err(e) => self.record_failure(
                            &task,
                            &WireError::protocol_violation(&format!(
                                "malformed download data: {e}"
                            )),
                        ),
                    },
                }
            }
            ProxyEvent::TaskFailed { task_id, error, .. } => {
                queue.mark_complete(&task_id);
                let Some(task) = self.in_flight.remove(&task_id) else {
                    log::warn!("failure for untracked task {task_id}");
                    return Ok(());
                };
                let retry_limit = self.config.task_retry_limit();
                let has_live_worker = self.has_live_worker();
                let attempts = self
                    .retries
                    .entry((task.kind, task.id.clone()))
                    .or_insert(0);
                if *attempts < retry_limit && has_live_worker {
                    *attempts += 1;
                    log::warn!(
                        "{} task {} failed ({error}), retry {attempts}",
                        task.kind,
                        task.id
                    );
                    queue.requeue(task);
                } else {
                    self.record_failure(&task, &error);
                }
            }
            ProxyEvent::Crashed { worker_id } => {
                self.workers_crashed += 1;
                self.idle_workers.retain(|w| w != &worker_id);
                self.workers.remove(&worker_id);
                log::error!(
                    "worker {worker_id} crashed, continuing with {} workers",
                    self.workers.len()
                );
            }
        }
        Ok(())
    }

    /// Fold one discovery result into the hierarchy and registry
    async fn fold_discover(&mut self, task: &Task, data: DiscoverData) -> Result<()> {
        self.pages_discovered += 1;
        self.registry.resolve(&task.id, &data.resolved_title);
        self.hierarchy.resolve_title(&task.id, &data.resolved_title);

        if task.context.is_root() {
            if let Some(cookies) = data.cookies {
                log::debug!("captured {} bootstrap cookies", cookies.len());
                self.cookies = cookies;
            }
        }

        let mut links_found = 0;
        // Links below the depth cutoff are left unregistered; hrefs to
        // them fall back to their original URLs at render time
        if task.context.depth < self.config.max_depth() {
            for link in &data.links {
                if !is_in_graph(&link.url, self.config.workspace_host()) {
                    continue;
                }
                links_found += 1;
                match self.hierarchy.register_link(&task.id, link) {
                    Ok(Registration::New(id)) => self.next_level.push(id),
                    Ok(_) => {}
                    Err(e) => log::warn!("registering link from {}: {e}", task.id),
                }
            }
        }

        self.bus.emit(MirrorEvent::page_discovered(
            task.id.clone(),
            task.context.url.clone(),
            task.context.depth,
            links_found,
        ));

        let delta = self.registry.take_delta();
        if !delta.is_empty() {
            self.broadcast(&MasterCommand::UpdateRegistry(UpdateRegistryPayload {
                title_registry: delta,
            }))
            .await;
        }
        Ok(())
    }

    fn fold_download(&mut self, data: &DownloadData) {
        self.pages_saved += 1;
        self.bus.emit(MirrorEvent::page_saved(
            data.page_id.clone(),
            data.saved_path.clone(),
            data.assets_downloaded,
            data.links_rewritten,
        ));
    }

    fn record_failure(&mut self, task: &Task, error: &WireError) {
        log::error!("{} task {} failed permanently: {error}", task.kind, task.id);
        self.failed.push(FailedTask {
            page_id: task.id.clone(),
            url: task.context.url.clone(),
            kind: task.kind,
            error: error.to_string(),
        });
    }

    fn mark_idle(&mut self, worker_id: String) {
        let is_idle = self
            .workers
            .get(&worker_id)
            .is_some_and(|p| p.state() == WorkerState::Idle);
        if is_idle && !self.idle_workers.contains(&worker_id) {
            self.idle_workers.push_back(worker_id);
        }
    }

    fn has_live_worker(&self) -> bool {
        self.workers
            .values()
            .any(|p| p.state() != WorkerState::Crashed)
    }

    async fn spawn_worker(&mut self) -> Result<()> {
        let worker_id = format!("worker-{}", self.workers_spawned);
        self.workers_spawned += 1;
        let proxy = WorkerProxy::spawn(
            worker_id.clone(),
            Arc::clone(&self.engine),
            self.bus.clone(),
            self.events_tx.clone(),
            self.config.channel_capacity(),
        );
        proxy
            .send_control(&MasterCommand::Init(InitPayload {
                worker_id: worker_id.clone(),
                config: self.config.worker_init_config(),
                title_registry: Some(self.registry.snapshot()),
            }))
            .await
            .with_context(|| format!("initializing {worker_id}"))?;
        if !self.cookies.is_empty() {
            let _ = proxy
                .send_control(&MasterCommand::SetCookies(SetCookiesPayload {
                    cookies: self.cookies.clone(),
                }))
                .await;
        }
        self.workers.insert(worker_id, proxy);
        Ok(())
    }

    /// Grow the pool to its memory-derived size after bootstrap
    async fn grow_pool(&mut self) -> Result<()> {
        let target = worker_pool_size(
            available_memory(),
            self.config.worker_memory_budget_bytes(),
            self.config.max_workers(),
        );
        log::info!("worker pool target: {target}");
        while self.workers.len() < target {
            self.spawn_worker().await?;
        }
        Ok(())
    }

    async fn broadcast(&self, command: &MasterCommand) {
        for proxy in self.workers.values() {
            if let Err(e) = proxy.send_control(command).await {
                log::warn!("broadcast to {} failed: {e}", proxy.worker_id());
            }
        }
    }

    /// Drain the queue when no worker can ever pick the tasks up
    fn fail_remaining(&mut self, queue: &mut TaskQueue, reason: &str) {
        while let Some((task, _)) = queue.next() {
            queue.mark_complete(&task.id);
            let error = WireError::pool_exhausted(reason);
            self.record_failure(&task, &error);
        }
    }

    async fn shutdown_workers(&mut self, reason: &str) {
        let grace = self.config.shutdown_grace();
        let workers: Vec<WorkerProxy> = self.workers.drain().map(|(_, p)| p).collect();
        for proxy in &workers {
            if let Err(e) = proxy.shutdown(reason).await {
                log::debug!("shutdown of {} failed: {e}", proxy.worker_id());
            }
        }
        futures::future::join_all(workers.into_iter().map(|p| p.join(grace))).await;
        self.idle_workers.clear();
    }

    fn change_phase(&self, phase: MirrorPhase) {
        log::info!("entering phase {phase:?}");
        self.bus.emit(MirrorEvent::phase_changed(phase));
    }
}
