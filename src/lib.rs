//! pagevault — coordinated mirroring of hierarchical authenticated
//! workspaces into self-contained offline copies.
//!
//! One master control flow drives a pool of workers over a serialized
//! message channel: a bootstrap worker captures session cookies, the
//! workspace is discovered level by level into a page hierarchy,
//! duplicate page identities collapse to canonical survivors, and each
//! canonical page is rendered and saved with its internal links
//! rewritten to relative paths. The browser-side work lives behind the
//! [`engine::RenderEngine`] seam; this crate owns everything else.

pub mod config;
pub mod engine;
pub mod events;
pub mod hierarchy;
pub mod orchestrator;
pub mod paths;
pub mod protocol;
pub mod queue;
pub mod resolver;
pub mod worker;

pub use config::MirrorConfig;
pub use engine::{Cookie, DiscoveredLink, DiscoveredPage, RenderEngine, SavedPage, WorkerSession};
pub use events::{EventBus, MirrorEvent, MirrorPhase, ShutdownReason};
pub use hierarchy::{PageContext, PageHierarchy, TitleRegistry};
pub use orchestrator::{FailedTask, MirrorOrchestrator, MirrorReport};
pub use paths::{BlockAnchorCache, PathStrategy, ResolveOptions, resolve_href};
pub use protocol::{MasterCommand, MessageType, ProtocolError, TaskKind, WireError, WorkerReply};
pub use queue::{QueueSignal, Task, TaskQueue};
pub use resolver::{ConflictResolution, resolve_conflicts};
pub use worker::{ProxyEvent, WorkerProxy, WorkerState};

use std::sync::Arc;

use anyhow::Result;

/// Mirror one workspace end to end and return the run report
///
/// Convenience wrapper over [`MirrorOrchestrator`]; construct the
/// orchestrator directly to subscribe to events before the run starts.
pub async fn mirror(config: MirrorConfig, engine: Arc<dyn RenderEngine>) -> Result<MirrorReport> {
    MirrorOrchestrator::new(config, engine).run().await
}
