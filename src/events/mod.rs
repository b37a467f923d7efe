//! Mirror run event system
//!
//! A broadcast bus owned by the orchestrator; queue and worker proxies
//! receive a clone at construction time.

pub mod bus;
pub mod errors;
pub mod metrics;
pub mod types;

pub use bus::EventBus;
pub use errors::EventBusError;
pub use metrics::{EventBusMetrics, MetricsSnapshot};
pub use types::{MirrorEvent, MirrorPhase, ShutdownReason};
