//! Worker pool plumbing: serialized channels, the worker runtime loop,
//! and the master-side proxy state machine.

pub mod channel;
pub mod proxy;
pub mod runtime;

pub use channel::{MasterEndpoint, WorkerEndpoint, serialized_pair};
pub use proxy::{InFlightTask, ProxyEvent, WorkerProxy, WorkerProxyError, WorkerState};
pub use runtime::worker_main;
