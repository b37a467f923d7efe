//! Error types for the master/worker wire protocol

use serde::{Deserialize, Serialize};

/// Rejection reasons for a raw frame that fails [`validate_message`]
///
/// A malformed frame is fatal to that message only, never to the run.
///
/// [`validate_message`]: super::messages::validate_message
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Frame is not a JSON object
    #[error("invalid protocol message: not an object")]
    NotAnObject,

    /// Frame has no `type` field
    #[error("invalid protocol message: missing `type` field")]
    MissingType,

    /// The `type` field is present but not a string
    #[error("invalid protocol message: `type` is not a string")]
    NonStringType,

    /// The `type` string is not in the closed message set
    #[error("invalid protocol message: unknown type `{0}`")]
    UnknownType(String),

    /// A `Result` frame carried both or neither of `data`/`error`
    #[error("invalid protocol message: Result must carry exactly one of data/error")]
    AmbiguousResult,

    /// The payload failed to deserialize into the typed command
    #[error("invalid protocol message: malformed payload: {0}")]
    MalformedPayload(String),
}

/// Error shape that survives the serialization boundary
///
/// Errors raised inside a worker cannot cross the channel as live values;
/// they are flattened to this struct and reconstructed on the master side
/// as an equivalent error object. The stack is preserved as an opaque
/// string, not replayable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{name}: {message}")]
pub struct WireError {
    pub message: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl WireError {
    /// Flatten any error chain into a boundary-safe value
    pub fn from_error(name: impl Into<String>, err: &anyhow::Error) -> Self {
        Self {
            message: err.to_string(),
            name: name.into(),
            stack: Some(format!("{err:?}")),
            code: None,
        }
    }

    /// Synthetic failure attached to a task whose worker exited underneath it
    #[must_use]
    pub fn worker_crashed(worker_id: &str) -> Self {
        Self {
            message: format!("worker {worker_id} crashed with task in flight"),
            name: "WorkerCrash".to_string(),
            stack: None,
            code: Some("WORKER_CRASHED".to_string()),
        }
    }

    /// Failure recorded for queued tasks no surviving worker can run
    #[must_use]
    pub fn pool_exhausted(detail: &str) -> Self {
        Self {
            message: detail.to_string(),
            name: "WorkerCrash".to_string(),
            stack: None,
            code: Some("POOL_EXHAUSTED".to_string()),
        }
    }

    /// Failure synthesized from a malformed `Result` frame
    #[must_use]
    pub fn protocol_violation(detail: &str) -> Self {
        Self {
            message: detail.to_string(),
            name: "ProtocolViolation".to_string(),
            stack: None,
            code: Some("PROTOCOL_VIOLATION".to_string()),
        }
    }
}
