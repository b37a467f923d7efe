//! Message type definitions and raw-frame validation
//!
//! Master→worker: `Init`, `Discover`, `Download`, `SetCookies`,
//! `UpdateRegistry`, `Shutdown`. Worker→master: `Ready`, `Result`, `Log`.
//! Payload field names follow the documented wire shapes (camelCase).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;

use super::errors::{ProtocolError, WireError};
use crate::engine::{Cookie, DiscoveredLink};

/// The closed set of message types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    Init,
    Discover,
    Download,
    SetCookies,
    UpdateRegistry,
    Shutdown,
    Ready,
    Result,
    Log,
}

impl MessageType {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "Init" => Some(Self::Init),
            "Discover" => Some(Self::Discover),
            "Download" => Some(Self::Download),
            "SetCookies" => Some(Self::SetCookies),
            "UpdateRegistry" => Some(Self::UpdateRegistry),
            "Shutdown" => Some(Self::Shutdown),
            "Ready" => Some(Self::Ready),
            "Result" => Some(Self::Result),
            "Log" => Some(Self::Log),
            _ => None,
        }
    }
}

/// Validate a raw frame before dispatch
///
/// This is the only structural check at the boundary: the frame must be an
/// object whose `type` field is a string naming a known message type.
/// Payload shape is trusted and checked only during typed deserialization.
pub fn validate_message(raw: &Value) -> Result<MessageType, ProtocolError> {
    let obj = raw.as_object().ok_or(ProtocolError::NotAnObject)?;
    let ty = obj.get("type").ok_or(ProtocolError::MissingType)?;
    let ty = ty.as_str().ok_or(ProtocolError::NonStringType)?;
    MessageType::parse(ty).ok_or_else(|| ProtocolError::UnknownType(ty.to_string()))
}

/// Task phase a command or result belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    Discover,
    Download,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Discover => write!(f, "discover"),
            Self::Download => write!(f, "download"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitPayload {
    pub worker_id: String,
    /// Opaque engine configuration, forwarded untouched
    pub config: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_registry: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverPayload {
    pub url: String,
    pub page_id: String,
    pub parent_id: Option<String>,
    pub depth: u32,
    pub is_first_page: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookies: Option<Vec<Cookie>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadPayload {
    pub url: String,
    pub page_id: String,
    pub parent_id: Option<String>,
    pub depth: u32,
    /// Absolute path the rendered page must be written to
    pub save_path: PathBuf,
    pub cookies: Vec<Cookie>,
    pub link_rewrite_map: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetCookiesPayload {
    pub cookies: Vec<Cookie>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRegistryPayload {
    pub title_registry: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShutdownPayload {
    pub reason: String,
}

/// Commands dispatched by the master
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum MasterCommand {
    Init(InitPayload),
    Discover(DiscoverPayload),
    Download(DownloadPayload),
    SetCookies(SetCookiesPayload),
    UpdateRegistry(UpdateRegistryPayload),
    Shutdown(ShutdownPayload),
}

impl MasterCommand {
    /// Serialize to the raw frame that crosses the worker channel
    pub fn to_frame(&self) -> Result<Value, ProtocolError> {
        serde_json::to_value(self).map_err(|e| ProtocolError::MalformedPayload(e.to_string()))
    }

    /// Validate and parse a raw frame received by a worker
    pub fn from_frame(raw: &Value) -> Result<Self, ProtocolError> {
        validate_message(raw)?;
        serde_json::from_value(raw.clone())
            .map_err(|e| ProtocolError::MalformedPayload(e.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyPayload {
    pub pid: u32,
}

/// Outcome of one dispatched task
///
/// `data` and `error` are mutually exclusive: success carries `data`,
/// failure carries `error`. Both present or both absent is a protocol
/// violation the receiver treats as failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultPayload {
    pub task_type: TaskKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<WireError>,
}

impl ResultPayload {
    /// Collapse the payload into a success value or a boundary error
    pub fn into_outcome(self) -> Result<Value, WireError> {
        match (self.data, self.error) {
            (Some(data), None) => Ok(data),
            (None, Some(error)) => Err(error),
            (Some(_), Some(error)) => Err(WireError::protocol_violation(&format!(
                "Result carried both data and error (error was: {error})"
            ))),
            (None, None) => Err(WireError::protocol_violation(
                "Result carried neither data nor error",
            )),
        }
    }
}

/// Log severity carried over the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogPayload {
    pub level: LogLevel,
    pub category: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Replies sent by a worker runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum WorkerReply {
    Ready(ReadyPayload),
    Result(ResultPayload),
    Log(LogPayload),
}

impl WorkerReply {
    /// Successful task result
    #[must_use]
    pub fn result_ok(task_type: TaskKind, data: Value) -> Self {
        Self::Result(ResultPayload {
            task_type,
            data: Some(data),
            error: None,
        })
    }

    /// Failed task result
    #[must_use]
    pub fn result_err(task_type: TaskKind, error: WireError) -> Self {
        Self::Result(ResultPayload {
            task_type,
            data: None,
            error: Some(error),
        })
    }

    /// Log line forwarded to the master's sink
    #[must_use]
    pub fn log(level: LogLevel, category: &str, message: impl Into<String>) -> Self {
        Self::Log(LogPayload {
            level,
            category: category.to_string(),
            message: message.into(),
            meta: None,
            timestamp: chrono::Utc::now(),
        })
    }

    pub fn to_frame(&self) -> Result<Value, ProtocolError> {
        serde_json::to_value(self).map_err(|e| ProtocolError::MalformedPayload(e.to_string()))
    }

    pub fn from_frame(raw: &Value) -> Result<Self, ProtocolError> {
        validate_message(raw)?;
        serde_json::from_value(raw.clone())
            .map_err(|e| ProtocolError::MalformedPayload(e.to_string()))
    }
}

/// Successful discovery result data
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverData {
    pub success: bool,
    pub page_id: String,
    pub url: String,
    pub resolved_title: String,
    pub links: Vec<DiscoveredLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookies: Option<Vec<Cookie>>,
}

/// Successful download result data
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadData {
    pub success: bool,
    pub page_id: String,
    pub url: String,
    pub saved_path: PathBuf,
    pub assets_downloaded: usize,
    pub links_rewritten: usize,
}
