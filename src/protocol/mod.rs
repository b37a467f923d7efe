//! Wire protocol between the master control flow and worker runtimes
//!
//! Every master→worker command and worker→master reply crosses the channel
//! as a serialized `{ "type": ..., "payload": ... }` frame. The closed set
//! of message types is the only structural contract enforced at the
//! boundary; payload shapes are trusted once the type is recognized.

pub mod errors;
pub mod messages;

pub use errors::{ProtocolError, WireError};
pub use messages::{
    DiscoverData, DiscoverPayload, DownloadData, DownloadPayload, InitPayload, LogLevel,
    LogPayload, MasterCommand, MessageType, ReadyPayload, ResultPayload, SetCookiesPayload,
    ShutdownPayload, TaskKind, UpdateRegistryPayload, WorkerReply, validate_message,
};
