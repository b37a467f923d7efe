//! Serialized channel pair joining the master to one worker
//!
//! Frames are `serde_json::Value`s: every command and reply round-trips
//! through JSON before the far side sees it, so nothing that could not
//! survive a real process boundary ever crosses. Swapping this pair for a
//! child-process stdio transport changes no protocol or proxy code.

use serde_json::Value;
use tokio::sync::mpsc;

/// Master-side endpoint: send commands, receive replies
#[derive(Debug)]
pub struct MasterEndpoint {
    pub commands: mpsc::Sender<Value>,
    pub replies: mpsc::Receiver<Value>,
}

/// Worker-side endpoint: receive commands, send replies
#[derive(Debug)]
pub struct WorkerEndpoint {
    pub commands: mpsc::Receiver<Value>,
    pub replies: mpsc::Sender<Value>,
}

/// Build a connected endpoint pair with the given per-direction capacity
#[must_use]
pub fn serialized_pair(capacity: usize) -> (MasterEndpoint, WorkerEndpoint) {
    let capacity = capacity.max(1);
    let (cmd_tx, cmd_rx) = mpsc::channel(capacity);
    let (reply_tx, reply_rx) = mpsc::channel(capacity);
    (
        MasterEndpoint {
            commands: cmd_tx,
            replies: reply_rx,
        },
        WorkerEndpoint {
            commands: cmd_rx,
            replies: reply_tx,
        },
    )
}
