//! Worker-side runtime loop
//!
//! Receives serialized commands, validates them, executes discover and
//! download tasks through the rendering engine, and replies with `Result`
//! frames. Commands are strictly serialized: the loop handles one frame
//! at a time, so a second task can never overtake the first.

use std::sync::Arc;

use serde_json::Value;

use crate::engine::{RenderEngine, WorkerSession};
use crate::protocol::{
    DiscoverData, DiscoverPayload, DownloadData, DownloadPayload, LogLevel, MasterCommand,
    TaskKind, WireError, WorkerReply,
};

use super::channel::WorkerEndpoint;

/// Run one worker until its command channel closes or `Shutdown` arrives
pub async fn worker_main(mut endpoint: WorkerEndpoint, engine: Arc<dyn RenderEngine>) {
    let ready = WorkerReply::Ready(crate::protocol::ReadyPayload {
        pid: std::process::id(),
    });
    if send_reply(&endpoint, &ready).await.is_err() {
        return;
    }

    let mut session = WorkerSession::default();

    while let Some(raw) = endpoint.commands.recv().await {
        let command = match MasterCommand::from_frame(&raw) {
            Ok(cmd) => cmd,
            Err(e) => {
                // Fatal to this message only, never to the worker
                let log = WorkerReply::log(
                    LogLevel::Warn,
                    "protocol",
                    format!("rejected command frame: {e}"),
                );
                let _ = send_reply(&endpoint, &log).await;
                continue;
            }
        };

        match command {
            MasterCommand::Init(payload) => {
                session.worker_id = payload.worker_id;
                if let Some(registry) = payload.title_registry {
                    session.title_registry.extend(registry);
                }
            }
            MasterCommand::SetCookies(payload) => {
                session.cookies = payload.cookies;
            }
            MasterCommand::UpdateRegistry(payload) => {
                session.title_registry.extend(payload.title_registry);
            }
            MasterCommand::Shutdown(payload) => {
                log::debug!(
                    "worker {} shutting down: {}",
                    session.worker_id,
                    payload.reason
                );
                break;
            }
            MasterCommand::Discover(payload) => {
                let reply = run_discover(&mut session, engine.as_ref(), payload).await;
                if send_reply(&endpoint, &reply).await.is_err() {
                    break;
                }
            }
            MasterCommand::Download(payload) => {
                let reply = run_download(&mut session, engine.as_ref(), payload).await;
                if send_reply(&endpoint, &reply).await.is_err() {
                    break;
                }
            }
        }
    }
}

async fn run_discover(
    session: &mut WorkerSession,
    engine: &dyn RenderEngine,
    payload: DiscoverPayload,
) -> WorkerReply {
    if let Some(cookies) = payload.cookies {
        session.cookies = cookies;
    }
    match engine
        .discover(session, &payload.url, payload.is_first_page)
        .await
    {
        Ok(page) => {
            if let Some(cookies) = &page.cookies {
                session.cookies = cookies.clone();
            }
            let data = DiscoverData {
                success: true,
                page_id: payload.page_id,
                url: payload.url,
                resolved_title: page.title,
                links: page.links,
                cookies: page.cookies,
            };
            match serde_json::to_value(&data) {
                Ok(value) => WorkerReply::result_ok(TaskKind::Discover, value),
                Err(e) => WorkerReply::result_err(
                    TaskKind::Discover,
                    WireError::from_error("TaskFailure", &anyhow::anyhow!(e)),
                ),
            }
        }
        Err(e) => {
            WorkerReply::result_err(TaskKind::Discover, WireError::from_error("TaskFailure", &e))
        }
    }
}

async fn run_download(
    session: &mut WorkerSession,
    engine: &dyn RenderEngine,
    payload: DownloadPayload,
) -> WorkerReply {
    session.cookies = payload.cookies.clone();
    match engine
        .render_and_save(
            session,
            &payload.url,
            &payload.save_path,
            &payload.link_rewrite_map,
        )
        .await
    {
        Ok(saved) => {
            let data = DownloadData {
                success: true,
                page_id: payload.page_id,
                url: payload.url,
                saved_path: payload.save_path,
                assets_downloaded: saved.assets_downloaded,
                links_rewritten: saved.links_rewritten,
            };
            match serde_json::to_value(&data) {
                Ok(value) => WorkerReply::result_ok(TaskKind::Download, value),
                Err(e) => WorkerReply::result_err(
                    TaskKind::Download,
                    WireError::from_error("TaskFailure", &anyhow::anyhow!(e)),
                ),
            }
        }
        Err(e) => {
            WorkerReply::result_err(TaskKind::Download, WireError::from_error("TaskFailure", &e))
        }
    }
}

async fn send_reply(endpoint: &WorkerEndpoint, reply: &WorkerReply) -> Result<(), ()> {
    let frame: Value = match reply.to_frame() {
        Ok(frame) => frame,
        Err(e) => {
            log::error!("failed to serialize worker reply: {e}");
            return Err(());
        }
    };
    endpoint.replies.send(frame).await.map_err(|_| ())
}
