//! End-to-end mirror runs against a scripted engine

mod common;

use std::sync::Arc;

use anyhow::Result;
use tempfile::TempDir;

use common::ScriptedEngine;
use pagevault::config::MirrorConfig;
use pagevault::events::{MirrorEvent, MirrorPhase};
use pagevault::orchestrator::MirrorOrchestrator;

const ROOT: &str = "https://ws.example/Root-aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const LAB1: &str = "https://ws.example/Lab1-bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
const LAB1_ALT: &str = "https://ws.example/Lab-One-bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
const LAB2: &str = "https://ws.example/Lab2-cccccccccccccccccccccccccccccccc";
const NOTES: &str = "https://ws.example/Notes-dddddddddddddddddddddddddddddddd";
const EXTERNAL: &str = "https://other.example/NotOurs";

fn workspace_engine() -> ScriptedEngine {
    common::init_logging();
    ScriptedEngine::new()
        .page(
            ROOT,
            "Workspace Root",
            &[
                (LAB1, "Lab1"),
                (LAB2, "Lab2"),
                // Same page identity reached through a second URL
                (LAB1_ALT, "Lab One Again"),
                (EXTERNAL, "Elsewhere"),
            ],
        )
        .page(LAB1, "Lab1", &[(NOTES, "Notes")])
        .page(LAB2, "Lab2", &[])
        .page(NOTES, "Notes", &[])
}

fn config(output: &TempDir) -> MirrorConfig {
    MirrorConfig::builder()
        .output_dir(output.path())
        .start_url(ROOT)
        .max_depth(2)
        .max_workers(2)
        .shutdown_grace_secs(2)
        .build()
        .expect("config")
}

#[tokio::test]
async fn full_run_mirrors_the_workspace() -> Result<()> {
    let output = TempDir::new()?;
    let engine = Arc::new(workspace_engine());
    let orchestrator = MirrorOrchestrator::new(config(&output), Arc::clone(&engine) as _);
    let mut events = orchestrator.event_bus().subscribe();

    let report = orchestrator.run().await?;

    assert_eq!(report.pages_discovered, 4);
    assert_eq!(report.pages_saved, 4);
    assert_eq!(report.duplicates_resolved, 1);
    assert!(!report.has_failures(), "failures: {:?}", report.failed_tasks);
    assert_eq!(report.workers_spawned, 2);
    assert_eq!(report.workers_crashed, 0);

    // One file per canonical identity, under title-derived segments
    let saved = engine.saved.lock();
    assert_eq!(saved.len(), 4);
    let mut paths: Vec<_> = saved
        .iter()
        .map(|s| {
            s.save_path
                .strip_prefix(output.path())
                .expect("under output dir")
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    paths.sort();
    assert_eq!(
        paths,
        vec![
            "Lab1/Notes/index.html",
            "Lab1/index.html",
            "Lab2/index.html",
            "index.html",
        ]
    );

    // Bootstrap cookies reached every download; the rewrite map is the
    // full canonical set
    for call in saved.iter() {
        assert!(call.cookies_seen > 0, "no cookies for {}", call.url);
        assert_eq!(call.rewrite_entries, 4);
    }
    drop(saved);

    // Phases in order, completion event published
    let mut phases = Vec::new();
    let mut completed = false;
    while let Ok(event) = events.try_recv() {
        match event {
            MirrorEvent::PhaseChanged { phase, .. } => phases.push(phase),
            MirrorEvent::MirrorCompleted { .. } => completed = true,
            _ => {}
        }
    }
    assert_eq!(
        phases,
        vec![
            MirrorPhase::Bootstrap,
            MirrorPhase::Discover,
            MirrorPhase::ConflictResolve,
            MirrorPhase::Download,
            MirrorPhase::Shutdown,
        ]
    );
    assert!(completed);
    Ok(())
}

#[tokio::test]
async fn crashed_worker_task_is_retried_on_a_healthy_worker() -> Result<()> {
    let output = TempDir::new()?;
    let engine = Arc::new(workspace_engine().panic_once(LAB2));
    let orchestrator = MirrorOrchestrator::new(config(&output), Arc::clone(&engine) as _);

    let report = orchestrator.run().await?;

    assert_eq!(report.workers_crashed, 1);
    assert!(!report.has_failures(), "failures: {:?}", report.failed_tasks);
    assert_eq!(report.pages_discovered, 4, "crashed task recovered on retry");
    assert_eq!(report.pages_saved, 4);
    Ok(())
}

#[tokio::test]
async fn unreachable_root_aborts_the_run() {
    let output = TempDir::new().expect("tempdir");
    let engine = Arc::new(workspace_engine().fail_always(ROOT));
    let orchestrator = MirrorOrchestrator::new(config(&output), engine);

    let error = orchestrator.run().await.expect_err("run must abort");
    assert!(
        error.to_string().contains("root page discovery failed"),
        "unexpected error: {error}"
    );
}

#[tokio::test]
async fn single_task_failures_are_reported_not_fatal() -> Result<()> {
    let output = TempDir::new()?;
    let engine = Arc::new(workspace_engine().fail_always(LAB2));
    let orchestrator = MirrorOrchestrator::new(config(&output), engine);

    let report = orchestrator.run().await?;

    assert!(report.has_failures());
    assert_eq!(report.failed_tasks.len(), 1);
    assert_eq!(report.failed_tasks[0].url, LAB2);
    // Lab2 was never discovered, so it is absent from the mirror; the
    // rest of the workspace still arrives
    assert_eq!(report.pages_discovered, 3);
    assert_eq!(report.pages_saved, 3);
    Ok(())
}
