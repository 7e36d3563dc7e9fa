// src/sync/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::{SyncOptions, SyncOrchestrator, SyncResult};
use crate::diagnostics::DiagnosticsLog;

#[derive(Clone, Copy, Debug)]
pub struct SyncSchedulerCfg {
    pub interval: Duration,
    pub error_retention: chrono::Duration,
}

/// One scheduled pass: a default sync, then pruning of expired diagnostics.
pub async fn run_scheduled_tick(
    orchestrator: &SyncOrchestrator,
    diagnostics: &DiagnosticsLog,
    error_retention: chrono::Duration,
) -> SyncResult {
    let result = orchestrator.perform_sync(SyncOptions::default()).await;
    let pruned = diagnostics.clear_older_than(error_retention).await;

    tracing::info!(
        target: "sync",
        success = result.success,
        processed = result.items_processed,
        posted = result.items_posted,
        skipped = result.items_skipped,
        errors = result.errors.len(),
        pruned,
        "scheduled sync tick"
    );
    result
}

/// Spawn the periodic sync loop. The first tick fires immediately; ticks missed
/// while a slow run is in flight are skipped rather than bunched up.
pub fn spawn_sync_scheduler(
    cfg: SyncSchedulerCfg,
    orchestrator: Arc<SyncOrchestrator>,
    diagnostics: Arc<DiagnosticsLog>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(cfg.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            run_scheduled_tick(&orchestrator, &diagnostics, cfg.error_retention).await;
        }
    })
}
