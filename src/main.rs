//! Linkpost sync service: binary entrypoint.
//! Loads configuration, starts the periodic sync loop and serves the
//! operational HTTP endpoints.

use linkpost_sync::metrics::Metrics;
use linkpost_sync::sync::scheduler::{spawn_sync_scheduler, SyncSchedulerCfg};
use linkpost_sync::{build_state, create_router, init_tracing, SyncConfig};
use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = SyncConfig::load_default().map_err(anyhow::Error::from)?;
    let state = build_state(&cfg).await?;
    let metrics = Metrics::init()?;

    spawn_sync_scheduler(
        SyncSchedulerCfg {
            interval: cfg.sync_interval,
            error_retention: cfg.error_retention(),
        },
        state.orchestrator.clone(),
        state.diagnostics.clone(),
    );

    let router = create_router(state).merge(metrics.router());
    Ok(router.into())
}
