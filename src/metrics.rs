// src/metrics.rs
use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Fails if one is already installed.
    pub fn init() -> Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        describe();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// One-time metrics registration (so series show up on /metrics).
pub fn describe() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("sync_runs_total", "Sync passes started.");
        describe_counter!("sync_items_posted_total", "Bookmarks published (or counted in dry runs).");
        describe_counter!("sync_items_skipped_total", "Bookmarks skipped as already published.");
        describe_counter!("sync_item_errors_total", "Bookmarks that failed to render, publish or record.");
        describe_counter!("sync_fetch_errors_total", "Sync passes aborted by a bookmark fetch failure.");
        describe_counter!("retry_attempts_total", "Retries scheduled after a failed attempt.");
        describe_histogram!("sync_duration_ms", "Sync pass wall time in milliseconds.");
        describe_gauge!("sync_last_success_ts", "Unix ts of the last checkpoint advance.");
    });
}
