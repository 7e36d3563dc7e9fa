// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod auth;
pub mod config;
pub mod content;
pub mod diagnostics;
pub mod error;
pub mod metrics;
pub mod publish;
pub mod retry;
pub mod source;
pub mod store;
pub mod sync;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub use crate::api::{create_router, AppState};
pub use crate::config::SyncConfig;
pub use crate::error::SyncError;
pub use crate::sync::{SyncOptions, SyncOrchestrator, SyncResult};

use crate::publish::wordpress::WordPressClient;
use crate::source::raindrop::RaindropClient;
use crate::store::FileKv;

/// Install the global tracing subscriber. `LOG_FORMAT=json` switches to JSON
/// lines; `RUST_LOG` overrides the default filter. A second call is a no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("linkpost_sync=info,warn"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Production wiring: Raindrop source, WordPress publisher, file-backed state.
pub async fn build_state(cfg: &SyncConfig) -> anyhow::Result<AppState> {
    let kv = FileKv::open(&cfg.state_file)
        .await
        .with_context(|| format!("opening state file {}", cfg.state_file.display()))?;
    let source = RaindropClient::from_config(cfg)?;
    let publisher = WordPressClient::from_config(cfg)?;

    tracing::info!(
        tag = %cfg.raindrop_tag,
        endpoint = %publisher.endpoint(),
        state_file = %cfg.state_file.display(),
        dry_run = cfg.dry_run,
        "sync service configured"
    );
    Ok(AppState::from_parts(
        cfg,
        Arc::new(source),
        Arc::new(publisher),
        Arc::new(kv),
    ))
}
