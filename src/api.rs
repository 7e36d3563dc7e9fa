// src/api.rs
use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::auth::require_token;
use crate::config::SyncConfig;
use crate::content::ContentBuilder;
use crate::diagnostics::{Diagnostics, DiagnosticsLog};
use crate::error::{SyncError, Upstream};
use crate::publish::{NewPost, Publisher};
use crate::source::BookmarkSource;
use crate::store::{KvBackend, KvStateStore, StateStore};
use crate::sync::{SyncOptions, SyncOrchestrator, SyncResult, SyncSettings};

const DEFAULT_ERRORS_LIMIT: usize = 50;
const MAX_ERRORS_LIMIT: usize = 100;
const DEFAULT_RESET_DAYS: i64 = 90;
const PREVIEW_ITEMS: usize = 3;

const TEST_POST_TITLE: &str = "Test Post - Linkpost Sync";
const TEST_POST_NOTE: &str =
    "This is a test post created by the sync service to verify WordPress API connectivity.";
const TEST_POST_LINK: &str = "https://example.com";

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SyncOrchestrator>,
    pub source: Arc<dyn BookmarkSource>,
    pub publisher: Arc<dyn Publisher>,
    pub store: Arc<dyn StateStore>,
    pub diagnostics: Arc<DiagnosticsLog>,
    pub trigger_token: Arc<str>,
    pub default_tag: Arc<str>,
}

impl AppState {
    /// Wire the pipeline around one key-value backend shared by state and diagnostics.
    pub fn from_parts(
        cfg: &SyncConfig,
        source: Arc<dyn BookmarkSource>,
        publisher: Arc<dyn Publisher>,
        kv: Arc<dyn KvBackend>,
    ) -> Self {
        let store: Arc<dyn StateStore> = Arc::new(KvStateStore::new(kv.clone()));
        let diagnostics = Arc::new(DiagnosticsLog::new(kv, cfg.error_retention()));
        let orchestrator = Arc::new(SyncOrchestrator::new(
            source.clone(),
            publisher.clone(),
            store.clone(),
            diagnostics.clone(),
            SyncSettings::from_config(cfg),
        ));
        Self {
            orchestrator,
            source,
            publisher,
            store,
            diagnostics,
            trigger_token: Arc::from(cfg.trigger_token.as_str()),
            default_tag: Arc::from(cfg.raindrop_tag.as_str()),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/trigger", get(trigger))
        .route("/test-raindrop", get(test_raindrop))
        .route("/test-wordpress", get(test_wordpress))
        .route("/errors", get(recent_errors))
        .route("/test-errors", get(test_errors))
        .route("/reset-timestamp", get(reset_timestamp))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .merge(protected)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn error_response(status: StatusCode, message: String) -> Response {
    tracing::warn!(status = status.as_u16(), %message, "request failed");
    (status, Json(json!({ "error": message }))).into_response()
}

fn non_empty<'a>(q: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    q.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

async fn trigger(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Json<SyncResult> {
    let options = SyncOptions {
        tag: non_empty(&q, "tag").map(str::to_string),
        limit: non_empty(&q, "limit").and_then(|l| l.parse::<usize>().ok()),
        dry_run: Some(q.get("dry_run").is_some_and(|v| v == "true")),
    };
    Json(state.orchestrator.perform_sync(options).await)
}

async fn test_raindrop(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    let tag = non_empty(&q, "tag").unwrap_or(&state.default_tag).to_string();

    match state.source.fetch(&tag, None).await {
        Ok(items) => {
            let preview: Vec<Value> = items
                .iter()
                .take(PREVIEW_ITEMS)
                .map(|i| {
                    json!({
                        "id": i.id,
                        "title": i.title,
                        "link": i.link,
                        "created": i.created,
                        "tags": i.tags,
                    })
                })
                .collect();
            Json(json!({
                "success": true,
                "message": format!("Found {} bookmarks with tag \"{tag}\"", items.len()),
                "items": preview,
            }))
            .into_response()
        }
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{} API error: {e}", state.source.name()),
        ),
    }
}

async fn test_wordpress(State(state): State<AppState>) -> Response {
    let content = match ContentBuilder::new().build_post_content(TEST_POST_NOTE, TEST_POST_TITLE, TEST_POST_LINK) {
        Ok(c) => c,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    let post = NewPost::link(TEST_POST_TITLE, content).as_draft();

    match state.publisher.publish(&post).await {
        Ok(created) => Json(json!({
            "success": true,
            "message": format!("{} API test successful", state.publisher.name()),
            "post": {
                "id": created.id,
                "title": created.title.rendered,
                "status": created.status,
                "format": created.format,
                "link": created.link,
            },
        }))
        .into_response(),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{} API error: {e}", state.publisher.name()),
        ),
    }
}

async fn recent_errors(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Json<Value> {
    let limit = non_empty(&q, "limit")
        .and_then(|l| l.parse::<usize>().ok())
        .unwrap_or(DEFAULT_ERRORS_LIMIT)
        .min(MAX_ERRORS_LIMIT);

    let entries = state.diagnostics.recent(limit).await;
    let errors: Vec<Value> = entries
        .iter()
        .map(|e| {
            json!({
                "timestamp": e.timestamp,
                "level": e.level,
                "message": e.message,
                "context": e.context,
                "hasStack": e.stack.is_some(),
            })
        })
        .collect();

    Json(json!({
        "success": true,
        "count": errors.len(),
        "errors": errors,
    }))
}

/// Seeds the diagnostics log with one entry of each level so `/errors` can be checked end to end.
async fn test_errors(State(state): State<AppState>) -> Json<Value> {
    let log = &state.diagnostics;
    log.log_error(
        &SyncError::fetch(Upstream::Network, "Test API connection failure"),
        Some(json!({
            "operation": "raindrop-fetch",
            "service": state.source.name(),
        })),
    )
    .await;
    log.log_warning(
        "Rate limit warning",
        Some(json!({
            "remaining": 15,
            "resetTime": (Utc::now() + chrono::Duration::hours(1)).to_rfc3339(),
        })),
    )
    .await;
    log.log_info(
        "Sync completed successfully",
        Some(json!({ "itemsProcessed": 3, "duration": "2.5s" })),
    )
    .await;
    log.log_error_message(
        "WordPress authentication failed",
        Some(json!({
            "operation": "wordpress-post",
            "statusCode": 401,
            "service": state.publisher.name(),
        })),
    )
    .await;

    Json(json!({
        "success": true,
        "message": "Generated 4 test log entries (2 errors, 1 warning, 1 info)",
    }))
}

async fn reset_timestamp(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    let days = non_empty(&q, "days")
        .and_then(|d| d.parse::<i64>().ok())
        .unwrap_or(DEFAULT_RESET_DAYS);
    let Some(reset_to) = chrono::Duration::try_days(days).and_then(|d| Utc::now().checked_sub_signed(d)) else {
        return error_response(StatusCode::BAD_REQUEST, format!("days out of range: {days}"));
    };

    let previous = match state.store.get_checkpoint().await {
        Ok(p) => p,
        Err(e) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to reset timestamp: {e}"),
            )
        }
    };
    if let Err(e) = state.store.set_checkpoint(reset_to).await {
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to reset timestamp: {e}"),
        );
    }

    tracing::info!(target: "sync", days, new = %reset_to.to_rfc3339(), "checkpoint reset");
    Json(json!({
        "success": true,
        "message": format!("Last fetch timestamp reset to {days} days ago"),
        "previousTimestamp": previous.map(|p| p.to_rfc3339()),
        "newTimestamp": reset_to.to_rfc3339(),
        "daysBack": days,
    }))
    .into_response()
}
