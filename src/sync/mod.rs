// src/sync/mod.rs
//! One end-to-end sync pass: checkpoint -> fetch -> dedup -> render -> publish -> record.
//!
//! Items are handled strictly one after another. Only a failed fetch ends a run
//! early; every other failure is recorded against its item and the loop moves on.
//! The checkpoint only advances after a non-dry run with zero errors, so a
//! partially failed run is retried in full next time.

pub mod scheduler;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use metrics::{counter, gauge, histogram};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::json;

use crate::config::SyncConfig;
use crate::content::ContentBuilder;
use crate::diagnostics::Diagnostics;
use crate::error::SyncError;
use crate::publish::{NewPost, Publisher};
use crate::source::{BookmarkItem, BookmarkSource};
use crate::store::StateStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SyncOptions {
    pub tag: Option<String>,
    pub limit: Option<usize>,
    pub dry_run: Option<bool>,
}

fn as_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format!("{}ms", d.as_millis()))
}

/// Outcome of one run. Always fully populated, even after a fatal fetch error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub success: bool,
    pub items_processed: usize,
    pub items_posted: usize,
    pub items_skipped: usize,
    pub errors: Vec<String>,
    pub dry_run: bool,
    #[serde(serialize_with = "as_millis")]
    pub duration: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_fetch_time: Option<DateTime<Utc>>,
}

impl SyncResult {
    fn started(dry_run: bool) -> Self {
        Self {
            success: false,
            items_processed: 0,
            items_posted: 0,
            items_skipped: 0,
            errors: Vec::new(),
            dry_run,
            duration: Duration::ZERO,
            last_fetch_time: None,
        }
    }

    fn duration_label(&self) -> String {
        format!("{}ms", self.duration.as_millis())
    }
}

/// Run-wide defaults taken from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    pub default_tag: String,
    pub dry_run: bool,
}

impl SyncSettings {
    pub fn from_config(cfg: &SyncConfig) -> Self {
        Self {
            default_tag: cfg.raindrop_tag.clone(),
            dry_run: cfg.dry_run,
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            default_tag: "blog".to_string(),
            dry_run: false,
        }
    }
}

pub struct SyncOrchestrator {
    source: Arc<dyn BookmarkSource>,
    publisher: Arc<dyn Publisher>,
    store: Arc<dyn StateStore>,
    diagnostics: Arc<dyn Diagnostics>,
    content: ContentBuilder,
    settings: SyncSettings,
}

impl SyncOrchestrator {
    pub fn new(
        source: Arc<dyn BookmarkSource>,
        publisher: Arc<dyn Publisher>,
        store: Arc<dyn StateStore>,
        diagnostics: Arc<dyn Diagnostics>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            source,
            publisher,
            store,
            diagnostics,
            content: ContentBuilder::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Run one sync pass. Never fails: every problem ends up in the result
    /// or in diagnostics.
    pub async fn perform_sync(&self, options: SyncOptions) -> SyncResult {
        crate::metrics::describe();
        let started = Instant::now();
        let dry_run = options.dry_run.unwrap_or(false) || self.settings.dry_run;
        let tag = options
            .tag
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.settings.default_tag)
            .to_string();
        let limit = options.limit.filter(|l| *l > 0);
        let mut result = SyncResult::started(dry_run);
        counter!("sync_runs_total").increment(1);

        tracing::info!(target: "sync", tag = %tag, ?limit, dry_run, "sync starting");

        let checkpoint = self.read_checkpoint().await;
        result.last_fetch_time = checkpoint;

        let mut items = match self.source.fetch(&tag, checkpoint).await {
            Ok(items) => items,
            Err(e) => {
                counter!("sync_fetch_errors_total").increment(1);
                result.errors.push(format!("Sync failed: {e}"));
                result.duration = started.elapsed();
                self.diagnostics
                    .log_error(
                        &e,
                        Some(json!({
                            "operation": "fetch-bookmarks",
                            "source": self.source.name(),
                            "tag": tag,
                            "since": checkpoint.map(|c| c.to_rfc3339()),
                            "limit": limit,
                            "duration": result.duration_label(),
                            "dryRun": dry_run,
                        })),
                    )
                    .await;
                return result;
            }
        };

        if let Some(limit) = limit {
            items.truncate(limit);
        }
        result.items_processed = items.len();

        let pending = self.filter_unpublished(items).await;
        result.items_skipped = result.items_processed - pending.len();

        for item in &pending {
            match self.process_item(item, dry_run).await {
                Ok(()) => result.items_posted += 1,
                Err(e) => {
                    counter!("sync_item_errors_total").increment(1);
                    result
                        .errors
                        .push(format!("Failed to process bookmark {}: {e}", item.id));
                    self.diagnostics
                        .log_error(
                            &e,
                            Some(json!({
                                "operation": "process-bookmark",
                                "kind": e.kind(),
                                "bookmarkId": item.id,
                                "title": item.title,
                                "link": item.link,
                            })),
                        )
                        .await;
                }
            }
        }

        if !dry_run && result.errors.is_empty() {
            let now = Utc::now();
            match self.store.set_checkpoint(now).await {
                Ok(()) => gauge!("sync_last_success_ts").set(now.timestamp() as f64),
                Err(e) => {
                    tracing::error!(target: "sync", error = %e, "checkpoint not advanced");
                    result.errors.push(format!("Sync failed: {e}"));
                }
            }
        }

        result.success = result.errors.is_empty();
        result.duration = started.elapsed();
        self.log_summary(&result, &tag).await;

        counter!("sync_items_posted_total").increment(result.items_posted as u64);
        counter!("sync_items_skipped_total").increment(result.items_skipped as u64);
        histogram!("sync_duration_ms").record(result.duration.as_secs_f64() * 1_000.0);

        result
    }

    /// A missing or unreadable checkpoint means "fetch everything".
    async fn read_checkpoint(&self) -> Option<DateTime<Utc>> {
        match self.store.get_checkpoint().await {
            Ok(c) => c,
            Err(e) => {
                self.diagnostics
                    .log_warning(
                        "Failed to read last fetch time, fetching all tagged items",
                        Some(json!({ "error": e.to_string() })),
                    )
                    .await;
                None
            }
        }
    }

    /// Drop items that already have a published record. When the check itself
    /// fails the item is kept: a duplicate post beats a silently lost one.
    async fn filter_unpublished(&self, items: Vec<BookmarkItem>) -> Vec<BookmarkItem> {
        let mut pending = Vec::with_capacity(items.len());
        for item in items {
            match self.store.is_published(&item.id).await {
                Ok(true) => {
                    tracing::debug!(target: "sync", item_id = %item.id, "already published, skipping");
                }
                Ok(false) => pending.push(item),
                Err(e) => {
                    self.diagnostics
                        .log_warning(
                            &format!("Failed to check if item {} was posted, including it", item.id),
                            Some(json!({ "bookmarkId": item.id, "error": e.to_string() })),
                        )
                        .await;
                    pending.push(item);
                }
            }
        }
        pending
    }

    async fn process_item(&self, item: &BookmarkItem, dry_run: bool) -> Result<(), SyncError> {
        let content = self
            .content
            .build_post_content(&item.note, &item.title, &item.link)?;

        if dry_run {
            tracing::debug!(target: "sync", item_id = %item.id, "dry run, not publishing");
            return Ok(());
        }

        let post = self.publisher.publish(&NewPost::link(&item.title, content)).await?;
        self.store.mark_published(&item.id).await?;

        tracing::debug!(
            target: "sync",
            item_id = %item.id,
            post_id = post.id,
            post_link = %post.link,
            "bookmark published"
        );
        Ok(())
    }

    async fn log_summary(&self, result: &SyncResult, tag: &str) {
        let mut context = json!({
            "itemsProcessed": result.items_processed,
            "itemsPosted": result.items_posted,
            "itemsSkipped": result.items_skipped,
            "duration": result.duration_label(),
            "dryRun": result.dry_run,
            "tag": tag,
        });
        if result.success {
            self.diagnostics
                .log_info("Sync completed successfully", Some(context))
                .await;
        } else {
            context["operation"] = json!("sync-orchestrator");
            context["errorCount"] = json!(result.errors.len());
            self.diagnostics
                .log_error_message("Sync completed with errors", Some(context))
                .await;
        }
    }
}
