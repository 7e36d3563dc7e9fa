// src/source/raindrop.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{select_items, BookmarkItem, BookmarkSource, RawBookmark};
use crate::config::SyncConfig;
use crate::error::{SyncError, Upstream};

pub const USER_AGENT: &str = "LinkpostSync/1.0 (Automated Link Sync Bot)";

/// Raindrop.io REST client: bookmarks in all collections with a given tag.
#[derive(Clone)]
pub struct RaindropClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
    per_page: u32,
}

impl RaindropClient {
    pub fn new(api_base: &str, token: &str, timeout: Duration, per_page: u32) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("building raindrop http client")?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
            per_page: per_page.max(1),
        })
    }

    pub fn from_config(cfg: &SyncConfig) -> Result<Self> {
        Self::new(
            &cfg.raindrop_api_base,
            &cfg.raindrop_token,
            cfg.request_timeout,
            cfg.max_items_per_sync,
        )
    }

    async fn fetch_raw(&self, tag: &str) -> Result<Vec<RawBookmark>, SyncError> {
        // The API only filters by creation date; modification filtering happens
        // client-side so old bookmarks that were tagged later are not missed.
        let url = format!("{}/raindrops/0", self.api_base);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[
                ("search", format!("#{tag}")),
                ("sort", "-created".to_string()),
                ("perpage", self.per_page.to_string()),
            ])
            .send()
            .await
            .map_err(|e| {
                SyncError::fetch(Upstream::Network, format!("Failed to fetch bookmarks: {e}"))
                    .with_source(e)
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let reason = status.canonical_reason().unwrap_or("unknown status");
            return Err(
                SyncError::fetch(Upstream::Status(status.as_u16()), format!("Raindrop API error: {reason}"))
                    .with_source(body),
            );
        }

        let body: Value = resp.json().await.map_err(|e| {
            SyncError::fetch(Upstream::Response, format!("Failed to decode Raindrop response: {e}"))
                .with_source(e)
        })?;

        if body.get("result").and_then(Value::as_bool) != Some(true) {
            return Err(SyncError::fetch(
                Upstream::Response,
                "Raindrop API returned unsuccessful result",
            ));
        }
        let Some(items) = body.get("items").and_then(Value::as_array) else {
            return Err(SyncError::fetch(
                Upstream::Response,
                "Invalid response structure: items is not an array",
            ));
        };

        Ok(items
            .iter()
            .filter_map(|v| serde_json::from_value::<RawBookmark>(v.clone()).ok())
            .collect())
    }
}

#[async_trait]
impl BookmarkSource for RaindropClient {
    async fn fetch(&self, tag: &str, since: Option<DateTime<Utc>>) -> Result<Vec<BookmarkItem>, SyncError> {
        let raw = match self.fetch_raw(tag).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(target: "sync", error = %e, provider = self.name(), "provider fetch error");
                return Err(e);
            }
        };

        let total = raw.len();
        let valid: Vec<BookmarkItem> = raw.into_iter().filter_map(RawBookmark::validate).collect();
        let dropped = total - valid.len();
        let items = select_items(valid, tag, since);

        tracing::debug!(
            target: "sync",
            total,
            dropped,
            kept = items.len(),
            tag,
            "raindrop bookmarks fetched"
        );
        Ok(items)
    }

    fn name(&self) -> &'static str {
        "Raindrop"
    }
}
