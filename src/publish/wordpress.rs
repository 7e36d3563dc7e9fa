// src/publish/wordpress.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::{NewPost, PublishedPost, Publisher};
use crate::config::SyncConfig;
use crate::error::{SyncError, Upstream};
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::source::raindrop::USER_AGENT;

/// WordPress REST client using application-password basic auth.
#[derive(Clone)]
pub struct WordPressClient {
    endpoint: String,
    username: String,
    password: String,
    client: Client,
    retry: RetryPolicy,
}

impl WordPressClient {
    pub fn new(endpoint: &str, username: &str, password: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("building wordpress http client")?;
        Ok(Self {
            endpoint: posts_endpoint(endpoint),
            username: username.to_string(),
            password: password.to_string(),
            client,
            retry: RetryPolicy::default(),
        })
    }

    pub fn from_config(cfg: &SyncConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(cfg.request_timeout)
            .build()
            .context("building wordpress http client")?;
        Ok(Self {
            endpoint: posts_endpoint(&cfg.wp_endpoint),
            username: cfg.wp_username.clone(),
            password: cfg.wp_app_password.clone(),
            client,
            retry: cfg.retry_policy(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn create_once(&self, post: &NewPost) -> Result<PublishedPost, SyncError> {
        let rsp = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.username, Some(&self.password))
            .json(post)
            .send()
            .await
            .map_err(|e| {
                SyncError::publish(Upstream::Network, format!("Failed to create WordPress post: {e}"))
                    .with_source(e)
            })?;

        let status = rsp.status();
        if !status.is_success() {
            let text = rsp.text().await.unwrap_or_default();
            let body: Value = serde_json::from_str(&text)
                .unwrap_or_else(|_| serde_json::json!({ "message": text }));
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| {
                    format!(
                        "WordPress API error: {}",
                        status.canonical_reason().unwrap_or("unknown status")
                    )
                });
            let mut err = SyncError::publish(Upstream::Status(status.as_u16()), message);
            if let Some(code) = body.get("code").and_then(Value::as_str) {
                err = err.with_code(code);
            }
            return Err(err);
        }

        let body: Value = rsp.json().await.map_err(|e| {
            SyncError::publish(Upstream::Response, format!("Failed to decode WordPress response: {e}"))
                .with_source(e)
        })?;
        parse_created_post(body)
    }
}

/// The REST endpoint for posts, whether or not the configured URL already ends with it.
pub fn posts_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim_end_matches('/');
    if trimmed.ends_with("/posts") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/posts")
    }
}

fn parse_created_post(body: Value) -> Result<PublishedPost, SyncError> {
    let invalid = || {
        SyncError::publish(
            Upstream::Response,
            "Invalid response from WordPress API: missing required fields",
        )
        .with_code("invalid_response")
    };
    let has_id = body.get("id").and_then(Value::as_u64).is_some_and(|id| id > 0);
    let has_link = body
        .get("link")
        .and_then(Value::as_str)
        .is_some_and(|l| !l.is_empty());
    if !has_id || !has_link || body.get("title").is_none() {
        return Err(invalid());
    }
    serde_json::from_value(body).map_err(|e| invalid().with_source(e))
}

#[async_trait]
impl Publisher for WordPressClient {
    async fn publish(&self, post: &NewPost) -> Result<PublishedPost, SyncError> {
        retry_with_backoff(&self.retry, SyncError::is_retryable, || self.create_once(post)).await
    }

    fn name(&self) -> &'static str {
        "WordPress"
    }
}
