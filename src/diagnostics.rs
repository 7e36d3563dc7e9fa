// src/diagnostics.rs
//! Append-only operational log persisted next to the sync state.
//!
//! Every entry is mirrored to `tracing`. Persisting is best-effort: a failing
//! backend is reported locally and never surfaces to the caller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::error_chain;
use crate::store::KvBackend;

pub const DIAG_PREFIX: &str = "diag:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticEntry {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl DiagnosticEntry {
    pub fn new(level: Level, message: impl Into<String>, context: Option<Value>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            context,
            stack: None,
        }
    }

    /// Error entry whose `stack` is the error's cause chain.
    pub fn from_error(err: &(dyn std::error::Error + 'static), context: Option<Value>) -> Self {
        let mut entry = Self::new(Level::Error, err.to_string(), context);
        entry.stack = Some(error_chain(err));
        entry
    }
}

/// Sink for operational diagnostics. Implementations must not fail outward.
#[async_trait]
pub trait Diagnostics: Send + Sync {
    async fn record(&self, entry: DiagnosticEntry);

    async fn log_error(&self, err: &(dyn std::error::Error + Send + Sync + 'static), context: Option<Value>) {
        self.record(DiagnosticEntry::from_error(err, context)).await
    }

    async fn log_error_message(&self, message: &str, context: Option<Value>) {
        self.record(DiagnosticEntry::new(Level::Error, message, context)).await
    }

    async fn log_warning(&self, message: &str, context: Option<Value>) {
        self.record(DiagnosticEntry::new(Level::Warning, message, context)).await
    }

    async fn log_info(&self, message: &str, context: Option<Value>) {
        self.record(DiagnosticEntry::new(Level::Info, message, context)).await
    }
}

/// [`Diagnostics`] persisted to a [`KvBackend`] with a retention TTL.
pub struct DiagnosticsLog {
    kv: Arc<dyn KvBackend>,
    retention: chrono::Duration,
    seq: AtomicU64,
}

impl DiagnosticsLog {
    pub fn new(kv: Arc<dyn KvBackend>, retention: chrono::Duration) -> Self {
        Self {
            kv,
            retention,
            seq: AtomicU64::new(0),
        }
    }

    /// Fixed-width timestamp first, so key order is time order.
    fn key_for(&self, ts: DateTime<Utc>) -> String {
        let n = self.seq.fetch_add(1, Ordering::Relaxed);
        format!("{DIAG_PREFIX}{}:{n:010}", ts.format("%Y-%m-%dT%H:%M:%S%.6fZ"))
    }

    /// Newest entries first, at most `limit`. Unreadable entries are skipped.
    pub async fn recent(&self, limit: usize) -> Vec<DiagnosticEntry> {
        let keys = match self.kv.list(DIAG_PREFIX, usize::MAX).await {
            Ok(k) => k,
            Err(e) => {
                tracing::error!(target: "diagnostics", error = %e, "failed to list diagnostic entries");
                return Vec::new();
            }
        };

        let mut out = Vec::with_capacity(limit.min(keys.len()));
        for key in keys.iter().rev() {
            if out.len() >= limit {
                break;
            }
            match self.kv.get(key).await {
                Ok(Some(raw)) => match serde_json::from_str::<DiagnosticEntry>(&raw) {
                    Ok(entry) => out.push(entry),
                    Err(e) => tracing::warn!(target: "diagnostics", key = %key, error = %e, "unparseable diagnostic entry"),
                },
                Ok(None) => {}
                Err(e) => tracing::warn!(target: "diagnostics", key = %key, error = %e, "failed to read diagnostic entry"),
            }
        }
        out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        out
    }

    /// Delete entries older than `age` and anything unparseable. Returns the count removed.
    pub async fn clear_older_than(&self, age: chrono::Duration) -> usize {
        let cutoff = Utc::now() - age;
        let keys = match self.kv.list(DIAG_PREFIX, usize::MAX).await {
            Ok(k) => k,
            Err(e) => {
                tracing::error!(target: "diagnostics", error = %e, "failed to list diagnostic entries");
                return 0;
            }
        };

        let mut deleted = 0usize;
        for key in keys {
            let stale = match self.kv.get(&key).await {
                Ok(Some(raw)) => serde_json::from_str::<DiagnosticEntry>(&raw)
                    .map(|e| e.timestamp < cutoff)
                    .unwrap_or(true),
                Ok(None) => false,
                Err(_) => continue,
            };
            if stale && self.kv.delete(&key).await.is_ok() {
                deleted += 1;
            }
        }
        deleted
    }
}

#[async_trait]
impl Diagnostics for DiagnosticsLog {
    async fn record(&self, entry: DiagnosticEntry) {
        match entry.level {
            Level::Error => tracing::error!(target: "diagnostics", context = ?entry.context, stack = ?entry.stack, "{}", entry.message),
            Level::Warning => tracing::warn!(target: "diagnostics", context = ?entry.context, "{}", entry.message),
            Level::Info => tracing::info!(target: "diagnostics", context = ?entry.context, "{}", entry.message),
        }

        let body = match serde_json::to_string(&entry) {
            Ok(b) => b,
            Err(e) => {
                tracing::error!(target: "diagnostics", error = %e, message = %entry.message, "failed to serialize diagnostic entry");
                return;
            }
        };
        let key = self.key_for(entry.timestamp);
        if let Err(e) = self.kv.put(&key, body, Some(self.retention)).await {
            tracing::error!(
                target: "diagnostics",
                error = %e,
                original = %entry.message,
                "failed to persist diagnostic entry"
            );
        }
    }
}
