// src/store/mod.rs
pub mod file;
pub mod memory;
pub mod state;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

pub use file::FileKv;
pub use memory::MemoryKv;
pub use state::{KvStateStore, POSTED_ITEM_TTL_SECS};

/// Minimal key-value contract shared by the state store and the diagnostics log.
///
/// Expired entries are never returned by `get` or `list`.
#[async_trait]
pub trait KvBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, SyncError>;
    async fn put(&self, key: &str, value: String, ttl: Option<chrono::Duration>) -> Result<(), SyncError>;
    async fn delete(&self, key: &str) -> Result<(), SyncError>;
    /// Live keys starting with `prefix`, ascending, at most `limit`.
    async fn list(&self, prefix: &str, limit: usize) -> Result<Vec<String>, SyncError>;
}

/// One stored value with its optional expiry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredValue {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredValue {
    pub fn new(value: String, ttl: Option<chrono::Duration>, now: DateTime<Utc>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|t| now + t),
        }
    }

    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |exp| exp > now)
    }
}

/// Durable sync state: checkpoint plus published-item records.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get_checkpoint(&self) -> Result<Option<DateTime<Utc>>, SyncError>;
    async fn set_checkpoint(&self, at: DateTime<Utc>) -> Result<(), SyncError>;
    async fn is_published(&self, id: &str) -> Result<bool, SyncError>;
    async fn mark_published(&self, id: &str) -> Result<(), SyncError>;
}
