// src/store/memory.rs
use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use super::{KvBackend, StoredValue};
use crate::error::SyncError;

/// In-process backend. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryKv {
    inner: Mutex<BTreeMap<String, StoredValue>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, StoredValue>>, SyncError> {
        self.inner
            .lock()
            .map_err(|_| SyncError::store("memory kv mutex poisoned"))
    }

    /// Live entry count (test/diagnostic helper).
    pub fn len(&self) -> usize {
        let now = Utc::now();
        self.lock()
            .map(|m| m.values().filter(|v| v.is_live(now)).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KvBackend for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, SyncError> {
        let now = Utc::now();
        let mut map = self.lock()?;
        match map.get(key) {
            Some(v) if v.is_live(now) => Ok(Some(v.value.clone())),
            Some(_) => {
                map.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: String, ttl: Option<chrono::Duration>) -> Result<(), SyncError> {
        let entry = StoredValue::new(value, ttl, Utc::now());
        self.lock()?.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), SyncError> {
        self.lock()?.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str, limit: usize) -> Result<Vec<String>, SyncError> {
        let now = Utc::now();
        let mut map = self.lock()?;
        map.retain(|_, v| v.is_live(now));
        Ok(map
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .take(limit)
            .collect())
    }
}
