// src/store/file.rs
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{KvBackend, StoredValue};
use crate::error::SyncError;

/// JSON-file backed store. The whole map is loaded on open and rewritten
/// (temp file + rename) after every mutation.
#[derive(Debug)]
pub struct FileKv {
    path: PathBuf,
    inner: Mutex<BTreeMap<String, StoredValue>>,
}

impl FileKv {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SyncError> {
        let path = path.as_ref().to_path_buf();
        let map = match tokio::fs::read_to_string(&path).await {
            Ok(s) if s.trim().is_empty() => BTreeMap::new(),
            Ok(s) => serde_json::from_str(&s).map_err(|e| {
                SyncError::store(format!("parsing state file {}", path.display())).with_source(e)
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(
                    SyncError::store(format!("reading state file {}", path.display())).with_source(e),
                )
            }
        };
        tracing::info!(path = %path.display(), entries = map.len(), "state file opened");
        Ok(Self {
            path,
            inner: Mutex::new(map),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, map: &BTreeMap<String, StoredValue>) -> Result<(), SyncError> {
        let write_err = |e: std::io::Error| {
            SyncError::store(format!("writing state file {}", self.path.display())).with_source(e)
        };
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await.map_err(write_err)?;
        }
        let body = serde_json::to_vec_pretty(map)
            .map_err(|e| SyncError::store("serializing state").with_source(e))?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await.map_err(write_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(write_err)?;
        Ok(())
    }
}

#[async_trait]
impl KvBackend for FileKv {
    async fn get(&self, key: &str) -> Result<Option<String>, SyncError> {
        let map = self.inner.lock().await;
        Ok(map
            .get(key)
            .filter(|v| v.is_live(Utc::now()))
            .map(|v| v.value.clone()))
    }

    async fn put(&self, key: &str, value: String, ttl: Option<chrono::Duration>) -> Result<(), SyncError> {
        let mut map = self.inner.lock().await;
        let now = Utc::now();
        map.retain(|_, v| v.is_live(now));
        map.insert(key.to_string(), StoredValue::new(value, ttl, now));
        self.persist(&map).await
    }

    async fn delete(&self, key: &str) -> Result<(), SyncError> {
        let mut map = self.inner.lock().await;
        if map.remove(key).is_some() {
            self.persist(&map).await?;
        }
        Ok(())
    }

    async fn list(&self, prefix: &str, limit: usize) -> Result<Vec<String>, SyncError> {
        let map = self.inner.lock().await;
        let now = Utc::now();
        Ok(map
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .filter(|(_, v)| v.is_live(now))
            .map(|(k, _)| k.clone())
            .take(limit)
            .collect())
    }
}
