// tests/common/mod.rs
//
// In-memory stand-ins for the sync pipeline's collaborators.
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use linkpost_sync::diagnostics::DiagnosticsLog;
use linkpost_sync::error::{SyncError, Upstream};
use linkpost_sync::publish::{NewPost, PublishedPost, Publisher, Rendered};
use linkpost_sync::source::{select_items, BookmarkItem, BookmarkSource};
use linkpost_sync::store::{KvBackend, KvStateStore, MemoryKv, StateStore};
use linkpost_sync::sync::{SyncOrchestrator, SyncSettings};

pub const TAG: &str = "blog";

/// Bookmark tagged `blog`, created `minutes_ago` minutes ago.
pub fn item(id: &str, minutes_ago: i64) -> BookmarkItem {
    BookmarkItem {
        id: id.to_string(),
        title: format!("Title {id}"),
        note: format!("Note for **{id}**"),
        link: format!("https://example.com/{id}"),
        created: Utc::now() - Duration::minutes(minutes_ago),
        last_update: None,
        tags: vec![TAG.to_string()],
    }
}

#[derive(Default)]
pub struct FakeSource {
    pub items: Mutex<Vec<BookmarkItem>>,
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
    pub seen_since: Mutex<Vec<Option<DateTime<Utc>>>>,
}

impl FakeSource {
    pub fn with_items(items: Vec<BookmarkItem>) -> Self {
        Self {
            items: Mutex::new(items),
            ..Default::default()
        }
    }
}

#[async_trait]
impl BookmarkSource for FakeSource {
    async fn fetch(&self, tag: &str, since: Option<DateTime<Utc>>) -> Result<Vec<BookmarkItem>, SyncError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_since.lock().unwrap().push(since);
        if self.fail.load(Ordering::SeqCst) {
            return Err(SyncError::fetch(Upstream::Status(401), "Raindrop API error: Unauthorized"));
        }
        let items = self.items.lock().unwrap().clone();
        Ok(select_items(items, tag, since))
    }

    fn name(&self) -> &'static str {
        "Fake"
    }
}

#[derive(Default)]
pub struct FakePublisher {
    pub posts: Mutex<Vec<NewPost>>,
    pub fail_titles: Mutex<HashSet<String>>,
    next_id: AtomicU64,
}

impl FakePublisher {
    pub fn fail_on(&self, title: &str) {
        self.fail_titles.lock().unwrap().insert(title.to_string());
    }

    pub fn titles(&self) -> Vec<String> {
        self.posts.lock().unwrap().iter().map(|p| p.title.clone()).collect()
    }
}

#[async_trait]
impl Publisher for FakePublisher {
    async fn publish(&self, post: &NewPost) -> Result<PublishedPost, SyncError> {
        if self.fail_titles.lock().unwrap().contains(&post.title) {
            return Err(SyncError::publish(Upstream::Status(400), "Invalid post data").with_code("rest_invalid_param"));
        }
        self.posts.lock().unwrap().push(post.clone());
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PublishedPost {
            id,
            link: format!("https://blog.example.com/?p={id}"),
            title: Rendered {
                rendered: post.title.clone(),
            },
            status: Some(post.status.as_str().to_string()),
            format: Some(post.format.as_str().to_string()),
        })
    }

    fn name(&self) -> &'static str {
        "FakeBlog"
    }
}

/// Real [`KvStateStore`] with switchable failures per operation.
pub struct FlakyStore {
    pub inner: KvStateStore,
    pub fail_get_checkpoint: AtomicBool,
    pub fail_set_checkpoint: AtomicBool,
    pub fail_is_published: AtomicBool,
    pub fail_mark: AtomicBool,
}

impl FlakyStore {
    pub fn new(kv: Arc<dyn KvBackend>) -> Self {
        Self {
            inner: KvStateStore::new(kv),
            fail_get_checkpoint: AtomicBool::new(false),
            fail_set_checkpoint: AtomicBool::new(false),
            fail_is_published: AtomicBool::new(false),
            fail_mark: AtomicBool::new(false),
        }
    }
}

fn kv_down() -> SyncError {
    SyncError::store("kv unavailable")
}

#[async_trait]
impl StateStore for FlakyStore {
    async fn get_checkpoint(&self) -> Result<Option<DateTime<Utc>>, SyncError> {
        if self.fail_get_checkpoint.load(Ordering::SeqCst) {
            return Err(kv_down());
        }
        self.inner.get_checkpoint().await
    }

    async fn set_checkpoint(&self, at: DateTime<Utc>) -> Result<(), SyncError> {
        if self.fail_set_checkpoint.load(Ordering::SeqCst) {
            return Err(SyncError::store("Failed to update last fetch time"));
        }
        self.inner.set_checkpoint(at).await
    }

    async fn is_published(&self, id: &str) -> Result<bool, SyncError> {
        if self.fail_is_published.load(Ordering::SeqCst) {
            return Err(kv_down());
        }
        self.inner.is_published(id).await
    }

    async fn mark_published(&self, id: &str) -> Result<(), SyncError> {
        if self.fail_mark.load(Ordering::SeqCst) {
            return Err(kv_down());
        }
        self.inner.mark_published(id).await
    }
}

pub struct Harness {
    pub kv: Arc<MemoryKv>,
    pub source: Arc<FakeSource>,
    pub publisher: Arc<FakePublisher>,
    pub store: Arc<FlakyStore>,
    pub diagnostics: Arc<DiagnosticsLog>,
    pub orchestrator: SyncOrchestrator,
}

pub fn harness(items: Vec<BookmarkItem>) -> Harness {
    harness_with(items, SyncSettings::default())
}

pub fn harness_with(items: Vec<BookmarkItem>, settings: SyncSettings) -> Harness {
    let kv = Arc::new(MemoryKv::new());
    let source = Arc::new(FakeSource::with_items(items));
    let publisher = Arc::new(FakePublisher::default());
    let store = Arc::new(FlakyStore::new(kv.clone()));
    let diagnostics = Arc::new(DiagnosticsLog::new(kv.clone(), Duration::days(30)));
    let orchestrator = SyncOrchestrator::new(
        source.clone(),
        publisher.clone(),
        store.clone(),
        diagnostics.clone(),
        settings,
    );
    Harness {
        kv,
        source,
        publisher,
        store,
        diagnostics,
        orchestrator,
    }
}
