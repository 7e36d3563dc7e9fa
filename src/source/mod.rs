// src/source/mod.rs
pub mod raindrop;
pub mod types;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::SyncError;
pub use types::{BookmarkItem, RawBookmark};

/// Where candidate bookmarks come from.
#[async_trait]
pub trait BookmarkSource: Send + Sync {
    /// Items tagged `tag`, changed after `since` when given, newest first.
    async fn fetch(&self, tag: &str, since: Option<DateTime<Utc>>) -> Result<Vec<BookmarkItem>, SyncError>;
    fn name(&self) -> &'static str;
}

/// Keep items carrying `tag` (case-insensitive) and changed after `since`,
/// sorted by creation time, newest first.
pub fn select_items(
    items: impl IntoIterator<Item = BookmarkItem>,
    tag: &str,
    since: Option<DateTime<Utc>>,
) -> Vec<BookmarkItem> {
    let mut out: Vec<BookmarkItem> = items
        .into_iter()
        .filter(|it| it.has_tag(tag))
        .filter(|it| since.map_or(true, |s| it.changed_at() > s))
        .collect();
    out.sort_by(|a, b| b.created.cmp(&a.created));
    out
}
