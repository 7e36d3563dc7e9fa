// src/source/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A validated bookmark, ready to enter the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookmarkItem {
    pub id: String,
    pub title: String,
    pub note: String,
    pub link: String,
    pub created: DateTime<Utc>,
    pub last_update: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}

impl BookmarkItem {
    /// Timestamp compared against the checkpoint: last modification, else creation.
    pub fn changed_at(&self) -> DateTime<Utc> {
        self.last_update.unwrap_or(self.created)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

/// Bookmark as delivered by Raindrop; every field may be absent.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawBookmark {
    #[serde(rename = "_id")]
    pub id: Option<serde_json::Value>,
    pub title: Option<String>,
    pub note: Option<String>,
    pub link: Option<String>,
    pub created: Option<String>,
    #[serde(rename = "lastUpdate")]
    pub last_update: Option<String>,
    pub tags: Option<Vec<String>>,
}

fn parse_ts(s: Option<&str>) -> Option<DateTime<Utc>> {
    s.and_then(|v| DateTime::parse_from_rfc3339(v.trim()).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

impl RawBookmark {
    /// `None` when id, title, link, creation time or the tag list is missing.
    pub fn validate(self) -> Option<BookmarkItem> {
        let id = match self.id? {
            serde_json::Value::String(s) if !s.trim().is_empty() => s,
            serde_json::Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let created = parse_ts(self.created.as_deref())?;
        Some(BookmarkItem {
            id,
            title: non_blank(self.title)?,
            note: self.note.unwrap_or_default(),
            link: non_blank(self.link)?,
            created,
            last_update: parse_ts(self.last_update.as_deref()),
            tags: self.tags?,
        })
    }
}
