// src/publish/mod.rs
pub mod wordpress;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Publish,
    Draft,
    Pending,
    Private,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Publish => "publish",
            PostStatus::Draft => "draft",
            PostStatus::Pending => "pending",
            PostStatus::Private => "private",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostFormat {
    Standard,
    Aside,
    Chat,
    Gallery,
    Link,
    Image,
    Quote,
    Status,
    Video,
    Audio,
}

impl PostFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostFormat::Standard => "standard",
            PostFormat::Aside => "aside",
            PostFormat::Chat => "chat",
            PostFormat::Gallery => "gallery",
            PostFormat::Link => "link",
            PostFormat::Image => "image",
            PostFormat::Quote => "quote",
            PostFormat::Status => "status",
            PostFormat::Video => "video",
            PostFormat::Audio => "audio",
        }
    }
}

/// Body of a create-post request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub status: PostStatus,
    pub format: PostFormat,
}

impl NewPost {
    /// A published link-format post, which is what every synced bookmark becomes.
    pub fn link(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            status: PostStatus::Publish,
            format: PostFormat::Link,
        }
    }

    pub fn as_draft(mut self) -> Self {
        self.status = PostStatus::Draft;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rendered {
    pub rendered: String,
}

/// The subset of the created post we rely on. Only `id`, `link` and `title`
/// decide success; `status` and `format` are echoed as the blog reports them,
/// which may be values outside [`PostStatus`] / [`PostFormat`] (e.g. `future`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedPost {
    pub id: u64,
    pub link: String,
    pub title: Rendered,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
}

/// Blog platform that accepts new posts.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, post: &NewPost) -> Result<PublishedPost, SyncError>;
    fn name(&self) -> &'static str;
}
