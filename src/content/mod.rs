// src/content/mod.rs
pub mod link;
pub mod markdown;

use crate::error::SyncError;

pub use link::{escape_html, format_link_post};
pub use markdown::render_markdown;

/// Builds publish-ready HTML from a bookmark's note and metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentBuilder;

impl ContentBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Rendered note plus the trailing source paragraph.
    pub fn build_post_content(&self, note: &str, title: &str, link: &str) -> Result<String, SyncError> {
        if link.trim().is_empty() {
            return Err(SyncError::render(format!(
                "cannot build link post '{title}' without a source link"
            )));
        }
        let body = render_markdown(note);
        Ok(format_link_post(&body, title, link))
    }
}
