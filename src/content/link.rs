// src/content/link.rs
//! Link-post formatting: rendered note followed by a single source paragraph.

/// Escape `& < > " '` for embedding inside markup or a quoted attribute.
pub fn escape_html(text: &str) -> String {
    html_escape::encode_quoted_attribute(text).into_owned()
}

/// Append the canonical `→ <a …>title</a>` paragraph to rendered HTML.
///
/// Empty content yields only the source paragraph.
pub fn format_link_post(content: &str, title: &str, url: &str) -> String {
    let mut out = content.trim().to_string();

    if out.ends_with("</p>") {
        out.push('\n');
    } else if !out.is_empty() {
        out.push_str("\n\n");
    }

    out.push_str(&format!(
        r#"<p>→ <a href="{}" target="_blank" rel="noopener">{}</a></p>"#,
        escape_html(url),
        escape_html(title)
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_then_link() {
        let out = format_link_post("<p>This is some content</p>", "Example Post", "https://example.com");
        assert_eq!(
            out,
            "<p>This is some content</p>\n<p>→ <a href=\"https://example.com\" target=\"_blank\" rel=\"noopener\">Example Post</a></p>"
        );
    }

    #[test]
    fn empty_content_is_only_the_link() {
        let out = format_link_post("", "Example Post", "https://example.com");
        assert_eq!(
            out,
            r#"<p>→ <a href="https://example.com" target="_blank" rel="noopener">Example Post</a></p>"#
        );
    }

    #[test]
    fn title_and_url_are_escaped() {
        let out = format_link_post(
            "<p>Content</p>",
            r#"Post with "quotes" & <tags>"#,
            r#"https://example.com/path?param=value&other="quoted""#,
        );
        assert!(out.contains("Post with &quot;quotes&quot; &amp; &lt;tags&gt;"), "{out}");
        assert!(!out.contains("<tags>"));
        assert!(out.contains(
            r#"href="https://example.com/path?param=value&amp;other=&quot;quoted&quot;""#
        ));
    }

    #[test]
    fn single_quotes_are_escaped() {
        let out = escape_html("it's");
        assert!(!out.contains('\''), "{out}");
        assert!(out.starts_with("it&"));
    }

    #[test]
    fn plain_text_gets_blank_line() {
        let out = format_link_post("Plain text content", "T", "https://example.com");
        assert!(out.contains("Plain text content\n\n<p>→"));
    }

    #[test]
    fn spaces_in_url_survive_and_content_is_trimmed() {
        let out = format_link_post(
            "  <p>Content with whitespace</p>  ",
            "Test",
            "https://example.com/path with spaces/file.html",
        );
        assert!(out.starts_with("<p>Content with whitespace</p>\n<p>→"));
        assert!(out.contains(r#"href="https://example.com/path with spaces/file.html""#));
    }
}
