// src/content/markdown.rs
//! Markdown note -> HTML.
//!
//! CommonMark with tables, strikethrough and smart punctuation. Raw HTML in the
//! note is passed through and bare `http(s)://` URLs in text become links.

use once_cell::sync::OnceCell;
use pulldown_cmark::{html, CowStr, Event, LinkType, Options, Parser, Tag, TagEnd};
use regex::Regex;

fn options() -> Options {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_TABLES);
    opts.insert(Options::ENABLE_STRIKETHROUGH);
    opts.insert(Options::ENABLE_SMART_PUNCTUATION);
    opts
}

/// Render a note to HTML. Empty or whitespace-only input yields `""`.
///
/// Never panics outward: if the renderer fails internally the raw text is
/// returned with newlines turned into `<br>`.
pub fn render_markdown(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    match std::panic::catch_unwind(|| render_html(trimmed)) {
        Ok(out) => out,
        Err(_) => {
            tracing::error!(target: "render", "markdown renderer panicked, using plain text");
            plain_fallback(text)
        }
    }
}

/// Literal text with line breaks.
pub fn plain_fallback(text: &str) -> String {
    text.replace('\n', "<br>")
}

fn render_html(text: &str) -> String {
    let events = linkify(coalesce_text(Parser::new_ext(text, options())));
    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, events.into_iter());
    out
}

/// Merge adjacent text events so URLs are not split across them.
fn coalesce_text<'a>(events: impl Iterator<Item = Event<'a>>) -> Vec<Event<'a>> {
    let mut out: Vec<Event<'a>> = Vec::new();
    for ev in events {
        if let Event::Text(next) = &ev {
            if let Some(Event::Text(prev)) = out.last_mut() {
                let mut joined = prev.to_string();
                joined.push_str(next);
                *prev = CowStr::from(joined);
                continue;
            }
        }
        out.push(ev);
    }
    out
}

fn url_regex() -> &'static Regex {
    static RE_URL: OnceCell<Regex> = OnceCell::new();
    RE_URL.get_or_init(|| {
        Regex::new(r#"https?://[^\s<>"]+"#).expect("static url regex is valid")
    })
}

fn anchor_open_regex() -> &'static Regex {
    static RE_A_OPEN: OnceCell<Regex> = OnceCell::new();
    RE_A_OPEN.get_or_init(|| Regex::new(r"(?i)<a[\s>]").expect("static anchor regex is valid"))
}

fn anchor_close_regex() -> &'static Regex {
    static RE_A_CLOSE: OnceCell<Regex> = OnceCell::new();
    RE_A_CLOSE.get_or_init(|| Regex::new(r"(?i)</a\s*>").expect("static anchor regex is valid"))
}

/// Net change in raw-HTML anchor depth contributed by one HTML fragment.
fn anchor_depth_delta(html: &str) -> isize {
    anchor_open_regex().find_iter(html).count() as isize
        - anchor_close_regex().find_iter(html).count() as isize
}

fn linkify(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut out = Vec::with_capacity(events.len());
    let mut in_link = 0usize;
    let mut in_html_link = 0isize;
    let mut in_code = 0usize;

    for ev in events {
        match ev {
            Event::Start(Tag::Link { .. }) => {
                in_link += 1;
                out.push(ev);
            }
            Event::End(TagEnd::Link) => {
                in_link = in_link.saturating_sub(1);
                out.push(ev);
            }
            Event::Start(Tag::CodeBlock(_)) => {
                in_code += 1;
                out.push(ev);
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code = in_code.saturating_sub(1);
                out.push(ev);
            }
            Event::InlineHtml(ref html) | Event::Html(ref html) => {
                in_html_link = (in_html_link + anchor_depth_delta(html)).max(0);
                out.push(ev);
            }
            Event::Text(text) if in_link == 0 && in_html_link == 0 && in_code == 0 => {
                split_urls(&text, &mut out);
            }
            other => out.push(other),
        }
    }
    out
}

fn split_urls(text: &str, out: &mut Vec<Event<'_>>) {
    let mut last = 0usize;
    for m in url_regex().find_iter(text) {
        let url = trim_url(m.as_str());
        let end = m.start() + url.len();

        if m.start() > last {
            out.push(Event::Text(CowStr::from(text[last..m.start()].to_string())));
        }
        out.push(Event::Start(Tag::Link {
            link_type: LinkType::Autolink,
            dest_url: CowStr::from(url.to_string()),
            title: CowStr::from(""),
            id: CowStr::from(""),
        }));
        out.push(Event::Text(CowStr::from(url.to_string())));
        out.push(Event::End(TagEnd::Link));
        last = end;
    }
    if last < text.len() {
        out.push(Event::Text(CowStr::from(text[last..].to_string())));
    }
}

/// Strip trailing sentence punctuation. A closing paren is only stripped when
/// it has no opening partner inside the URL.
fn trim_url(raw: &str) -> &str {
    let mut url = raw;
    while let Some(last) = url.chars().last() {
        let strip = match last {
            '.' | ',' | ';' | ':' | '!' | '?' => true,
            ')' => url.matches(')').count() > url.matches('(').count(),
            _ => false,
        };
        if !strip {
            break;
        }
        url = &url[..url.len() - last.len_utf8()];
    }
    url
}
