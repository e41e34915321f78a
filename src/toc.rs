//! Table-of-contents extractor (C6).
//!
//! Walks rendered HTML for `<h2>`/`<h3>` elements, assigns each a
//! deduplicated slug ID (injecting it into the heading tag unless one is
//! already present), and emits a flat, document-ordered TOC list.

use crate::models::TocEntry;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static HEADING_RE: LazyLock<Regex> = LazyLock::new(|| {
    regex::RegexBuilder::new(r#"<h([23])((?:\s[^>]*)?)>(.*?)</h[23]>"#)
        .dot_matches_new_line(true)
        .build()
        .unwrap()
});

static EXISTING_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"\bid\s*=\s*"([^"]*)""#).unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static NON_ALNUM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Slugifies heading display text into an ID: strip non-ASCII, lowercase,
/// collapse runs of non-alphanumeric characters to `-`, trim hyphens. An
/// all-non-ASCII heading produces an empty base, which is special-cased to
/// `"section"` before dedup so the dedup counter never operates on `""`.
fn slugify(text: &str) -> String {
    let ascii_only: String = text.chars().filter(|c| c.is_ascii()).collect();
    let lower = ascii_only.to_lowercase();
    let collapsed = NON_ALNUM_RE.replace_all(&lower, "-");
    let trimmed = collapsed.trim_matches('-').to_string();
    if trimmed.is_empty() {
        "section".to_string()
    } else {
        trimmed
    }
}

fn strip_tags_and_decode(fragment: &str) -> String {
    let stripped = TAG_RE.replace_all(fragment, "");
    html_escape::decode_html_entities(&stripped).into_owned()
}

/// Extracts a flat TOC list from `html` and returns `(html, toc)`, where
/// `html` carries an `id` on every `<h2>`/`<h3>` that lacked one.
pub fn extract_and_inject(html: &str) -> (String, Vec<TocEntry>) {
    let mut toc = Vec::new();
    let mut counts: HashMap<String, u32> = HashMap::new();
    let mut out = String::with_capacity(html.len());
    let mut last_end = 0;

    for cap in HEADING_RE.captures_iter(html) {
        let whole = cap.get(0).unwrap();
        let level: u8 = cap.get(1).unwrap().as_str().parse().unwrap();
        let attrs = cap.get(2).unwrap().as_str();
        let inner = cap.get(3).unwrap().as_str();

        out.push_str(&html[last_end..whole.start()]);

        let display_text = strip_tags_and_decode(inner);

        let (id, new_attrs) = if let Some(existing) = EXISTING_ID_RE.captures(attrs) {
            let id = existing.get(1).unwrap().as_str().to_string();
            *counts.entry(id.clone()).or_insert(0) += 1;
            (id, attrs.to_string())
        } else {
            let base = slugify(&display_text);
            let n = counts.entry(base.clone()).or_insert(0);
            let id = if *n == 0 {
                base.clone()
            } else {
                format!("{base}-{n}")
            };
            *n += 1;
            (id.clone(), format!(" id=\"{id}\"{attrs}"))
        };

        out.push_str(&format!("<h{level}{new_attrs}>{inner}</h{level}>"));
        toc.push(TocEntry {
            id,
            text: display_text,
            level,
        });

        last_end = whole.end();
    }
    out.push_str(&html[last_end..]);

    (out, toc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_flat_ordered_toc() {
        let html = "<h2>First</h2><p>text</p><h3>Second</h3>";
        let (_, toc) = extract_and_inject(html);
        assert_eq!(toc.len(), 2);
        assert_eq!(toc[0].text, "First");
        assert_eq!(toc[0].level, 2);
        assert_eq!(toc[1].text, "Second");
        assert_eq!(toc[1].level, 3);
    }

    #[test]
    fn injects_id_when_absent() {
        let html = "<h2>Hello World</h2>";
        let (out, toc) = extract_and_inject(html);
        assert!(out.contains(r#"id="hello-world""#));
        assert_eq!(toc[0].id, "hello-world");
    }

    #[test]
    fn preserves_existing_id() {
        let html = r#"<h2 id="custom-id" class="foo">Hello</h2>"#;
        let (out, toc) = extract_and_inject(html);
        assert_eq!(out.matches("id=").count(), 1);
        assert_eq!(toc[0].id, "custom-id");
    }

    #[test]
    fn dedups_repeated_headings() {
        let html = "<h2>Intro</h2><h2>Intro</h2><h2>Intro</h2>";
        let (_, toc) = extract_and_inject(html);
        assert_eq!(toc[0].id, "intro");
        assert_eq!(toc[1].id, "intro-1");
        assert_eq!(toc[2].id, "intro-2");
    }

    #[test]
    fn all_non_ascii_heading_falls_back_to_section() {
        let html = "<h2>日本語</h2><h2>日本語</h2>";
        let (_, toc) = extract_and_inject(html);
        assert_eq!(toc[0].id, "section");
        assert_eq!(toc[1].id, "section-1");
    }

    #[test]
    fn strips_inline_tags_from_display_text() {
        let html = "<h2><em>Hello</em> &amp; World</h2>";
        let (_, toc) = extract_and_inject(html);
        assert_eq!(toc[0].text, "Hello & World");
    }

    #[test]
    fn ignores_h1_and_h4() {
        let html = "<h1>Title</h1><h2>Sub</h2><h4>Deep</h4>";
        let (_, toc) = extract_and_inject(html);
        assert_eq!(toc.len(), 1);
        assert_eq!(toc[0].text, "Sub");
    }
}
