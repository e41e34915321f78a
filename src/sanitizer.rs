//! HTML sanitization pass applied after rendering (C5).

use ammonia::Builder;
use std::collections::HashSet;

/// Cleans rendered Markdown HTML, removing dangerous tags/attributes as a
/// defense-in-depth layer behind a trusted renderer (C5). The allowlist is
/// shaped around this crate's actual render vocabulary: callout/wikilink
/// divs and spans, syntect's classed code spans, citations, and lazy-loaded
/// images.
pub fn sanitize_html(dirty_html: &str) -> String {
    Builder::new()
        .tags(HashSet::from([
            "div",
            "figure",
            "img",
            "figcaption",
            "strong",
            "b",
            "em",
            "i",
            "p",
            "br",
            "h1",
            "h2",
            "h3",
            "h4",
            "h5",
            "h6",
            "pre",
            "code",
            "blockquote",
            "cite",
            "ul",
            "ol",
            "li",
            "a",
            "table",
            "thead",
            "tbody",
            "tr",
            "th",
            "td",
            "span",
            "hr",      // Horizontal Rule
            "del",     // Strikethrough
            "s",       // Strikethrough (alternative)
            "sub",     // Subscript
            "sup",     // Superscript
            "dl",      // Definition List
            "dt",      // Definition Term
            "dd",      // Definition Description
            "details", // Collapsible details element
            "summary", // Summary for the details element
        ]))
        .add_tag_attributes("img", &["src", "data", "alt", "style", "width", "height", "loading", "decoding"])
        .add_tag_attributes("figure", &["style"])
        .add_tag_attributes("figcaption", &["style"])
        .add_tag_attributes("div", &["class"])
        .add_tag_attributes("a", &["href", "title", "class", "data-path", "target", "rel"])
        .add_tag_attributes("span", &["class"])
        .add_tag_attributes("pre", &["class"])
        .add_tag_attributes("code", &["class"])
        .add_tag_attributes("li", &["class"])
        .add_tag_attributes("details", &["open"])
        .add_tag_attributes("abbr", &["title"]) // Allow title for abbreviations
        .add_tag_attributes("th", &["style", "align"]) // Allow table header alignment
        .add_tag_attributes("td", &["style", "align"]) // Allow table cell alignment
        // Allow 'id' attribute on all heading tags for TOC linking.
        .add_tag_attributes("h1", &["id"])
        .add_tag_attributes("h2", &["id"])
        .add_tag_attributes("h3", &["id"])
        .add_tag_attributes("h4", &["id"])
        .add_tag_attributes("h5", &["id"])
        .add_tag_attributes("h6", &["id"])
        .link_rel(None)
        .clean(dirty_html)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_callout_div_with_class() {
        let html = r#"<div class="lp-callout lp-callout-tip"><p>hi</p></div>"#;
        let out = sanitize_html(html);
        assert!(out.contains(r#"<div class="lp-callout lp-callout-tip">"#));
    }

    #[test]
    fn preserves_external_link_attributes() {
        let html = r#"<a class="lp-external" href="https://example.com" target="_blank" rel="noopener">x</a>"#;
        let out = sanitize_html(html);
        assert!(out.contains(r#"target="_blank""#));
        assert!(out.contains(r#"rel="noopener""#));
    }

    #[test]
    fn preserves_lazy_image_attributes() {
        let html = r#"<img src="/a.png" alt="a" loading="lazy" decoding="async">"#;
        let out = sanitize_html(html);
        assert!(out.contains(r#"loading="lazy""#));
        assert!(out.contains(r#"decoding="async""#));
    }

    #[test]
    fn strips_script_tags() {
        let html = "<p>safe</p><script>evil()</script>";
        let out = sanitize_html(html);
        assert!(!out.contains("script"));
        assert!(out.contains("safe"));
    }
}
