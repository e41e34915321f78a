//! Markdown renderer (C5) and reading-time/plain-text derivation (C10).
//!
//! Transforms a page's raw Markdown body into rendered HTML through the
//! pipeline in order: code-block protection, Obsidian image embeds,
//! callouts, wiki-link rewriting, sentinel restoration, CommonMark+GFM
//! render, external-link rewriting, lazy-image rewriting, blockquote
//! citation rewriting. Reading time, word/image counts, and the search
//! plain-text snapshot are derived from the same pass.

use crate::config::Config;
use crate::models::{Page, Warning};
use crate::wikilink::{self, LinkResolver, Resolution};
use parking_lot::Mutex;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use rayon::prelude::*;
use regex::{Captures, Regex, RegexBuilder};
use std::sync::LazyLock;

/// Average reading speed, in words per minute, used by the reading-time
/// estimate. A compile-time constant of the core, not user-configurable.
const WPM: f64 = 150.0;

const FRAGMENT: &AsciiSet = &CONTROLS.add(b' ');

static FENCED_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| RegexBuilder::new(r"```.*?```").dot_matches_new_line(true).build().unwrap());
static INLINE_CODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`[^`\n]+`").unwrap());
static IMAGE_EMBED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[\[([^\]\|]+)(?:\|([^\]]+))?\]\]").unwrap());
static EXTERNAL_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r#"<a href="(https?://[^"]+)"([^>]*)>(.*?)</a>"#)
        .dot_matches_new_line(true)
        .build()
        .unwrap()
});
static IMG_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<img\b[^>]*>").unwrap());
static BLOCKQUOTE_P_CITE_RE: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"(<blockquote>.*?)\s*<p>[-\u{2014}]\s*([^<]+)</p>\s*</blockquote>")
        .dot_matches_new_line(true)
        .build()
        .unwrap()
});
static BLOCKQUOTE_UL_CITE_RE: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"(<blockquote>.*?)\s*<ul>\s*<li>([^<]+)</li>\s*</ul>\s*</blockquote>")
        .dot_matches_new_line(true)
        .build()
        .unwrap()
});
static IMG_COUNT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<img\b").unwrap());

/// The result of rendering a single page's body. `html` still carries
/// unresolved `__LP_PERMALINK_{idx}__` wiki-link placeholders until passed
/// through [`finalize_wikilink_hrefs`] against a full permalink snapshot.
pub struct Rendered {
    pub html: String,
    pub toc: Vec<crate::models::TocEntry>,
    pub word_count: usize,
    pub image_count: usize,
    pub plain_text: String,
    pub reading_time: u32,
    pub warnings: Vec<Warning>,
}

/// Renders every page in `pages` in parallel (worker pool sized
/// min(CPUs, |pages|) via rayon's default pool), mutating each page's
/// `html`/`toc`/count fields in place. Returns the collected warnings.
pub fn render_all(pages: &mut [Page], resolver: &LinkResolver, config: &Config) -> Vec<Warning> {
    let permalinks: Vec<String> = pages.iter().map(|p| p.permalink.clone()).collect();
    let warnings = Mutex::new(Vec::new());

    pages.par_iter_mut().for_each(|page| {
        let rendered = render_one(page, resolver, config);
        page.html = finalize_wikilink_hrefs(&rendered.html, &permalinks, &config.base_url);
        page.toc = rendered.toc;
        page.word_count = rendered.word_count;
        page.image_count = rendered.image_count;
        page.plain_text = rendered.plain_text;
        page.reading_time = rendered.reading_time;
        if !rendered.warnings.is_empty() {
            warnings.lock().extend(rendered.warnings);
        }
    });

    warnings.into_inner()
}

/// Renders a single page. Exposed separately from [`render_all`] so the
/// incremental rebuilder (C9) can re-render just its impact set.
pub fn render_one(page: &Page, resolver: &LinkResolver, config: &Config) -> RenderOutcome {
    let mut warnings = Vec::new();

    let (protected, code_blocks, prefix) = protect_code(&page.raw_body);
    let with_images = rewrite_image_embeds(&protected);
    let with_callouts = crate::callouts::transform(&with_images);
    let with_links = if config.wikilinks {
        rewrite_wikilinks(&with_callouts, resolver, &page.source_path, &mut warnings)
    } else {
        with_callouts
    };
    let restored = restore_code(&with_links, &code_blocks, &prefix);

    let html = match commonmark_render(&restored) {
        Ok(html) => html,
        Err(reason) => {
            warnings.push(Warning::RenderError {
                source: page.source_path.clone(),
                reason: reason.clone(),
            });
            html_escape::encode_text(&page.raw_body).into_owned()
        }
    };

    let html = rewrite_external_links(&html);
    let html = rewrite_lazy_images(&html);
    let html = rewrite_blockquote_citations(&html);
    let html = crate::sanitizer::sanitize_html(&html);

    let toc_enabled = page.toc_override.unwrap_or(config.toc);
    let (html, toc) = if toc_enabled {
        crate::toc::extract_and_inject(&html)
    } else {
        (html, Vec::new())
    };

    let stripped = crate::utils::strip_html_tags(&html);
    let word_count = stripped.split_whitespace().count();
    let image_count = IMG_COUNT_RE.find_iter(&html).count();
    let reading_time = page.reading_time_override.unwrap_or_else(|| {
        let minutes = (word_count as f64 / WPM) + (image_count as f64 * 12.0 / 60.0);
        minutes.ceil().max(1.0) as u32
    });

    let plain_text: String = stripped.chars().take(5000).collect();

    RenderOutcome {
        html,
        toc,
        word_count,
        image_count,
        plain_text,
        reading_time,
        warnings,
    }
}

/// Public alias for the per-page render result, used by the incremental
/// rebuilder when re-rendering a subset of pages.
pub type RenderOutcome = Rendered;

/// Determines a sentinel prefix guaranteed absent from `body`, falling back
/// to a body-length-derived alternate if the default prefix collides with
/// user content, per the spec's permitted alternative.
fn sentinel_prefix_for(body: &str) -> String {
    const DEFAULT: &str = "___CODE_BLOCK_";
    if body.contains(DEFAULT) {
        format!("___LPCB{}_", body.len())
    } else {
        DEFAULT.to_string()
    }
}

/// Extracts fenced and inline code spans, replacing each with a sentinel so
/// later substitutions never touch code content.
fn protect_code(body: &str) -> (String, Vec<String>, String) {
    let prefix = sentinel_prefix_for(body);
    let mut blocks = Vec::new();

    let with_fenced = FENCED_CODE_RE.replace_all(body, |caps: &Captures| {
        blocks.push(caps[0].to_string());
        format!("{prefix}{}___", blocks.len() - 1)
    });
    let with_inline = INLINE_CODE_RE.replace_all(&with_fenced, |caps: &Captures| {
        blocks.push(caps[0].to_string());
        format!("{prefix}{}___", blocks.len() - 1)
    });

    (with_inline.into_owned(), blocks, prefix)
}

fn restore_code(text: &str, blocks: &[String], prefix: &str) -> String {
    let mut out = text.to_string();
    for (idx, block) in blocks.iter().enumerate() {
        out = out.replace(&format!("{prefix}{idx}___"), block);
    }
    out
}

/// Rewrites `![[FILE]]`/`![[FILE|ALT]]` Obsidian embeds into standard
/// Markdown image syntax pointing at `/static/images/…`, percent-encoding
/// spaces in the filename.
fn rewrite_image_embeds(text: &str) -> String {
    IMAGE_EMBED_RE
        .replace_all(text, |caps: &Captures| {
            let file = caps.get(1).unwrap().as_str().trim();
            let alt = caps.get(2).map(|m| m.as_str().trim()).unwrap_or(file);
            let encoded = utf8_percent_encode(file, FRAGMENT).to_string();
            format!("![{alt}](/static/images/{encoded})")
        })
        .into_owned()
}

/// Rewrites each extracted wiki-link occurrence in document order, only
/// ever replacing the first remaining occurrence of its exact raw text —
/// so repeated identical links are each substituted as the extraction
/// iterator advances, rather than all at once.
fn rewrite_wikilinks(
    text: &str,
    resolver: &LinkResolver,
    source_path: &str,
    warnings: &mut Vec<Warning>,
) -> String {
    let mut out = text.to_string();

    for link in wikilink::extract(text) {
        let replacement = match resolver.resolve(&link.target) {
            Resolution::Ambiguous(idx) => {
                warnings.push(Warning::AmbiguousLink {
                    source: source_path.to_string(),
                    target: link.target.clone(),
                });
                format!(
                    r#"<a class="lp-wikilink" href="__LP_PERMALINK_{idx}__">{}</a>"#,
                    link.label
                )
            }
            Resolution::Hit(idx) => format!(
                r#"<a class="lp-wikilink" href="__LP_PERMALINK_{idx}__">{}</a>"#,
                link.label
            ),
            Resolution::Broken => {
                warnings.push(Warning::BrokenLink {
                    source: source_path.to_string(),
                    target: link.target.clone(),
                });
                format!(r#"<span class="lp-broken-link">{}</span>"#, link.label)
            }
        };
        out = out.replacen(&link.raw, &replacement, 1);
    }

    out
}

/// Resolves `__LP_PERMALINK_{idx}__` placeholders left by [`rewrite_wikilinks`]
/// into real permalinks, once the full page set's permalinks are known. Kept
/// as a separate pass over a plain `&[String]` snapshot, rather than `&[Page]`,
/// so [`render_all`]'s `par_iter_mut` over pages never needs a concurrent
/// immutable borrow of the same slice it's mutating.
pub fn finalize_wikilink_hrefs(html: &str, permalinks: &[String], base_path: &str) -> String {
    static PLACEHOLDER_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"__LP_PERMALINK_(\d+)__").unwrap());

    PLACEHOLDER_RE
        .replace_all(html, |caps: &Captures| {
            let idx: usize = caps[1].parse().unwrap_or(0);
            permalinks
                .get(idx)
                .map(|permalink| format!("{base_path}{permalink}"))
                .unwrap_or_default()
        })
        .into_owned()
}

fn commonmark_render(markdown: &str) -> Result<String, String> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_HEADING_ATTRIBUTES);

    let parser = Parser::new_ext(markdown, options);

    let mut events = Vec::new();
    let mut code_lang = String::new();
    let mut code_buf = String::new();
    let mut in_code_block = false;

    for event in parser {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                in_code_block = true;
                code_buf.clear();
                code_lang = match kind {
                    CodeBlockKind::Fenced(lang) => lang.to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
            }
            Event::Text(text) if in_code_block => {
                code_buf.push_str(&text);
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                let html = crate::highlight::highlight(&code_buf, &code_lang);
                events.push(Event::Html(CowStr::from(html)));
            }
            // Hard line breaks: every soft break renders as <br />.
            Event::SoftBreak => events.push(Event::HardBreak),
            other => events.push(other),
        }
    }

    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, events.into_iter());
    Ok(html)
}

fn rewrite_external_links(html: &str) -> String {
    EXTERNAL_LINK_RE
        .replace_all(html, |caps: &Captures| {
            let href = &caps[1];
            let extra_attrs = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            let text = &caps[3];
            format!(
                r#"<a class="lp-external" href="{href}" target="_blank" rel="noopener"{extra_attrs}>{text} ↗</a>"#
            )
        })
        .into_owned()
}

fn rewrite_lazy_images(html: &str) -> String {
    IMG_TAG_RE
        .replace_all(html, |caps: &Captures| {
            let tag = &caps[0];
            if tag.contains("loading=") {
                return tag.to_string();
            }
            if let Some(stripped) = tag.strip_suffix("/>") {
                format!(r#"{stripped}loading="lazy" decoding="async"/>"#)
            } else if let Some(stripped) = tag.strip_suffix('>') {
                format!(r#"{stripped} loading="lazy" decoding="async">"#)
            } else {
                tag.to_string()
            }
        })
        .into_owned()
}

fn rewrite_blockquote_citations(html: &str) -> String {
    let with_p = BLOCKQUOTE_P_CITE_RE.replace_all(html, |caps: &Captures| {
        format!("{}<cite>{}</cite></blockquote>", &caps[1], caps[2].trim())
    });
    BLOCKQUOTE_UL_CITE_RE
        .replace_all(&with_p, |caps: &Captures| {
            format!("{}<cite>{}</cite></blockquote>", &caps[1], caps[2].trim())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Page;

    fn test_page(slug: &str, body: &str) -> Page {
        Page {
            source_path: format!("{slug}.md"),
            slug: slug.to_string(),
            permalink: format!("/{slug}/"),
            output_path: format!("{slug}/index.html"),
            title: slug.to_string(),
            description: None,
            created: chrono::NaiveDateTime::default(),
            modified: None,
            has_modified: false,
            tags: Vec::new(),
            draft: false,
            growth: None,
            toc_override: None,
            show_list: None,
            section_sort: None,
            image: None,
            reading_time_override: None,
            raw_body: body.to_string(),
            html: String::new(),
            plain_text: String::new(),
            word_count: 0,
            image_count: 0,
            reading_time: 0,
            out_links: Vec::new(),
            backlinks: Vec::new(),
            toc: Vec::new(),
            is_index: false,
        }
    }

    fn default_config() -> Config {
        Config::default()
    }

    #[test]
    fn renders_plain_markdown() {
        let page = test_page("a", "Hello **world**.");
        let resolver = LinkResolver::build(&[]);
        let out = render_one(&page, &resolver, &default_config());
        assert!(out.html.contains("<strong>world</strong>"));
    }

    #[test]
    fn wikilink_hit_produces_anchor_placeholder() {
        let pages = vec![test_page("a", "Link to [[b]]."), test_page("b", "hi")];
        let resolver = LinkResolver::build(&pages);
        let out = render_one(&pages[0], &resolver, &default_config());
        assert!(out.html.contains("lp-wikilink"));
        assert!(out.html.contains("__LP_PERMALINK_1__"));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn broken_wikilink_emits_span_and_warning() {
        let page = test_page("a", "See [[does-not-exist]].");
        let resolver = LinkResolver::build(&[test_page("a", "")]);
        let out = render_one(&page, &resolver, &default_config());
        assert!(out.html.contains(r#"<span class="lp-broken-link">does-not-exist</span>"#));
        assert!(out
            .warnings
            .iter()
            .any(|w| w.to_string() == "broken link: [[does-not-exist]]"));
    }

    #[test]
    fn code_fence_protects_wikilink_syntax() {
        let page = test_page("a", "```markdown\n[[wiki-link]]\n```\n");
        let resolver = LinkResolver::build(&[]);
        let out = render_one(&page, &resolver, &default_config());
        assert!(out.html.contains("[[wiki-link]]"));
        assert!(!out.html.contains("lp-wikilink"));
    }

    #[test]
    fn inline_code_protects_wikilink_syntax() {
        let page = test_page("a", "Use `[[foo]]` syntax.");
        let resolver = LinkResolver::build(&[]);
        let out = render_one(&page, &resolver, &default_config());
        assert!(out.html.contains("[[foo]]"));
        assert!(!out.html.contains("lp-broken-link"));
    }

    #[test]
    fn obsidian_image_embed_rewritten() {
        let page = test_page("a", "![[My Photo.png]]");
        let resolver = LinkResolver::build(&[]);
        let out = render_one(&page, &resolver, &default_config());
        assert!(out.html.contains("/static/images/My%20Photo.png"));
    }

    #[test]
    fn external_link_gets_rel_and_arrow() {
        let page = test_page("a", "[ext](https://example.com)");
        let resolver = LinkResolver::build(&[]);
        let out = render_one(&page, &resolver, &default_config());
        assert!(out.html.contains(r#"class="lp-external""#));
        assert!(out.html.contains("target=\"_blank\""));
        assert!(out.html.contains('↗'));
    }

    #[test]
    fn lazy_loading_added_to_images_without_loading_attr() {
        let page = test_page("a", "![alt](/static/images/x.png)");
        let resolver = LinkResolver::build(&[]);
        let out = render_one(&page, &resolver, &default_config());
        assert!(out.html.contains(r#"loading="lazy""#));
        assert!(out.html.contains(r#"decoding="async""#));
    }

    #[test]
    fn blockquote_dash_citation_becomes_cite() {
        let page = test_page("a", "> Some quote\n>\n> - Famous Person\n");
        let resolver = LinkResolver::build(&[]);
        let out = render_one(&page, &resolver, &default_config());
        assert!(out.html.contains("<cite>Famous Person</cite>"));
    }

    #[test]
    fn callout_is_wrapped_in_div() {
        let page = test_page("a", "> [!warning] Careful\n> Body text here.\n");
        let resolver = LinkResolver::build(&[]);
        let out = render_one(&page, &resolver, &default_config());
        assert!(out.html.contains("lp-callout lp-callout-warning"));
        assert!(out.html.contains("Careful"));
    }

    #[test]
    fn reading_time_uses_override_when_set() {
        let mut page = test_page("a", "word ".repeat(1000).as_str());
        page.reading_time_override = Some(3);
        let resolver = LinkResolver::build(&[]);
        let out = render_one(&page, &resolver, &default_config());
        assert_eq!(out.reading_time, 3);
    }

    #[test]
    fn reading_time_is_at_least_one_minute() {
        let page = test_page("a", "short");
        let resolver = LinkResolver::build(&[]);
        let out = render_one(&page, &resolver, &default_config());
        assert_eq!(out.reading_time, 1);
    }

    #[test]
    fn plain_text_is_truncated_to_5000_chars() {
        let page = test_page("a", &"word ".repeat(2000));
        let resolver = LinkResolver::build(&[]);
        let out = render_one(&page, &resolver, &default_config());
        assert!(out.plain_text.chars().count() <= 5000);
    }

    #[test]
    fn toc_disabled_by_config_yields_no_toc() {
        let mut config = default_config();
        config.toc = false;
        let page = test_page("a", "## Heading\n\nbody");
        let resolver = LinkResolver::build(&[]);
        let out = render_one(&page, &resolver, &config);
        assert!(out.toc.is_empty());
    }

    #[test]
    fn toc_page_override_forces_on() {
        let mut config = default_config();
        config.toc = false;
        let mut page = test_page("a", "## Heading\n\nbody");
        page.toc_override = Some(true);
        let resolver = LinkResolver::build(&[]);
        let out = render_one(&page, &resolver, &config);
        assert_eq!(out.toc.len(), 1);
    }

    #[test]
    fn finalize_wikilink_hrefs_substitutes_real_permalinks() {
        let permalinks = vec!["/a/".to_string(), "/b/".to_string()];
        let html = r#"<a href="__LP_PERMALINK_1__">b</a>"#;
        let out = finalize_wikilink_hrefs(html, &permalinks, "");
        assert_eq!(out, r#"<a href="/b/">b</a>"#);
    }
}
