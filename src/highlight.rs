//! Syntax highlighting wrapper around `syntect` (used by C5's CommonMark
//! render step).
//!
//! Emits CSS classes rather than inline styles (`ClassedHTMLGenerator`), so
//! the theme lives entirely in `style.css` and isn't baked into every page.
//! The `SyntaxSet` is expensive to build and is constructed once behind a
//! `OnceLock`, shared by every renderer worker.

use std::sync::OnceLock;
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

fn syntax_set() -> &'static SyntaxSet {
    static SET: OnceLock<SyntaxSet> = OnceLock::new();
    SET.get_or_init(SyntaxSet::load_defaults_newlines)
}

/// Highlights `code` as `lang` (a fenced code-block info string), returning
/// a `<pre><code class="language-{lang}">…</code></pre>` block whose spans
/// carry `syntect`'s classed CSS hooks. Falls back to an escaped, unhighlighted
/// block when the language token isn't recognized.
pub fn highlight(code: &str, lang: &str) -> String {
    let ss = syntax_set();
    let token = lang.split_whitespace().next().unwrap_or("");

    let Some(syntax) = (if token.is_empty() {
        None
    } else {
        ss.find_syntax_by_token(token)
    }) else {
        return format!(
            "<pre><code class=\"language-{}\">{}</code></pre>",
            html_escape::encode_text(token),
            html_escape::encode_text(code)
        );
    };

    let mut generator =
        ClassedHTMLGenerator::new_with_class_style(syntax, ss, ClassStyle::Spaced);
    for line in LinesWithEndings::from(code) {
        if generator
            .parse_html_for_line_which_includes_newline(line)
            .is_err()
        {
            return format!(
                "<pre><code class=\"language-{}\">{}</code></pre>",
                html_escape::encode_text(token),
                html_escape::encode_text(code)
            );
        }
    }

    format!(
        "<pre class=\"lp-code\"><code class=\"language-{}\">{}</code></pre>",
        html_escape::encode_text(token),
        generator.finalize()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highlights_known_language() {
        let html = highlight("fn main() {}", "rust");
        assert!(html.contains("<pre"));
        assert!(html.contains("language-rust"));
    }

    #[test]
    fn falls_back_for_unknown_language() {
        let html = highlight("some text", "not-a-real-lang");
        assert!(html.contains("<pre>"));
        assert!(html.contains("some text"));
    }

    #[test]
    fn escapes_html_in_fallback() {
        let html = highlight("<script>evil()</script>", "not-a-real-lang");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
