//! Callout parsing (used by C5, step 3 of the render pipeline).
//!
//! A callout is a blockquote whose first line carries a `[!TYPE]` marker,
//! e.g. `> [!warning] Careful`. This module rewrites such blocks into a
//! titled `<div class="lp-callout lp-callout-TYPE">` wrapper with the
//! body preserved as Markdown (separated from the wrapper tags by blank
//! lines, so pulldown-cmark treats the div open/close as HTML blocks and
//! still parses the intervening body as ordinary Markdown).

use crate::utils::title_case;
use regex::Regex;
use std::sync::LazyLock;

pub static CALLOUT_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^>\s*\[!([^\]]+)\](?:\s+(.*))?$").unwrap());

/// `(title, icon)` for every callout type named in the fixed registry.
/// Unknown types fall back to a title-cased type name and a pin icon.
fn registry_entry(kind_lower: &str) -> (&'static str, &'static str) {
    match kind_lower {
        "note" => ("Note", "📝"),
        "tip" => ("Tip", "💡"),
        "hint" => ("Hint", "💡"),
        "important" => ("Important", "❗"),
        "warning" => ("Warning", "⚠️"),
        "caution" => ("Caution", "⚠️"),
        "danger" => ("Danger", "🔥"),
        "error" => ("Error", "⛔"),
        "info" => ("Info", "ℹ️"),
        "todo" => ("Todo", "☑️"),
        "example" => ("Example", "📋"),
        "quote" => ("Quote", "💬"),
        "question" => ("Question", "❓"),
        "faq" => ("FAQ", "❓"),
        "success" => ("Success", "✅"),
        "check" => ("Check", "✅"),
        "done" => ("Done", "✅"),
        "fail" => ("Fail", "❌"),
        "failure" => ("Failure", "❌"),
        "bug" => ("Bug", "🐛"),
        "abstract" => ("Abstract", "📄"),
        "summary" => ("Summary", "📄"),
        "tldr" => ("TLDR", "📄"),
        _ => ("", "📌"),
    }
}

fn callout_title_and_icon(kind: &str, override_title: Option<&str>) -> (String, &'static str) {
    let lower = kind.to_lowercase();
    let (default_title, icon) = registry_entry(&lower);
    let default_title = if default_title.is_empty() {
        title_case(&lower)
    } else {
        default_title.to_string()
    };
    let title = override_title
        .filter(|t| !t.trim().is_empty())
        .map(|t| t.trim().to_string())
        .unwrap_or(default_title);
    (title, icon)
}

fn strip_quote_prefix(line: &str) -> String {
    let rest = line.strip_prefix('>').unwrap_or(line);
    rest.strip_prefix(' ').unwrap_or(rest).to_string()
}

/// Rewrites every callout block found in `input` into its HTML wrapper,
/// leaving non-callout text untouched.
pub fn transform(input: &str) -> String {
    let lines: Vec<&str> = input.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        let Some(caps) = CALLOUT_HEADER_RE.captures(lines[i]) else {
            out.push(lines[i].to_string());
            i += 1;
            continue;
        };

        let kind = caps.get(1).unwrap().as_str().trim().to_string();
        let override_title = caps.get(2).map(|m| m.as_str().to_string());
        i += 1;

        let mut body_lines = Vec::new();
        loop {
            if i >= lines.len() {
                break;
            }
            let line = lines[i];
            if line.starts_with('>') {
                body_lines.push(strip_quote_prefix(line));
                i += 1;
            } else if line.trim().is_empty() {
                let continues = lines
                    .get(i + 1)
                    .map(|next| next.starts_with('>') && !CALLOUT_HEADER_RE.is_match(next))
                    .unwrap_or(false);
                if continues {
                    body_lines.push(String::new());
                    i += 1;
                } else {
                    break;
                }
            } else {
                break;
            }
        }

        let (title, icon) = callout_title_and_icon(&kind, override_title.as_deref());
        out.push(format!(
            "<div class=\"lp-callout lp-callout-{}\">",
            kind.to_lowercase()
        ));
        out.push(format!(
            "<p class=\"lp-callout-title\"><span class=\"lp-callout-icon\">{icon}</span> {title}</p>"
        ));
        out.push(String::new());
        out.extend(body_lines);
        out.push(String::new());
        out.push("</div>".to_string());
    }

    out.join("\n")
}
