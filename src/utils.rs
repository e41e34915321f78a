//! Shared utility functions.
//!
//! Common helpers used across modules.

use crate::error::{LeafpressError, Result};
use regex::Regex;
use std::io::Write;
use std::path::Path;
use std::sync::LazyLock;
use tempfile::NamedTempFile;

/// Helper function to check if a path points to a Markdown file.
pub fn is_markdown_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
}

/// Extracts the file stem from a path and returns it as a clean String.
/// Returns an empty string if the path has no file stem.
pub fn file_stem_string(path: &Path) -> String {
    path.file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}

/// Title-cases a slug leaf: splits on `-`/`_`, uppercases the first letter
/// of each word. Used as the default page title when no frontmatter title
/// is given, and as the default auto-index section title.
pub fn title_case(leaf: &str) -> String {
    leaf.split(|c| c == '-' || c == '_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalizes a path to a root-relative, forward-slash string, regardless of
/// host path separator conventions.
pub fn to_forward_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// The top-level path component (first segment) of a root-relative path.
pub fn top_level_component(relative_path: &str) -> &str {
    relative_path.split('/').next().unwrap_or(relative_path)
}

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\r\n]+").unwrap());

/// Strips HTML tags from `html`, decodes entities, and collapses runs of
/// whitespace to single spaces. Shared by word-count derivation (C10) and
/// the search plain-text snapshot.
pub fn strip_html_tags(html: &str) -> String {
    let stripped = TAG_RE.replace_all(html, " ");
    let decoded = html_escape::decode_html_entities(&stripped);
    WHITESPACE_RE.replace_all(decoded.trim(), " ").to_string()
}

/// Writes `content` to `path` atomically: a temp file in the same directory
/// is written and flushed, then renamed into place, so a reader never
/// observes a partially-written file and a crash mid-write leaves the
/// original (or nothing) rather than a truncated file.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| LeafpressError::io(parent, e))?;

    let mut temp = NamedTempFile::new_in(parent).map_err(|e| LeafpressError::io(parent, e))?;
    temp.write_all(content).map_err(|e| LeafpressError::io(path, e))?;
    temp.flush().map_err(|e| LeafpressError::io(path, e))?;
    temp.persist(path).map_err(|e| LeafpressError::io(path, e.error))?;
    Ok(())
}
