//! Frontmatter parser (C1).
//!
//! Splits a Markdown file into a metadata header and body, parses the
//! header into a concrete [`Frontmatter`], and derives the `created`/
//! `modified` page dates per the date-precedence rule.

use crate::error::{LeafpressError, Result};
use crate::models::Frontmatter;
use chrono::NaiveDateTime;
use std::path::Path;

/// Splits `content` into a frontmatter string and the remaining body.
///
/// If the file's first line is exactly `---`, lines are consumed until the
/// next line that is exactly `---`; the enclosed block is returned as the
/// frontmatter string. If the delimiter is never closed, this is a fatal
/// error (`FrontmatterUnterminated`). If the file does not start with
/// `---`, the entire file is the body and the frontmatter string is empty.
/// Leading newlines in the body are trimmed after the closing delimiter.
pub fn split(content: &str, display_path: &str) -> Result<(&str, &str)> {
    let Some(after_opening) = content.strip_prefix("---\n") else {
        return Ok(("", content));
    };

    let Some(closing_pos) = find_closing_delimiter(after_opening) else {
        return Err(LeafpressError::frontmatter(
            display_path,
            "unterminated frontmatter delimiter (no closing '---' line)",
        ));
    };

    let frontmatter = &after_opening[..closing_pos];
    let after_marker = after_opening[closing_pos..]
        .strip_prefix("\n---")
        .unwrap_or(&after_opening[closing_pos..]);
    let body = after_marker.trim_start_matches('\n');

    Ok((frontmatter, body))
}

/// Finds the offset of a `\n---` marker whose following character is either
/// absent, a newline, or otherwise forms a delimiter line on its own (per
/// the closing-delimiter protocol: the marker must be a full line).
fn find_closing_delimiter(s: &str) -> Option<usize> {
    let mut search_from = 0;
    while let Some(rel) = s[search_from..].find("\n---") {
        let pos = search_from + rel;
        let after = &s[pos + 4..];
        if after.is_empty() || after.starts_with('\n') || after.chars().next().unwrap().is_whitespace() {
            return Some(pos);
        }
        search_from = pos + 4;
    }
    None
}

/// Parses the YAML frontmatter block into a [`Frontmatter`] struct, applying
/// defaults for an empty block. Validates the `growth` enum eagerly since
/// the spec treats an out-of-range value as a parse failure rather than a
/// silently-ignored field.
pub fn parse(frontmatter_str: &str, display_path: &str) -> Result<Frontmatter> {
    if frontmatter_str.trim().is_empty() {
        return Ok(Frontmatter::default());
    }

    let fm: Frontmatter = serde_yaml::from_str(frontmatter_str)
        .map_err(|e| LeafpressError::frontmatter(display_path, e.to_string()))?;

    if let Some(raw) = &fm.growth {
        if crate::models::Growth::parse(raw).is_none() {
            return Err(LeafpressError::frontmatter(
                display_path,
                format!("invalid growth value '{raw}' (expected seedling/budding/evergreen)"),
            ));
        }
    }

    Ok(fm)
}

/// Parses a frontmatter date string in any of the formats named in the
/// config/frontmatter schema. Unparseable or empty strings return `None`
/// rather than erroring — an unparseable date degrades to the mtime
/// fallback, it does not fail the build.
pub fn parse_flexible_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    if let Ok(d) = chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(d.and_hms_opt(0, 0, 0).unwrap());
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    if let Ok(d) = chrono::NaiveDate::parse_from_str(raw, "%B %e, %Y") {
        return Some(d.and_hms_opt(0, 0, 0).unwrap());
    }
    if let Ok(d) = chrono::NaiveDate::parse_from_str(raw, "%b %e, %Y") {
        return Some(d.and_hms_opt(0, 0, 0).unwrap());
    }
    None
}

/// Resolves `(created, modified, has_modified)` from a frontmatter and a
/// file-mtime fallback, per the date-precedence rule in §3: `created` is
/// the first non-empty/parseable of `{date, created, createdAt}`, falling
/// back to `mtime`; `modified` is the first non-empty/parseable of
/// `{modified, updated, updatedAt}` and may stay unset. A page "has
/// modified" iff `modified` is set and differs from `created`.
pub fn resolve_dates(fm: &Frontmatter, mtime: NaiveDateTime) -> (NaiveDateTime, Option<NaiveDateTime>, bool) {
    let created = [&fm.date, &fm.created, &fm.created_at]
        .into_iter()
        .flatten()
        .find_map(|s| parse_flexible_date(s))
        .unwrap_or(mtime);

    let modified = [&fm.modified, &fm.updated, &fm.updated_at]
        .into_iter()
        .flatten()
        .find_map(|s| parse_flexible_date(s));

    let has_modified = matches!(modified, Some(m) if m != created);

    (created, modified, has_modified)
}

/// Reads a file's mtime as a `NaiveDateTime`, used as the `created` fallback
/// when no frontmatter date is present or parseable.
pub fn file_mtime(path: &Path) -> Result<NaiveDateTime> {
    let metadata = std::fs::metadata(path).map_err(|e| LeafpressError::io(path, e))?;
    let modified = metadata.modified().map_err(|e| LeafpressError::io(path, e))?;
    Ok(chrono::DateTime::<chrono::Utc>::from(modified).naive_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_handles_full_frontmatter() {
        let content = "---\ntitle: Hi\n---\nBody text.\n";
        let (fm, body) = split(content, "x.md").unwrap();
        assert_eq!(fm, "title: Hi");
        assert_eq!(body, "Body text.\n");
    }

    #[test]
    fn split_handles_no_frontmatter() {
        let content = "Just a body.\n";
        let (fm, body) = split(content, "x.md").unwrap();
        assert_eq!(fm, "");
        assert_eq!(body, "Just a body.\n");
    }

    #[test]
    fn split_fails_on_unterminated_delimiter() {
        let content = "---\ntitle: Hi\nno closer here\n";
        let err = split(content, "x.md").unwrap_err();
        assert!(matches!(err, LeafpressError::Frontmatter { .. }));
    }

    #[test]
    fn parse_rejects_invalid_growth() {
        let err = parse("growth: mythical", "x.md").unwrap_err();
        assert!(matches!(err, LeafpressError::Frontmatter { .. }));
    }

    #[test]
    fn parse_accepts_valid_growth_and_defaults() {
        let fm = parse("growth: evergreen\ntags: [a, b]", "x.md").unwrap();
        assert_eq!(fm.growth.as_deref(), Some("evergreen"));
        assert_eq!(fm.tags, vec!["a", "b"]);
        assert!(!fm.draft);
    }

    #[test]
    fn date_precedence_prefers_date_then_created_then_created_at() {
        let fm = Frontmatter {
            created_at: Some("2024-01-01".into()),
            ..Default::default()
        };
        let mtime = chrono::NaiveDate::from_ymd_opt(2099, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let (created, modified, has_modified) = resolve_dates(&fm, mtime);
        assert_eq!(created.date(), chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert!(modified.is_none());
        assert!(!has_modified);
    }

    #[test]
    fn date_precedence_falls_back_to_mtime_when_unset() {
        let fm = Frontmatter::default();
        let mtime = chrono::NaiveDate::from_ymd_opt(2030, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let (created, _, _) = resolve_dates(&fm, mtime);
        assert_eq!(created, mtime);
    }

    #[test]
    fn has_modified_false_when_equal_to_created() {
        let fm = Frontmatter {
            date: Some("2024-01-15".into()),
            modified: Some("2024-01-15".into()),
            ..Default::default()
        };
        let mtime = chrono::NaiveDateTime::default();
        let (_, _, has_modified) = resolve_dates(&fm, mtime);
        assert!(!has_modified);
    }

    #[test]
    fn parses_multiple_date_formats() {
        assert!(parse_flexible_date("2024-01-15").is_some());
        assert!(parse_flexible_date("2024-01-15T10:00:00Z").is_some());
        assert!(parse_flexible_date("2024-01-15 10:00:00").is_some());
        assert!(parse_flexible_date("January 2, 2006").is_some());
        assert!(parse_flexible_date("Jan 2, 2006").is_some());
        assert!(parse_flexible_date("not a date").is_none());
        assert!(parse_flexible_date("").is_none());
    }
}
