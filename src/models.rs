//! The data model: frontmatter, pages, and the flat lookup structures that
//! sit on top of a page set.

use serde::{Deserialize, Serialize};

/// A curation marker rendered as a leaf emoji in the page header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Growth {
    Seedling,
    Budding,
    Evergreen,
}

impl Growth {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_lowercase().as_str() {
            "seedling" => Some(Growth::Seedling),
            "budding" => Some(Growth::Budding),
            "evergreen" => Some(Growth::Evergreen),
            _ => None,
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Growth::Seedling => "🌱",
            Growth::Budding => "🌿",
            Growth::Evergreen => "🌳",
        }
    }
}

/// Section sort order, set in an `_index.md`'s frontmatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionSort {
    #[default]
    Date,
    Title,
    Growth,
}

/// The frontmatter header of a page: a concrete struct with a fixed,
/// enumerated field set, rather than a loose YAML/JSON value map. Unknown
/// YAML keys are ignored; known keys with the wrong shape fail frontmatter
/// parsing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Frontmatter {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub created: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: Option<String>,
    pub modified: Option<String>,
    pub updated: Option<String>,
    #[serde(rename = "updatedAt")]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub draft: bool,
    pub growth: Option<String>,
    pub sort: Option<SectionSort>,
    pub toc: Option<bool>,
    #[serde(rename = "showList")]
    pub show_list: Option<bool>,
    pub image: Option<String>,
    #[serde(rename = "readingTime")]
    pub reading_time: Option<u32>,
}

/// A flat table-of-contents entry produced by the TOC extractor (C6).
#[derive(Debug, Clone, Serialize)]
pub struct TocEntry {
    pub id: String,
    pub text: String,
    pub level: u8,
}

/// One Markdown source file. The central entity of the content graph.
///
/// `backlinks` are stored as indices into the owning `Garden.pages` vector
/// rather than owned/shared references: the page graph's forward and back
/// edges are cyclic, so a single owning container plus index-based
/// non-owning references keeps the cycle out of the type system.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub source_path: String,
    pub slug: String,
    pub permalink: String,
    pub output_path: String,

    pub title: String,
    pub description: Option<String>,
    pub created: chrono::NaiveDateTime,
    pub modified: Option<chrono::NaiveDateTime>,
    pub has_modified: bool,
    pub tags: Vec<String>,
    pub draft: bool,
    pub growth: Option<Growth>,
    pub toc_override: Option<bool>,
    pub show_list: Option<bool>,
    pub section_sort: Option<SectionSort>,
    pub image: Option<String>,
    pub reading_time_override: Option<u32>,

    pub raw_body: String,
    pub html: String,
    pub plain_text: String,

    pub word_count: usize,
    pub image_count: usize,
    pub reading_time: u32,

    pub out_links: Vec<String>,
    pub backlinks: Vec<usize>,
    pub toc: Vec<TocEntry>,

    pub is_index: bool,
}

impl Page {
    /// The section a page belongs to: the parent directory of its slug, or
    /// the empty string for root pages.
    pub fn section(&self) -> &str {
        match self.slug.rfind('/') {
            Some(idx) => &self.slug[..idx],
            None => "",
        }
    }

    /// The last path segment of the slug, used as the `by_name` resolver
    /// key and as the default-title fallback source.
    pub fn slug_leaf(&self) -> &str {
        match self.slug.rfind('/') {
            Some(idx) => &self.slug[idx + 1..],
            None => &self.slug,
        }
    }

    /// The display date used for ordering and header rendering: `modified`
    /// if it differs from `created`, else `created`.
    pub fn display_date(&self) -> chrono::NaiveDateTime {
        if self.has_modified {
            self.modified.unwrap_or(self.created)
        } else {
            self.created
        }
    }

    /// Whether this page should appear in section listings, per its
    /// (tri-state, default true) `show_list` frontmatter field.
    pub fn effective_show_list(&self) -> bool {
        self.show_list.unwrap_or(true)
    }

    /// The page header's date display strings: `created` is always shown;
    /// `modified` is shown alongside it only when `has_modified` is true
    /// (i.e. it's set and differs from `created`), per §3's "a page is
    /// considered to have modified" rule.
    pub fn header_dates(&self) -> HeaderDates {
        HeaderDates {
            created_display: self.created.format("%b %-d, %Y").to_string(),
            created_iso: self.created.format("%Y-%m-%d").to_string(),
            has_modified: self.has_modified,
            modified_display: self
                .modified
                .map(|m| m.format("%b %-d, %Y").to_string())
                .unwrap_or_default(),
            modified_iso: self
                .modified
                .map(|m| m.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        }
    }
}

/// Formatted (display, ISO) date pair for a page's header, derived from
/// `created`/`modified`/`has_modified`.
#[derive(Debug, Clone)]
pub struct HeaderDates {
    pub created_display: String,
    pub created_iso: String,
    pub has_modified: bool,
    pub modified_display: String,
    pub modified_iso: String,
}

/// A non-fatal condition surfaced to the build's caller. Warnings never
/// fail a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    BrokenLink { source: String, target: String },
    AmbiguousLink { source: String, target: String },
    RenderError { source: String, reason: String },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::BrokenLink { target, .. } => write!(f, "broken link: [[{}]]", target),
            Warning::AmbiguousLink { target, .. } => write!(f, "ambiguous link: [[{}]]", target),
            Warning::RenderError { reason, .. } => {
                write!(f, "markdown conversion error: {}", reason)
            }
        }
    }
}

/// The single success value returned from both the full build driver and
/// the incremental rebuild driver.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub pages_written: usize,
    pub warnings: Vec<Warning>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn growth_parses_known_values_case_insensitively() {
        assert_eq!(Growth::parse("Evergreen"), Some(Growth::Evergreen));
        assert_eq!(Growth::parse("seedling"), Some(Growth::Seedling));
        assert_eq!(Growth::parse("bogus"), None);
    }

    #[test]
    fn warning_display_matches_expected_format() {
        let w = Warning::BrokenLink {
            source: "a.md".into(),
            target: "does-not-exist".into(),
        };
        assert_eq!(w.to_string(), "broken link: [[does-not-exist]]");

        let w = Warning::AmbiguousLink {
            source: "a.md".into(),
            target: "foo".into(),
        };
        assert_eq!(w.to_string(), "ambiguous link: [[foo]]");
    }

    fn test_page() -> Page {
        Page {
            source_path: "a.md".into(),
            slug: "a".into(),
            permalink: "/a/".into(),
            output_path: "a/index.html".into(),
            title: "A".into(),
            description: None,
            created: chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(0, 0, 0).unwrap(),
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
            raw_body: String::new(),
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

    #[test]
    fn header_dates_shows_only_created_when_not_modified() {
        let page = test_page();
        let dates = page.header_dates();
        assert_eq!(dates.created_display, "Jan 15, 2024");
        assert!(!dates.has_modified);
        assert_eq!(dates.modified_display, "");
    }

    #[test]
    fn header_dates_shows_both_when_modified_differs() {
        let mut page = test_page();
        page.modified = Some(chrono::NaiveDate::from_ymd_opt(2024, 6, 20).unwrap().and_hms_opt(0, 0, 0).unwrap());
        page.has_modified = true;
        let dates = page.header_dates();
        assert_eq!(dates.created_display, "Jan 15, 2024");
        assert_eq!(dates.modified_display, "Jun 20, 2024");
        assert!(dates.has_modified);
    }
}
