//! Wiki-link extractor and resolver (C3).
//!
//! Extracts `[[target]]` / `[[target|label]]` tokens from raw Markdown and
//! resolves them against a snapshot of the page set. The resolver is
//! rebuilt from scratch whenever the page set changes (a full build, or an
//! incremental rebuild's "rebuild the resolver" step) — it holds no state
//! of its own beyond two lookup maps over borrowed page data.

use crate::models::Page;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Matches `[[TARGET]]` or `[[TARGET|LABEL]]`. The target is one or more
/// characters that are neither `]` nor `|`; the label, when present, is one
/// or more non-`]` characters following a `|`.
pub static WIKILINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\]\|]+)(?:\|([^\]]+))?\]\]").unwrap());

/// One extracted wiki-link occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiLink {
    /// The full matched text, e.g. `[[Target|Label]]`, used to locate the
    /// occurrence being replaced during rendering.
    pub raw: String,
    pub target: String,
    pub label: String,
}

/// Extracts every wiki-link token from `text`, trimming whitespace from the
/// target and label. When no label is given, the label equals the target.
pub fn extract(text: &str) -> Vec<WikiLink> {
    WIKILINK_RE
        .captures_iter(text)
        .map(|cap| {
            let raw = cap.get(0).unwrap().as_str().to_string();
            let target = cap.get(1).unwrap().as_str().trim().to_string();
            let label = cap
                .get(2)
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_else(|| target.clone());
            WikiLink { raw, target, label }
        })
        .collect()
}

/// The outcome of resolving a wiki-link target against a [`LinkResolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Hit(usize),
    Ambiguous(usize),
    Broken,
}

impl Resolution {
    /// The resolved page index, if the target resolved to anything (`Hit`
    /// or `Ambiguous` both carry a usable page).
    pub fn page_index(self) -> Option<usize> {
        match self {
            Resolution::Hit(i) | Resolution::Ambiguous(i) => Some(i),
            Resolution::Broken => None,
        }
    }
}

/// An immutable snapshot of the page set's slug and filename indexes, used
/// to resolve wiki-link targets. Holds `usize` indices into the page slice
/// it was built from rather than owning or borrowing `Page`s directly, so
/// it has no lifetime tied to the page container.
#[derive(Debug, Default)]
pub struct LinkResolver {
    by_slug: HashMap<String, usize>,
    by_name: HashMap<String, Vec<usize>>,
}

impl LinkResolver {
    /// Builds a resolver from `pages`. `by_name` buckets are sorted by slug
    /// so that an ambiguous lookup's tie-break (the alphabetically-first
    /// slug) is stable across hosts and filesystems, per the open question
    /// this crate resolves in favor of host-independence.
    pub fn build(pages: &[Page]) -> Self {
        let mut by_slug = HashMap::new();
        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();

        for (idx, page) in pages.iter().enumerate() {
            by_slug.insert(page.slug.to_lowercase(), idx);
            by_name
                .entry(page.slug_leaf().to_lowercase())
                .or_default()
                .push(idx);
        }

        for bucket in by_name.values_mut() {
            bucket.sort_by(|&a, &b| pages[a].slug.cmp(&pages[b].slug));
        }

        Self { by_slug, by_name }
    }

    /// Resolves a raw wiki-link target: exact slug match first, then an
    /// unqualified filename lookup (ambiguous if more than one page shares
    /// that filename leaf), otherwise broken.
    pub fn resolve(&self, target: &str) -> Resolution {
        let lower = target.to_lowercase();

        if let Some(&idx) = self.by_slug.get(&lower) {
            return Resolution::Hit(idx);
        }

        if let Some(bucket) = self.by_name.get(&lower) {
            return match bucket.first() {
                Some(&idx) if bucket.len() == 1 => Resolution::Hit(idx),
                Some(&idx) => Resolution::Ambiguous(idx),
                None => Resolution::Broken,
            };
        }

        Resolution::Broken
    }
}
