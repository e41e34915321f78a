//! Backlink builder (C4).
//!
//! Two passes over the page set: the first (re-)extracts each page's raw
//! out-link targets from its unrewritten body; the second resolves every
//! target and appends the source page to each resolved target's backlink
//! list, deduplicating by page identity rather than link-label text. The
//! two passes are not fused — the second must observe the complete
//! out-link set the first pass produced.

use crate::models::Page;
use crate::wikilink::{LinkResolver, Resolution};
use std::collections::HashSet;

/// Populates `out_links` and `backlinks` on every page in `pages`, using
/// `resolver` (already built from the same page set) to resolve targets.
/// Runs in O(e) time, where e is the total out-link count, and O(backlink
/// edges) extra memory — a per-target `HashSet` is used only to dedupe a
/// single page's incoming backlinks, never a full |P|×|P| matrix.
pub fn build(pages: &mut [Page], resolver: &LinkResolver) {
    for page in pages.iter_mut() {
        page.out_links.clear();
        page.backlinks.clear();
        page.out_links = crate::wikilink::extract(&page.raw_body)
            .into_iter()
            .map(|link| link.target)
            .collect();
    }

    let mut seen: Vec<HashSet<usize>> = vec![HashSet::new(); pages.len()];

    for source_idx in 0..pages.len() {
        let targets = pages[source_idx].out_links.clone();
        for target in &targets {
            let Some(target_idx) = resolve_to_index(resolver, target) else {
                continue;
            };
            if target_idx == source_idx {
                continue;
            }
            if seen[target_idx].insert(source_idx) {
                pages[target_idx].backlinks.push(source_idx);
            }
        }
    }
}

fn resolve_to_index(resolver: &LinkResolver, target: &str) -> Option<usize> {
    match resolver.resolve(target) {
        Resolution::Hit(idx) | Resolution::Ambiguous(idx) => Some(idx),
        Resolution::Broken => None,
    }
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

    #[test]
    fn backlinks_populated_from_forward_links() {
        let mut pages = vec![test_page("a", "Link to [[b]]."), test_page("b", "hi")];
        let resolver = LinkResolver::build(&pages);
        build(&mut pages, &resolver);
        assert_eq!(pages[1].backlinks, vec![0]);
        assert_eq!(pages[0].out_links, vec!["b".to_string()]);
    }

    #[test]
    fn page_never_backlinks_itself() {
        let mut pages = vec![test_page("a", "See [[a]].")];
        let resolver = LinkResolver::build(&pages);
        build(&mut pages, &resolver);
        assert!(pages[0].backlinks.is_empty());
    }

    #[test]
    fn duplicate_links_to_same_target_dedupe() {
        let mut pages = vec![
            test_page("a", "[[b]] and [[b]] again, also [[b|labeled]]."),
            test_page("b", "hi"),
        ];
        let resolver = LinkResolver::build(&pages);
        build(&mut pages, &resolver);
        assert_eq!(pages[1].backlinks, vec![0]);
    }

    #[test]
    fn broken_links_produce_no_backlink() {
        let mut pages = vec![test_page("a", "See [[ghost]].")];
        let resolver = LinkResolver::build(&pages);
        build(&mut pages, &resolver);
        assert!(pages.iter().all(|p| p.backlinks.is_empty()));
    }

    #[test]
    fn ambiguous_resolution_still_creates_a_backlink() {
        let mut pages = vec![
            test_page("x/foo", "body"),
            test_page("y/foo", "body"),
            test_page("ref", "[[foo]]"),
        ];
        let resolver = LinkResolver::build(&pages);
        build(&mut pages, &resolver);
        // Ambiguous resolves to the alphabetically-first slug, x/foo.
        assert_eq!(pages[0].backlinks, vec![2]);
        assert!(pages[1].backlinks.is_empty());
    }
}
