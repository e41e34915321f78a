//! Graph + search index emitter (C11).
//!
//! A single pass over the page set producing the two optional JSON
//! artifacts: a node/edge graph for the client-side force-directed view,
//! and a flat search record list for the client-side search overlay.
//! Both are written with two-space indentation via
//! `serde_json::to_string_pretty`, which already defaults to that width.

use crate::config::Config;
use crate::error::Result;
use crate::models::Page;
use crate::wikilink::{self, LinkResolver, Resolution};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub growth: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchRecord {
    pub title: String,
    pub url: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

fn growth_name(page: &Page) -> Option<&'static str> {
    page.growth.map(|g| match g {
        crate::models::Growth::Seedling => "seedling",
        crate::models::Growth::Budding => "budding",
        crate::models::Growth::Evergreen => "evergreen",
    })
}

fn tags_or_none(page: &Page) -> Option<Vec<String>> {
    if page.tags.is_empty() {
        None
    } else {
        Some(page.tags.clone())
    }
}

/// Builds the graph structure: one node per page, one edge per resolved
/// out-link (broken links produce no edge).
pub fn build_graph(pages: &[Page], resolver: &LinkResolver) -> Graph {
    let nodes = pages
        .iter()
        .map(|p| GraphNode {
            id: p.slug.clone(),
            title: p.title.clone(),
            url: p.permalink.clone(),
            growth: growth_name(p),
            tags: tags_or_none(p),
        })
        .collect();

    let mut edges = Vec::new();
    for page in pages {
        for target in &page.out_links {
            let resolved = match resolver.resolve(target) {
                Resolution::Hit(idx) | Resolution::Ambiguous(idx) => idx,
                Resolution::Broken => continue,
            };
            edges.push(GraphEdge {
                source: page.slug.clone(),
                target: pages[resolved].slug.clone(),
            });
        }
    }

    Graph { nodes, edges }
}

/// Builds the flat search record list: every non-`_index.md` page, plain
/// text capped at 5000 chars by the renderer (C10) already.
pub fn build_search_index(pages: &[Page]) -> Vec<SearchRecord> {
    pages
        .iter()
        .filter(|p| !p.is_index)
        .map(|p| SearchRecord {
            title: p.title.clone(),
            url: p.permalink.clone(),
            content: p.plain_text.clone(),
            tags: tags_or_none(p),
        })
        .collect()
}

/// Emits `graph.json` and/or `search-index.json` under `output_dir`,
/// depending on which are enabled in `config`. A single pass over `pages`
/// produces both so the cost is shared rather than doubled.
pub fn emit(output_dir: &Path, pages: &[Page], resolver: &LinkResolver, config: &Config) -> Result<()> {
    if !config.graph && !config.search {
        return Ok(());
    }

    if config.graph {
        let graph = build_graph(pages, resolver);
        let json = serde_json::to_string_pretty(&graph)?;
        crate::utils::atomic_write(&output_dir.join("graph.json"), json.as_bytes())?;
    }

    if config.search {
        let records = build_search_index(pages);
        let json = serde_json::to_string_pretty(&records)?;
        crate::utils::atomic_write(&output_dir.join("search-index.json"), json.as_bytes())?;
    }

    Ok(())
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
            tags: vec!["rust".to_string()],
            draft: false,
            growth: Some(crate::models::Growth::Evergreen),
            toc_override: None,
            show_list: None,
            section_sort: None,
            image: None,
            reading_time_override: None,
            raw_body: body.to_string(),
            html: String::new(),
            plain_text: "plain text snapshot".to_string(),
            word_count: 0,
            image_count: 0,
            reading_time: 1,
            out_links: wikilink::extract(body).into_iter().map(|l| l.target).collect(),
            backlinks: Vec::new(),
            toc: Vec::new(),
            is_index: false,
        }
    }

    #[test]
    fn graph_has_one_edge_per_resolved_link() {
        let pages = vec![test_page("a", "[[b]]"), test_page("b", "")];
        let resolver = LinkResolver::build(&pages);
        let graph = build_graph(&pages, &resolver);
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].source, "a");
        assert_eq!(graph.edges[0].target, "b");
    }

    #[test]
    fn graph_skips_broken_links() {
        let pages = vec![test_page("a", "[[ghost]]")];
        let resolver = LinkResolver::build(&pages);
        let graph = build_graph(&pages, &resolver);
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn search_index_excludes_section_pages() {
        let mut index = test_page("notes", "");
        index.is_index = true;
        let pages = vec![index, test_page("notes/leaf", "")];
        let records = build_search_index(&pages);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].url, "/notes/leaf/");
    }

    #[test]
    fn search_record_omits_tags_when_empty() {
        let mut page = test_page("a", "");
        page.tags.clear();
        let records = build_search_index(&[page]);
        assert!(records[0].tags.is_none());
    }
}
