//! Incremental rebuilder (C9).
//!
//! Given a single changed path, mutates the [`BuildCache`] produced by the
//! last full build and re-emits only the affected output files, instead of
//! re-running the full pipeline (C8). Grounded in the same event-dispatch
//! shape the content indexer uses for its own live updates: classify the
//! event, patch the in-memory graph, then rebuild the relations that
//! depend on it — except here "rebuild relations" is backlinks plus the
//! resolver, not a full vault-wide relation pass.

use crate::builder::{self, BuildCache};
use crate::error::{LeafpressError, Result};
use crate::models::{BuildReport, Page, Warning};
use crate::templates::SiteData;
use crate::wikilink::Resolution;
use crate::{backlinks, graph, render, scanner};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;

/// The three change kinds the driver accepts, per the external contract
/// (`leafpress.json` changes, `static/`, `style.css`, or a single `.md`
/// file being created, modified, or deleted).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Create,
    Modify,
    Delete,
}

/// One filesystem change to apply to a [`BuildCache`]. `path` is an
/// absolute path under the cache's content root.
#[derive(Debug, Clone)]
pub struct FileChange {
    pub path: std::path::PathBuf,
    pub kind: ChangeKind,
}

/// Classifies `change` and mutates `cache` in place, re-emitting the
/// minimal output set. Never performs a full content-root rescan except
/// when `leafpress.json` itself changed.
pub fn rebuild(cache: &mut BuildCache, change: FileChange) -> Result<BuildReport> {
    let relative = relative_path(&cache.root, &change.path)?;
    let top_level = crate::utils::top_level_component(&relative);

    if relative == "leafpress.json" {
        return full_rebuild(cache);
    }
    if top_level == "static" {
        builder::copy_static(&cache.root, &cache.output_dir)?;
        return Ok(BuildReport::default());
    }
    if relative == "style.css" {
        builder::write_stylesheet(&cache.root, &cache.output_dir)?;
        return Ok(BuildReport::default());
    }
    if cache.config.ignore_top_level().contains(top_level) {
        return Ok(BuildReport::default());
    }
    if !relative.ends_with(".md") {
        return Ok(BuildReport::default());
    }

    match change.kind {
        ChangeKind::Delete => delete_markdown(cache, &relative),
        ChangeKind::Create | ChangeKind::Modify => upsert_markdown(cache, &relative, &change.path),
    }
}

fn relative_path(root: &Path, absolute: &Path) -> Result<String> {
    let relative = absolute
        .strip_prefix(root)
        .map_err(|_| LeafpressError::scan(format!("'{}' is outside the content root", absolute.display())))?;
    Ok(crate::utils::to_forward_slash(relative))
}

/// `leafpress.json` changed: reload config (if the caller recorded where
/// it came from) and fall back to a full build (C8).
fn full_rebuild(cache: &mut BuildCache) -> Result<BuildReport> {
    let config = match &cache.config_path {
        Some(path) => crate::config::Config::load_and_validate(path)?,
        None => cache.config.clone(),
    };
    let config_path = cache.config_path.clone();
    let (report, mut new_cache) = builder::build(
        &cache.root,
        &cache.output_dir,
        config,
        builder::BuildOptions { include_drafts: cache.include_drafts },
    )?;
    new_cache.config_path = config_path;
    *cache = new_cache;
    Ok(report)
}

/// Re-renders page `idx` (C5) and stores the result, returning any
/// warnings the render produced.
fn render_and_finalize(cache: &mut BuildCache, idx: usize) -> Vec<Warning> {
    let permalinks: Vec<String> = cache.pages.iter().map(|p| p.permalink.clone()).collect();
    let outcome = render::render_one(&cache.pages[idx], &cache.resolver, &cache.config);
    let html = render::finalize_wikilink_hrefs(&outcome.html, &permalinks, &cache.config.base_url);

    let page = &mut cache.pages[idx];
    page.html = html;
    page.toc = outcome.toc;
    page.word_count = outcome.word_count;
    page.image_count = outcome.image_count;
    page.plain_text = outcome.plain_text;
    page.reading_time = outcome.reading_time;
    outcome.warnings
}

/// Re-renders page `idx`'s template (C7) and writes it.
fn write_rendered_page(cache: &BuildCache, idx: usize) -> Result<()> {
    let site = SiteData::from_config(&cache.config);
    let page = &cache.pages[idx];
    if page.is_index {
        builder::write_one_section_index(page, &cache.pages, &cache.output_dir, &cache.config, &site)
    } else {
        builder::write_one_page(page, &cache.pages, &cache.output_dir, &cache.config, &site)
    }
}

fn remove_file_and_empty_dir(path: &Path) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path).map_err(|e| LeafpressError::io(path, e))?;
    }
    if let Some(dir) = path.parent() {
        if dir.read_dir().map(|mut d| d.next().is_none()).unwrap_or(false) {
            let _ = std::fs::remove_dir(dir);
        }
    }
    Ok(())
}

fn remove_dir_recursive(path: &Path) -> Result<()> {
    if path.exists() {
        std::fs::remove_dir_all(path).map_err(|e| LeafpressError::io(path, e))?;
    }
    Ok(())
}

/// Writes, or removes, the auto-index for `section`, depending on whether
/// it still has a manual `_index.md` or any remaining children.
fn sync_section_index(cache: &BuildCache, section: &str) -> Result<()> {
    let has_manual = cache.pages.iter().any(|p| p.is_index && p.slug == section);
    if has_manual {
        return Ok(());
    }
    // A root `index.md` (a regular page with an empty slug) already owns
    // `{out}/index.html`; never synthesize an auto-index over it.
    if section.is_empty() && cache.pages.iter().any(|p| !p.is_index && p.slug.is_empty()) {
        return Ok(());
    }

    let has_children = cache.pages.iter().any(|p| !p.is_index && p.section() == section);
    let output_path = if section.is_empty() {
        cache.output_dir.join("index.html")
    } else {
        cache.output_dir.join(format!("{section}/index.html"))
    };

    if has_children {
        let site = SiteData::from_config(&cache.config);
        builder::write_auto_index(section, &cache.pages, &cache.output_dir, &cache.config, &site)
    } else {
        remove_file_and_empty_dir(&output_path)
    }
}

/// `T_Δ`: symmetric difference of a page's tag set before and after a
/// change, case-folded.
fn affected_tags(old_tags: &[String], new_tags: &[String]) -> HashSet<String> {
    let old_set: HashSet<String> = old_tags.iter().map(|t| t.to_lowercase()).collect();
    let new_set: HashSet<String> = new_tags.iter().map(|t| t.to_lowercase()).collect();
    old_set.symmetric_difference(&new_set).cloned().collect()
}

fn sync_tag_pages(cache: &BuildCache, affected: &HashSet<String>) -> Result<()> {
    if affected.is_empty() {
        return Ok(());
    }
    let groups = builder::group_tags(&cache.pages);
    let site = SiteData::from_config(&cache.config);
    for key in affected {
        match groups.get(key) {
            Some(group) => builder::write_one_tag_page(key, group, &cache.pages, &cache.output_dir, &cache.config, &site)?,
            None => remove_dir_recursive(&cache.output_dir.join("tags").join(key))?,
        }
    }
    builder::write_tag_index(&groups, &cache.output_dir, &cache.config, &site)
}

/// Handles a `create`/`modify` event for a single Markdown file.
fn upsert_markdown(cache: &mut BuildCache, relative: &str, absolute_path: &Path) -> Result<BuildReport> {
    let new_page: Page = scanner::parse_file(&cache.root, absolute_path)?;

    if new_page.draft && !cache.include_drafts {
        return if cache.by_path.contains_key(relative) {
            delete_markdown(cache, relative)
        } else {
            Ok(BuildReport::default())
        };
    }

    let old_idx = cache.by_path.get(relative).copied();

    let new_slug_key = new_page.slug.to_lowercase();
    for (i, page) in cache.pages.iter().enumerate() {
        if Some(i) != old_idx && page.slug.to_lowercase() == new_slug_key {
            return Err(LeafpressError::DuplicateSlug {
                slug: new_slug_key,
                first: page.source_path.clone(),
                second: relative.to_string(),
            });
        }
    }

    let (old_backlink_paths, old_tags, old_section) = match old_idx {
        Some(i) => (
            cache.pages[i].backlinks.iter().map(|&b| cache.pages[b].source_path.clone()).collect::<Vec<_>>(),
            cache.pages[i].tags.clone(),
            Some(cache.pages[i].section().to_string()),
        ),
        None => (Vec::new(), Vec::new(), None),
    };

    let is_create = old_idx.is_none();
    let new_idx = match old_idx {
        Some(i) => {
            cache.pages[i] = new_page;
            i
        }
        None => {
            cache.pages.push(new_page);
            cache.pages.len() - 1
        }
    };

    cache.rebuild_by_path();
    cache.rebuild_resolver();
    backlinks::build(&mut cache.pages, &cache.resolver);

    let mut impacted: BTreeSet<usize> = BTreeSet::new();
    impacted.insert(new_idx);
    for path in &old_backlink_paths {
        if let Some(&i) = cache.by_path.get(path) {
            impacted.insert(i);
        }
    }
    let out_link_targets: Vec<usize> = cache.pages[new_idx]
        .out_links
        .iter()
        .filter_map(|target| cache.resolver.resolve(target).page_index())
        .collect();
    impacted.extend(out_link_targets);

    let mut warnings = Vec::new();
    for idx in &impacted {
        warnings.extend(render_and_finalize(cache, *idx));
    }
    for idx in &impacted {
        write_rendered_page(cache, *idx)?;
    }

    let new_section = cache.pages[new_idx].section().to_string();
    if is_create {
        sync_section_index(cache, &new_section)?;
    } else if old_section.as_deref() != Some(new_section.as_str()) {
        if let Some(section) = &old_section {
            sync_section_index(cache, section)?;
        }
        sync_section_index(cache, &new_section)?;
    }

    let new_tags = cache.pages[new_idx].tags.clone();
    sync_tag_pages(cache, &affected_tags(&old_tags, &new_tags))?;

    graph::emit(&cache.output_dir, &cache.pages, &cache.resolver, &cache.config)?;

    Ok(BuildReport { pages_written: impacted.len(), warnings })
}

/// Handles a `delete` event for a single Markdown file.
fn delete_markdown(cache: &mut BuildCache, relative: &str) -> Result<BuildReport> {
    let Some(&old_idx) = cache.by_path.get(relative) else {
        return Ok(BuildReport::default());
    };

    let backlink_paths: Vec<String> = cache.pages[old_idx]
        .backlinks
        .iter()
        .map(|&i| cache.pages[i].source_path.clone())
        .collect();
    let old_tags = cache.pages[old_idx].tags.clone();
    let old_section = cache.pages[old_idx].section().to_string();
    let old_output_path = cache.pages[old_idx].output_path.clone();

    cache.pages.remove(old_idx);
    remove_file_and_empty_dir(&cache.output_dir.join(&old_output_path))?;

    cache.rebuild_by_path();
    cache.rebuild_resolver();
    backlinks::build(&mut cache.pages, &cache.resolver);

    let mut warnings = Vec::new();
    let mut written = 0;
    for path in &backlink_paths {
        if let Some(&idx) = cache.by_path.get(path) {
            warnings.extend(render_and_finalize(cache, idx));
            write_rendered_page(cache, idx)?;
            written += 1;
        }
    }

    sync_section_index(cache, &old_section)?;
    sync_tag_pages(cache, &affected_tags(&old_tags, &[]))?;

    graph::emit(&cache.output_dir, &cache.pages, &cache.resolver, &cache.config)?;

    Ok(BuildReport { pages_written: written, warnings })
}
