//! Full build pipeline (C8).
//!
//! Orchestrates the scanner (C2), resolver/backlink builder (C3/C4),
//! renderer (C5), and template renderer (C7) into a from-scratch build:
//! clean the output directory, scan the garden, render every page,
//! synthesize section/tag indexes, copy static assets, and emit the
//! optional JSON artifacts. Returns a [`BuildCache`] alongside the
//! [`BuildReport`] so a caller running a dev loop can hand it straight to
//! [`crate::incremental::rebuild`] without re-scanning.

use crate::config::Config;
use crate::error::{LeafpressError, Result};
use crate::models::{BuildReport, Page, SectionSort, Warning};
use crate::templates::{self, IndexTemplate, NavLink, PageSummary, PageTemplate, SiteData, TagIndexTemplate, TagPageTemplate, TagSummary};
use crate::wikilink::LinkResolver;
use crate::{assets, backlinks, graph, render, scanner};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Flags the build driver accepts, mirroring the CLI contract named in the
/// external-interfaces section (`include_drafts`, `verbose`).
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    pub include_drafts: bool,
}

/// The cached state a full build produces and an incremental rebuild (C9)
/// mutates in place. `by_path` indexes `pages` by `source_path` so the
/// incremental driver can find the page a changed file corresponds to
/// without a linear scan.
pub struct BuildCache {
    pub root: PathBuf,
    pub output_dir: PathBuf,
    pub config: Config,
    /// Where `config` was loaded from, if the caller loaded it from disk.
    /// The incremental driver reloads from here when `leafpress.json`
    /// itself changes; `None` means the caller built with an in-memory
    /// config and a config-file change can't be observed.
    pub config_path: Option<PathBuf>,
    pub include_drafts: bool,
    pub pages: Vec<Page>,
    pub resolver: LinkResolver,
    pub by_path: HashMap<String, usize>,
}

impl BuildCache {
    pub fn rebuild_by_path(&mut self) {
        self.by_path = self
            .pages
            .iter()
            .enumerate()
            .map(|(idx, p)| (p.source_path.clone(), idx))
            .collect();
    }

    pub fn rebuild_resolver(&mut self) {
        self.resolver = LinkResolver::build(&self.pages);
    }
}

/// Runs a full build: clean `output_dir`, scan `root`, render every page,
/// and write the full output tree. Returns the build report and the
/// resulting cache for reuse by the incremental driver.
#[instrument(skip(config), fields(root = %root.display(), output = %output_dir.display()))]
pub fn build(root: &Path, output_dir: &Path, config: Config, opts: BuildOptions) -> Result<(BuildReport, BuildCache)> {
    // Templates are `askama`-derived and compiled into the binary; the
    // spec's "parsed once, cached process-wide" requirement is satisfied
    // at compile time, so there is no runtime init step here.

    clean_output_dir(output_dir)?;

    let mut pages = scanner::scan(root, &config.ignore_top_level())?;
    if !opts.include_drafts {
        pages.retain(|p| !p.draft);
    }
    check_duplicate_slugs(&pages)?;

    let resolver = LinkResolver::build(&pages);
    backlinks::build(&mut pages, &resolver);

    let warnings = render::render_all(&mut pages, &resolver, &config);
    info!(pages = pages.len(), warnings = warnings.len(), "rendered garden");

    let mut pages_written = write_pages(&pages, output_dir, &config)?;
    pages_written += write_auto_indexes(&pages, output_dir, &config)?;
    pages_written += write_tag_pages(&pages, output_dir, &config)?;

    copy_static(root, output_dir)?;
    write_stylesheet(root, output_dir)?;
    write_favicons(root, output_dir)?;
    graph::emit(output_dir, &pages, &resolver, &config)?;

    let mut cache = BuildCache {
        root: root.to_path_buf(),
        output_dir: output_dir.to_path_buf(),
        config,
        config_path: None,
        include_drafts: opts.include_drafts,
        pages,
        resolver,
        by_path: HashMap::new(),
    };
    cache.rebuild_by_path();

    Ok((BuildReport { pages_written, warnings }, cache))
}

fn clean_output_dir(output_dir: &Path) -> Result<()> {
    if output_dir.exists() {
        std::fs::remove_dir_all(output_dir).map_err(|e| LeafpressError::io(output_dir, e))?;
    }
    std::fs::create_dir_all(output_dir).map_err(|e| LeafpressError::io(output_dir, e))?;
    Ok(())
}

/// Invariant I1: slugs are unique across the non-draft page set after
/// case-folding.
pub(crate) fn check_duplicate_slugs(pages: &[Page]) -> Result<()> {
    let mut seen: HashMap<String, String> = HashMap::new();
    for page in pages {
        let key = page.slug.to_lowercase();
        if let Some(first) = seen.get(&key) {
            return Err(LeafpressError::DuplicateSlug {
                slug: key,
                first: first.clone(),
                second: page.source_path.clone(),
            });
        }
        seen.insert(key, page.source_path.clone());
    }
    Ok(())
}

pub(crate) fn growth_rank(growth: Option<crate::models::Growth>) -> u8 {
    match growth {
        None => 0,
        Some(crate::models::Growth::Seedling) => 1,
        Some(crate::models::Growth::Budding) => 2,
        Some(crate::models::Growth::Evergreen) => 3,
    }
}

/// Sorts `indices` (into `pages`) per `sort`. Date and growth sort
/// descending (newest/most-mature first); title sorts ascending.
pub(crate) fn sort_indices(indices: &mut [usize], pages: &[Page], sort: SectionSort) {
    match sort {
        SectionSort::Date => indices.sort_by(|&a, &b| pages[b].display_date().cmp(&pages[a].display_date())),
        SectionSort::Title => indices.sort_by(|&a, &b| pages[a].title.cmp(&pages[b].title)),
        SectionSort::Growth => indices.sort_by(|&a, &b| growth_rank(pages[b].growth).cmp(&growth_rank(pages[a].growth))),
    }
}

pub(crate) fn section_leaf_title(section: &str) -> String {
    let leaf = match section.rfind('/') {
        Some(idx) => &section[idx + 1..],
        None => section,
    };
    let leaf = if leaf.is_empty() { "home" } else { leaf };
    crate::utils::title_case(leaf)
}

pub(crate) fn render_page_template(page: &Page, all_pages: &[Page], config: &Config, site: &SiteData) -> Result<String> {
    let nav: Vec<NavLink> = templates::nav_links(config, &page.permalink);
    let backlinks: Vec<PageSummary> = page
        .backlinks
        .iter()
        .map(|&idx| PageSummary::from_page(&all_pages[idx], &config.base_url))
        .collect();
    let dates = page.header_dates();

    let template = PageTemplate {
        site,
        nav,
        current_path: page.permalink.clone(),
        title: page.title.clone(),
        description: page.description.clone().unwrap_or_default(),
        content: page.html.clone(),
        toc: &page.toc,
        show_toc: !page.toc.is_empty(),
        backlinks,
        show_backlinks: config.backlinks,
        tags: page.tags.clone(),
        growth_emoji: page.growth.map(|g| g.emoji()),
        created_display: dates.created_display,
        created_iso: dates.created_iso,
        has_modified: dates.has_modified,
        modified_display: dates.modified_display,
        modified_iso: dates.modified_iso,
        reading_time: page.reading_time,
    };
    templates::render(&template)
}

pub(crate) fn render_index_template(
    title: String,
    current_path: String,
    intro_html: Option<String>,
    child_pages: Vec<PageSummary>,
    config: &Config,
    site: &SiteData,
) -> Result<String> {
    let nav = templates::nav_links(config, &current_path);
    let template = IndexTemplate {
        site,
        nav,
        current_path,
        title,
        intro_html,
        pages: child_pages,
    };
    templates::render(&template)
}

/// Renders and writes a single regular (non-`_index.md`) page.
pub(crate) fn write_one_page(page: &Page, pages: &[Page], output_dir: &Path, config: &Config, site: &SiteData) -> Result<()> {
    let html = render_page_template(page, pages, config, site)?;
    crate::utils::atomic_write(&output_dir.join(&page.output_path), html.as_bytes())
}

/// Renders and writes a single `_index.md` page, whose child list is
/// drawn from pages sharing its section.
pub(crate) fn write_one_section_index(index_page: &Page, pages: &[Page], output_dir: &Path, config: &Config, site: &SiteData) -> Result<()> {
    let mut child_indices: Vec<usize> = pages
        .iter()
        .enumerate()
        .filter(|(_, p)| !p.is_index && p.section() == index_page.slug && p.effective_show_list())
        .map(|(idx, _)| idx)
        .collect();
    sort_indices(&mut child_indices, pages, index_page.section_sort.unwrap_or_default());
    let child_pages: Vec<PageSummary> = child_indices
        .into_iter()
        .map(|idx| PageSummary::from_page(&pages[idx], &config.base_url))
        .collect();

    let html = render_index_template(
        index_page.title.clone(),
        index_page.permalink.clone(),
        Some(index_page.html.clone()),
        child_pages,
        config,
        site,
    )?;
    crate::utils::atomic_write(&output_dir.join(&index_page.output_path), html.as_bytes())
}

/// Writes the page template for every regular (non-`_index.md`) page and
/// the index template for every explicit `_index.md`. Runs across a rayon
/// worker pool sized min(CPUs, |pages|); the first write/render error
/// cancels remaining work.
fn write_pages(pages: &[Page], output_dir: &Path, config: &Config) -> Result<usize> {
    let site = SiteData::from_config(config);

    pages
        .par_iter()
        .filter(|p| !p.is_index)
        .try_for_each(|page| write_one_page(page, pages, output_dir, config, &site))?;
    let regular_count = pages.iter().filter(|p| !p.is_index).count();

    for index_page in pages.iter().filter(|p| p.is_index) {
        write_one_section_index(index_page, pages, output_dir, config, &site)?;
    }

    Ok(regular_count + pages.iter().filter(|p| p.is_index).count())
}

/// Sections (directory slugs) containing non-index pages but lacking an
/// explicit `_index.md`.
pub(crate) fn sections_needing_index(pages: &[Page]) -> std::collections::BTreeSet<String> {
    let explicit_sections: std::collections::HashSet<&str> =
        pages.iter().filter(|p| p.is_index).map(|p| p.slug.as_str()).collect();

    // A root `index.md` (a regular page with an empty slug) already owns
    // `{out}/index.html` the same way an explicit `_index.md` would; treat
    // it the same as an explicit section index so the auto-index writer
    // doesn't clobber it.
    let root_page_exists = pages.iter().any(|p| !p.is_index && p.slug.is_empty());

    let mut sections = std::collections::BTreeSet::new();
    for page in pages.iter().filter(|p| !p.is_index) {
        let section = page.section().to_string();
        if section.is_empty() && root_page_exists {
            continue;
        }
        if !explicit_sections.contains(section.as_str()) {
            sections.insert(section);
        }
    }
    sections
}

/// Synthesizes and writes the auto-index page for one section.
pub(crate) fn write_auto_index(section: &str, pages: &[Page], output_dir: &Path, config: &Config, site: &SiteData) -> Result<()> {
    let mut child_indices: Vec<usize> = pages
        .iter()
        .enumerate()
        .filter(|(_, p)| !p.is_index && p.section() == section && p.effective_show_list())
        .map(|(idx, _)| idx)
        .collect();
    sort_indices(&mut child_indices, pages, SectionSort::Date);
    let child_pages: Vec<PageSummary> = child_indices
        .into_iter()
        .map(|idx| PageSummary::from_page(&pages[idx], &config.base_url))
        .collect();

    let permalink = if section.is_empty() { "/".to_string() } else { format!("/{section}/") };
    let output_path = if section.is_empty() { "index.html".to_string() } else { format!("{section}/index.html") };

    let html = render_index_template(section_leaf_title(section), permalink, None, child_pages, config, site)?;
    crate::utils::atomic_write(&output_dir.join(output_path), html.as_bytes())
}

/// For every section containing non-index pages but lacking an explicit
/// `_index.md`, synthesizes and writes an `IndexTemplate` page.
fn write_auto_indexes(pages: &[Page], output_dir: &Path, config: &Config) -> Result<usize> {
    let site = SiteData::from_config(config);
    let sections = sections_needing_index(pages);
    for section in &sections {
        write_auto_index(section, pages, output_dir, config, &site)?;
    }
    Ok(sections.len())
}

pub(crate) struct TagGroup {
    pub display: String,
    pub indices: Vec<usize>,
}

/// Groups pages by case-folded tag, preserving the first-observed display
/// casing (scenario 6: `Go` and `go` merge under `/tags/go/`, displayed
/// as `Go`).
pub(crate) fn group_tags(pages: &[Page]) -> BTreeMap<String, TagGroup> {
    let mut groups: BTreeMap<String, TagGroup> = BTreeMap::new();
    for (idx, page) in pages.iter().enumerate() {
        if page.is_index {
            continue;
        }
        for tag in &page.tags {
            let key = tag.to_lowercase();
            groups
                .entry(key)
                .or_insert_with(|| TagGroup {
                    display: tag.clone(),
                    indices: Vec::new(),
                })
                .indices
                .push(idx);
        }
    }
    groups
}

/// Writes a single `tags/{key}/index.html` page.
pub(crate) fn write_one_tag_page(key: &str, group: &TagGroup, pages: &[Page], output_dir: &Path, config: &Config, site: &SiteData) -> Result<()> {
    let mut indices = group.indices.clone();
    sort_indices(&mut indices, pages, SectionSort::Date);
    let child_pages: Vec<PageSummary> = indices
        .into_iter()
        .map(|idx| PageSummary::from_page(&pages[idx], &config.base_url))
        .collect();

    let nav = templates::nav_links(config, &format!("/tags/{key}/"));
    let template = TagPageTemplate {
        site,
        nav,
        current_path: format!("/tags/{key}/"),
        tag: group.display.clone(),
        pages: child_pages,
    };
    let html = templates::render(&template)?;
    crate::utils::atomic_write(&output_dir.join(format!("tags/{key}/index.html")), html.as_bytes())
}

/// Writes (or, if `groups` is empty, removes) `tags/index.html`.
pub(crate) fn write_tag_index(groups: &BTreeMap<String, TagGroup>, output_dir: &Path, config: &Config, site: &SiteData) -> Result<()> {
    if groups.is_empty() {
        let path = output_dir.join("tags/index.html");
        if path.exists() {
            std::fs::remove_file(&path).map_err(|e| LeafpressError::io(&path, e))?;
        }
        return Ok(());
    }

    let tag_summaries: Vec<TagSummary> = groups
        .iter()
        .map(|(key, group)| TagSummary {
            name: group.display.clone(),
            count: group.indices.len(),
            href: format!("{}tags/{key}/", config.base_url),
        })
        .collect();
    let nav = templates::nav_links(config, "/tags/");
    let template = TagIndexTemplate {
        site,
        nav,
        current_path: "/tags/".to_string(),
        tags: tag_summaries,
    };
    let html = templates::render(&template)?;
    crate::utils::atomic_write(&output_dir.join("tags/index.html"), html.as_bytes())
}

/// Emits `tags/index.html` and one `tags/{tag}/index.html` per tag, if any
/// tags exist in the page set.
fn write_tag_pages(pages: &[Page], output_dir: &Path, config: &Config) -> Result<usize> {
    let groups = group_tags(pages);
    if groups.is_empty() {
        return Ok(0);
    }

    let site = SiteData::from_config(config);
    let mut written = 0;

    for (key, group) in &groups {
        write_one_tag_page(key, group, pages, output_dir, config, &site)?;
        written += 1;
    }
    write_tag_index(&groups, output_dir, config, &site)?;
    written += 1;

    Ok(written)
}

/// Copies `root/static/` into `{output}/static/`, preserving directory
/// structure and skipping dotfiles.
pub(crate) fn copy_static(root: &Path, output_dir: &Path) -> Result<()> {
    let static_root = root.join("static");
    if !static_root.is_dir() {
        return Ok(());
    }

    for entry in walkdir::WalkDir::new(&static_root).into_iter().filter_entry(|e| {
        !e.file_name().to_string_lossy().starts_with('.')
    }) {
        let entry = entry.map_err(|e| LeafpressError::scan(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(&static_root)
            .map_err(|_| LeafpressError::scan("static entry outside static root".to_string()))?;
        let dest = output_dir.join("static").join(relative);
        let bytes = std::fs::read(entry.path()).map_err(|e| LeafpressError::io(entry.path(), e))?;
        crate::utils::atomic_write(&dest, &bytes)?;
    }
    Ok(())
}

/// Writes `{output}/style.css`: the embedded default stylesheet, followed
/// by the garden's own `style.css` (if present) after a `/* User Styles */`
/// separator.
pub(crate) fn write_stylesheet(root: &Path, output_dir: &Path) -> Result<()> {
    let mut css = assets::DEFAULT_CSS.to_string();
    let user_css_path = root.join("style.css");
    if user_css_path.is_file() {
        let user_css = std::fs::read_to_string(&user_css_path).map_err(|e| LeafpressError::io(&user_css_path, e))?;
        css.push_str("\n\n/* User Styles */\n");
        css.push_str(&user_css);
    }
    crate::utils::atomic_write(&output_dir.join("style.css"), css.as_bytes())
}

/// Copies `favicon.ico`/`favicon.svg`/`favicon-96x96.png` from the source
/// root if present, else emits the embedded defaults.
fn write_favicons(root: &Path, output_dir: &Path) -> Result<()> {
    write_favicon(root, output_dir, "favicon.ico", assets::DEFAULT_FAVICON_ICO)?;
    write_favicon(root, output_dir, "favicon.svg", assets::DEFAULT_FAVICON_SVG.as_bytes())?;
    write_favicon(root, output_dir, "favicon-96x96.png", assets::DEFAULT_FAVICON_96)?;
    Ok(())
}

fn write_favicon(root: &Path, output_dir: &Path, name: &str, default_bytes: &[u8]) -> Result<()> {
    let source = root.join(name);
    let bytes = if source.is_file() {
        std::fs::read(&source).map_err(|e| LeafpressError::io(&source, e))?
    } else {
        default_bytes.to_vec()
    };
    crate::utils::atomic_write(&output_dir.join(name), &bytes)
}
