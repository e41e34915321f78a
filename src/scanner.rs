//! Content-root scanner (C2).
//!
//! Phase 1 walks the content root sequentially, collecting candidate
//! Markdown entries while pruning reserved and ignored paths. Phase 2
//! parses those entries into [`Page`]s concurrently across a rayon worker
//! pool; the first parse error cancels the remaining work.

use crate::error::{LeafpressError, Result};
use crate::frontmatter;
use crate::models::{Growth, Page, SectionSort};
use crate::utils::{title_case, to_forward_slash};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};
use walkdir::WalkDir;

/// Top-level content-root entries the scanner always prunes, regardless of
/// the caller-supplied `ignore` list.
const RESERVED_TOP_LEVEL: &[&str] = &[
    "leafpress.json",
    "style.css",
    "static",
    "_site",
    ".leafpress",
    ".git",
    ".gitignore",
    ".obsidian",
    "node_modules",
    "docs",
];

struct Entry {
    path: PathBuf,
    relative_path: String,
}

/// Walks `root` depth-first, collecting `.md` file entries whose top-level
/// path component is neither in the reserved set nor in `ignore_top_level`,
/// then parses them concurrently into [`Page`]s.
#[instrument(skip(ignore_top_level), fields(root = %root.display()))]
pub fn scan(root: &Path, ignore_top_level: &HashSet<String>) -> Result<Vec<Page>> {
    if !root.is_dir() {
        return Err(LeafpressError::NotADirectory(root.to_path_buf()));
    }

    let entries = collect_entries(root, ignore_top_level)?;
    debug!(count = entries.len(), "collected candidate entries");

    let n_workers = std::cmp::min(num_cpus(), entries.len().max(1));
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(n_workers)
        .build()
        .map_err(|e| LeafpressError::scan(e.to_string()))?;

    pool.install(|| {
        entries
            .par_iter()
            .map(parse_entry)
            .collect::<Result<Vec<Page>>>()
    })
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn collect_entries(root: &Path, ignore_top_level: &HashSet<String>) -> Result<Vec<Entry>> {
    let mut entries = Vec::new();

    let walker = WalkDir::new(root).into_iter().filter_entry(|e| {
        let name = e.file_name().to_string_lossy();
        if e.depth() == 0 {
            return true;
        }
        if name.starts_with('.') {
            return false;
        }
        if e.depth() == 1 {
            let name = name.as_ref();
            if RESERVED_TOP_LEVEL.contains(&name) || ignore_top_level.contains(name) {
                return false;
            }
        }
        true
    });

    for entry in walker {
        let entry = entry.map_err(|e| LeafpressError::scan(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let is_md = path.extension().map(|ext| ext.eq_ignore_ascii_case("md")).unwrap_or(false);
        if !is_md {
            continue;
        }

        let relative = path
            .strip_prefix(root)
            .map_err(|_| LeafpressError::scan(format!("'{}' is outside the content root", path.display())))?;
        entries.push(Entry {
            path: path.to_path_buf(),
            relative_path: to_forward_slash(relative),
        });
    }

    Ok(entries)
}

/// Parses a single file into a [`Page`], for the incremental rebuild
/// driver (C9) — this never triggers a full rescan of `root`.
pub fn parse_file(root: &Path, absolute_path: &Path) -> Result<Page> {
    let relative = absolute_path
        .strip_prefix(root)
        .map_err(|_| LeafpressError::scan(format!("'{}' is outside the content root", absolute_path.display())))?;
    let entry = Entry {
        path: absolute_path.to_path_buf(),
        relative_path: to_forward_slash(relative),
    };
    parse_entry(&entry)
}

fn parse_entry(entry: &Entry) -> Result<Page> {
    let content = std::fs::read_to_string(&entry.path).map_err(|e| LeafpressError::io(&entry.path, e))?;

    let (fm_str, body) = frontmatter::split(&content, &entry.relative_path)?;
    let fm = frontmatter::parse(fm_str, &entry.relative_path)?;

    let mtime = frontmatter::file_mtime(&entry.path)?;
    let (created, modified, has_modified) = frontmatter::resolve_dates(&fm, mtime);

    let is_index = Path::new(&entry.relative_path)
        .file_name()
        .map(|n| n == "_index.md")
        .unwrap_or(false);

    let slug = slug_for(&entry.relative_path, is_index);
    let (permalink, output_path) = permalink_and_output(&slug);

    let slug_leaf_owned;
    let default_title = {
        let leaf = match slug.rfind('/') {
            Some(idx) => &slug[idx + 1..],
            None => slug.as_str(),
        };
        slug_leaf_owned = if leaf.is_empty() { "home".to_string() } else { leaf.to_string() };
        title_case(&slug_leaf_owned)
    };

    let growth = fm.growth.as_deref().and_then(Growth::parse);

    let page = Page {
        source_path: entry.relative_path.clone(),
        slug,
        permalink,
        output_path,
        title: fm.title.clone().unwrap_or(default_title),
        description: fm.description.clone(),
        created,
        modified,
        has_modified,
        tags: fm.tags.clone(),
        draft: fm.draft,
        growth,
        toc_override: fm.toc,
        show_list: fm.show_list,
        section_sort: if is_index { Some(fm.sort.unwrap_or(SectionSort::Date)) } else { None },
        image: fm.image.clone(),
        reading_time_override: fm.reading_time,
        raw_body: body.to_string(),
        html: String::new(),
        plain_text: String::new(),
        word_count: 0,
        image_count: 0,
        reading_time: 0,
        out_links: Vec::new(),
        backlinks: Vec::new(),
        toc: Vec::new(),
        is_index,
    };

    Ok(page)
}

/// Derives a page's slug from its root-relative source path: strip `.md`;
/// `_index.md` folds to its parent directory; `index.md` at root becomes
/// the empty slug.
fn slug_for(relative_path: &str, is_index: bool) -> String {
    let without_ext = relative_path.strip_suffix(".md").unwrap_or(relative_path);

    if is_index {
        return match without_ext.rfind('/') {
            Some(idx) => without_ext[..idx].to_string(),
            None => String::new(),
        };
    }

    if without_ext == "index" {
        return String::new();
    }

    without_ext.to_string()
}

fn permalink_and_output(slug: &str) -> (String, String) {
    if slug.is_empty() {
        ("/".to_string(), "index.html".to_string())
    } else {
        (format!("/{slug}/"), format!("{slug}/index.html"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn setup_test_garden() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("a.md"), "Link to [[b]].").unwrap();
        fs::write(root.join("b.md"), "hi").unwrap();
        fs::create_dir_all(root.join("notes")).unwrap();
        fs::write(root.join("notes/_index.md"), "---\ntitle: Notes\n---\nSection intro").unwrap();
        fs::write(root.join("notes/leaf.md"), "a leaf page").unwrap();
        fs::create_dir_all(root.join(".obsidian")).unwrap();
        fs::write(root.join(".obsidian/workspace.json"), "{}").unwrap();
        fs::create_dir_all(root.join("static")).unwrap();
        fs::write(root.join("static/x.png"), "not really a png").unwrap();
        dir
    }

    #[test]
    fn scan_finds_markdown_and_skips_reserved_dirs() {
        let dir = setup_test_garden();
        let pages = scan(dir.path(), &HashSet::new()).unwrap();
        let slugs: HashSet<_> = pages.iter().map(|p| p.slug.as_str()).collect();
        assert!(slugs.contains("a"));
        assert!(slugs.contains("b"));
        assert!(slugs.contains("notes"));
        assert!(slugs.contains("notes/leaf"));
        assert_eq!(pages.len(), 4);
    }

    #[test]
    fn scan_honors_caller_ignore_set() {
        let dir = setup_test_garden();
        let ignore: HashSet<String> = ["notes".to_string()].into();
        let pages = scan(dir.path(), &ignore).unwrap();
        assert!(pages.iter().all(|p| !p.slug.starts_with("notes")));
    }

    #[test]
    fn index_md_at_root_becomes_empty_slug() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("index.md"), "Welcome").unwrap();
        let pages = scan(dir.path(), &HashSet::new()).unwrap();
        assert_eq!(pages[0].slug, "");
        assert_eq!(pages[0].permalink, "/");
        assert_eq!(pages[0].output_path, "index.html");
    }

    #[test]
    fn underscore_index_folds_to_parent_directory() {
        let dir = setup_test_garden();
        let pages = scan(dir.path(), &HashSet::new()).unwrap();
        let notes = pages.iter().find(|p| p.slug == "notes").unwrap();
        assert!(notes.is_index);
        assert_eq!(notes.permalink, "/notes/");
    }

    #[test]
    fn scan_fails_fast_on_bad_frontmatter() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("bad.md"), "---\ngrowth: mythical\n---\nbody").unwrap();
        let err = scan(dir.path(), &HashSet::new()).unwrap_err();
        assert!(matches!(err, LeafpressError::Frontmatter { .. }));
    }

    #[test]
    fn scan_rejects_non_directory_root() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("not_a_dir.md");
        fs::write(&file, "hi").unwrap();
        let err = scan(&file, &HashSet::new()).unwrap_err();
        assert!(matches!(err, LeafpressError::NotADirectory(_)));
    }

    #[test]
    fn default_title_is_title_cased_slug_leaf() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("my-first-post.md"), "no frontmatter").unwrap();
        let pages = scan(dir.path(), &HashSet::new()).unwrap();
        assert_eq!(pages[0].title, "My First Post");
    }
}
