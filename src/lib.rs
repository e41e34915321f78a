//! leafpress: a static-site generator for digital gardens of wiki-linked
//! Markdown notes.
//!
//! The library crate is the content graph pipeline — scanning, frontmatter,
//! wiki-link resolution, backlinks, rendering, templates, and the
//! incremental rebuild path. The `leafpress` binary (`main.rs`) is a thin
//! composition root: CLI parsing, logging setup, the dev-loop file watcher
//! and HTTP server all live there and call into this crate.

pub mod assets;
pub mod backlinks;
pub mod builder;
pub mod callouts;
pub mod config;
pub mod error;
pub mod frontmatter;
pub mod graph;
pub mod highlight;
pub mod incremental;
pub mod models;
pub mod render;
pub mod sanitizer;
pub mod scanner;
pub mod templates;
pub mod toc;
pub mod utils;
pub mod wikilink;

pub use builder::{build, BuildCache, BuildOptions};
pub use config::Config;
pub use error::{LeafpressError, Result};
pub use incremental::{rebuild, ChangeKind, FileChange};
pub use models::{BuildReport, Frontmatter, Growth, Page, SectionSort, TocEntry, Warning};

use std::collections::HashSet;
use std::path::Path;

/// Namespace for the scanner's public entry point, matching the shape of
/// the crate's other driver-style APIs (`build`, `rebuild`).
pub struct Garden;

impl Garden {
    /// Scans `root` into a page set, pruning reserved top-level entries and
    /// anything named in `ignore`. Does not filter drafts or build any
    /// cross-page structure (resolver, backlinks) — that's the caller's
    /// job, as in [`build`].
    pub fn scan(root: &Path, ignore: &HashSet<String>) -> Result<Vec<Page>> {
        scanner::scan(root, ignore)
    }
}
