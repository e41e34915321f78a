//! Unified error handling.
//!
//! One `thiserror`-derived enum spans every fatal error category the build
//! pipeline can hit (config, frontmatter, scan, write, duplicate slug).
//! Non-fatal conditions — broken/ambiguous links, a single page's Markdown
//! failing to convert — are represented separately by [`crate::models::Warning`]
//! and never flow through here; they are collected and returned alongside a
//! successful [`crate::models::BuildReport`].

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LeafpressError {
    #[error("config error: {0}")]
    Config(String),

    #[error("frontmatter error in '{path}': {reason}")]
    Frontmatter { path: String, reason: String },

    #[error("scan error: {0}")]
    Scan(String),

    #[error("duplicate slug '{slug}': produced by both '{first}' and '{second}'")]
    DuplicateSlug {
        slug: String,
        first: String,
        second: String,
    },

    #[error("IO error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("template error: {0}")]
    Template(#[from] askama::Error),

    #[error("file watcher error: {0}")]
    Notify(#[from] notify::Error),

    #[error("path '{0}' is not a directory")]
    NotADirectory(PathBuf),
}

impl LeafpressError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LeafpressError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn frontmatter(path: impl Into<String>, reason: impl Into<String>) -> Self {
        LeafpressError::Frontmatter {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        LeafpressError::Config(reason.into())
    }

    pub fn scan(reason: impl Into<String>) -> Self {
        LeafpressError::Scan(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, LeafpressError>;
