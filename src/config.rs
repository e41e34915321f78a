//! Site configuration (C12).
//!
//! `leafpress.json` sits next to the garden's content root — unlike the
//! ancestor desktop app's per-user settings file, this is a file the garden
//! owner commits to version control alongside their Markdown. Defaults are
//! applied via `#[serde(default = "...")]` on each field rather than a
//! separate merge step; `Config::load_and_validate` performs every
//! validation named in the external-interfaces contract and fails fast on
//! the first problem found.

use crate::error::{LeafpressError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Debounce window the dev-loop file watcher coalesces raw filesystem
/// events over before dispatching a [`crate::incremental::FileChange`].
pub const DEBOUNCE_INTERVAL: Duration = Duration::from_millis(300);

/// Capacity of the watcher's broadcast channel; the incremental driver is
/// the lone subscriber in normal operation, so this only bounds how many
/// events can queue up while a rebuild is in flight.
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 100;

fn default_title() -> String {
    "My Garden".to_string()
}

fn default_output_dir() -> String {
    "_site".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_true() -> bool {
    true
}

/// One entry in the site's top navigation bar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavItem {
    pub label: String,
    pub path: String,
}

/// Nav-bar "active" indicator style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavActiveStyle {
    #[default]
    Base,
    Box,
    Underlined,
}

/// Nav-bar positioning style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavStyle {
    #[default]
    Base,
    Sticky,
    Glassy,
}

fn default_background() -> String {
    "#ffffff".to_string()
}

fn default_background_dark() -> String {
    "#0d1117".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeBackground {
    #[serde(default = "default_background")]
    pub light: String,
    #[serde(default = "default_background_dark")]
    pub dark: String,
}

impl Default for ThemeBackground {
    fn default() -> Self {
        Self {
            light: default_background(),
            dark: default_background_dark(),
        }
    }
}

fn default_font_heading() -> String {
    "Inter".to_string()
}

fn default_font_body() -> String {
    "Inter".to_string()
}

fn default_font_mono() -> String {
    "JetBrains Mono".to_string()
}

fn default_accent() -> String {
    "#4f8cff".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    #[serde(rename = "fontHeading", default = "default_font_heading")]
    pub font_heading: String,
    #[serde(rename = "fontBody", default = "default_font_body")]
    pub font_body: String,
    #[serde(rename = "fontMono", default = "default_font_mono")]
    pub font_mono: String,
    #[serde(default = "default_accent")]
    pub accent: String,
    #[serde(default)]
    pub background: ThemeBackground,
    #[serde(rename = "navStyle", default)]
    pub nav_style: NavStyle,
    #[serde(rename = "navActiveStyle", default)]
    pub nav_active_style: NavActiveStyle,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            font_heading: default_font_heading(),
            font_body: default_font_body(),
            font_mono: default_font_mono(),
            accent: default_accent(),
            background: ThemeBackground::default(),
            nav_style: NavStyle::default(),
            nav_active_style: NavActiveStyle::default(),
        }
    }
}

/// The parsed, validated contents of `leafpress.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(rename = "baseURL", default)]
    pub base_url: String,
    #[serde(rename = "outputDir", default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub ignore: Vec<String>,
    #[serde(default)]
    pub nav: Vec<NavItem>,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub graph: bool,
    #[serde(default = "default_true")]
    pub toc: bool,
    #[serde(default = "default_true")]
    pub wikilinks: bool,
    #[serde(default = "default_true")]
    pub backlinks: bool,
    #[serde(default)]
    pub search: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: default_title(),
            author: String::new(),
            base_url: String::new(),
            output_dir: default_output_dir(),
            port: default_port(),
            ignore: Vec::new(),
            nav: Vec::new(),
            theme: Theme::default(),
            graph: false,
            toc: true,
            wikilinks: true,
            backlinks: true,
            search: false,
        }
    }
}

impl Config {
    /// Loads `leafpress.json` from `path`, or returns the default
    /// configuration if no file exists there.
    pub fn load(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path).map_err(|e| LeafpressError::io(path, e))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| LeafpressError::config(format!("invalid leafpress.json: {e}")))?;
        Ok(config)
    }

    /// Loads and validates `leafpress.json`, failing on the first invalid
    /// field found. Called before any output is written.
    pub fn load_and_validate(path: &Path) -> Result<Config> {
        let config = Config::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Runs every validation named in the external-interfaces contract:
    /// port range, nav path prefixes, hex color shape, output-dir safety.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(LeafpressError::config("port must be between 1 and 65535"));
        }

        for item in &self.nav {
            if !item.path.starts_with('/') {
                return Err(LeafpressError::config(format!(
                    "nav entry '{}' has a path that does not start with '/'",
                    item.label
                )));
            }
        }

        validate_hex_color(&self.theme.accent)?;

        let output_dir = Path::new(&self.output_dir);
        if output_dir.is_absolute() || matches!(self.output_dir.as_str(), "/" | "." | "") {
            return Err(LeafpressError::config(format!(
                "outputDir '{}' is not a safe relative directory",
                self.output_dir
            )));
        }
        let dangerous_roots: HashSet<&str> = ["/", "/home", "/etc", "/usr", "/root"].into();
        if dangerous_roots.contains(self.output_dir.as_str()) {
            return Err(LeafpressError::config(format!(
                "outputDir '{}' resolves to a system root",
                self.output_dir
            )));
        }

        Ok(())
    }

    /// The set of extra top-level content-root entries to skip, beyond the
    /// scanner's built-in reserved set.
    pub fn ignore_top_level(&self) -> HashSet<String> {
        self.ignore.iter().cloned().collect()
    }
}

/// Validates a CSS hex color in `#RGB` or `#RRGGBB` form.
fn validate_hex_color(color: &str) -> Result<()> {
    let hex = color
        .strip_prefix('#')
        .ok_or_else(|| LeafpressError::config(format!("theme.accent '{color}' must start with '#'")))?;

    if !(hex.len() == 3 || hex.len() == 6) || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(LeafpressError::config(format!(
            "theme.accent '{color}' is not a valid #RGB or #RRGGBB color"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = Config::default();
        assert_eq!(config.title, "My Garden");
        assert_eq!(config.output_dir, "_site");
        assert_eq!(config.port, 3000);
        assert!(config.toc);
        assert!(config.wikilinks);
        assert!(config.backlinks);
        assert!(!config.search);
        assert!(!config.graph);
    }

    #[test]
    fn validate_rejects_bad_nav_path() {
        let mut config = Config::default();
        config.nav.push(NavItem {
            label: "Home".into(),
            path: "home".into(),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_accent_color() {
        let mut config = Config::default();
        config.theme.accent = "blue".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_three_and_six_digit_hex() {
        let mut config = Config::default();
        config.theme.accent = "#fff".into();
        assert!(config.validate().is_ok());
        config.theme.accent = "#ff00aa".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_system_root_output_dir() {
        let mut config = Config::default();
        config.output_dir = "/etc".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_returns_defaults_when_file_absent() {
        let config = Config::load(Path::new("/nonexistent/leafpress.json")).unwrap();
        assert_eq!(config.title, "My Garden");
    }

    #[test]
    fn load_parses_partial_json_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leafpress.json");
        fs::write(&path, r#"{"title": "My Notes", "search": true}"#).unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.title, "My Notes");
        assert!(config.search);
        assert_eq!(config.output_dir, "_site");
    }
}
