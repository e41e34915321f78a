//! Template renderer (C7).
//!
//! Four compile-time-checked `askama` templates — page, section index, tag
//! index, tag page — share a common `layout.html` shell. `askama` escapes
//! every interpolation by default; pre-rendered HTML fields (`content`,
//! `intro_html`) are explicitly marked `|safe` in the templates themselves,
//! so the escaping discipline is enforced at compile time rather than by
//! convention.

use crate::config::{Config, NavActiveStyle, NavItem, NavStyle};
use crate::error::Result;
use crate::models::{Page, TocEntry};
use askama::Template;

/// Data common to every page render: site identity, nav, theme, and which
/// optional overlays (graph, search) are switched on.
#[derive(Debug, Clone)]
pub struct SiteData {
    pub title: String,
    pub author: String,
    pub base_url: String,
    pub nav_style_name: String,
    pub nav_active_style_name: String,
    pub font_heading: String,
    pub font_body: String,
    pub font_mono: String,
    pub accent: String,
    pub background_light: String,
    pub background_dark: String,
    pub graph_enabled: bool,
    pub search_enabled: bool,
}

impl SiteData {
    pub fn from_config(config: &Config) -> Self {
        Self {
            title: config.title.clone(),
            author: config.author.clone(),
            base_url: config.base_url.clone(),
            nav_style_name: nav_style_name(config.theme.nav_style),
            nav_active_style_name: nav_active_style_name(config.theme.nav_active_style),
            font_heading: config.theme.font_heading.clone(),
            font_body: config.theme.font_body.clone(),
            font_mono: config.theme.font_mono.clone(),
            accent: config.theme.accent.clone(),
            background_light: config.theme.background.light.clone(),
            background_dark: config.theme.background.dark.clone(),
            graph_enabled: config.graph,
            search_enabled: config.search,
        }
    }

    /// Google Fonts CSS2 stylesheet URL for the three configured font
    /// families, spaces folded to `+` per the Google Fonts query syntax.
    pub fn fonts_url(&self) -> String {
        let families = [&self.font_heading, &self.font_body, &self.font_mono]
            .into_iter()
            .map(|f| format!("family={}", f.replace(' ', "+")))
            .collect::<Vec<_>>()
            .join("&");
        format!("https://fonts.googleapis.com/css2?{families}&display=swap")
    }
}

fn nav_style_name(style: NavStyle) -> String {
    match style {
        NavStyle::Base => "base",
        NavStyle::Sticky => "sticky",
        NavStyle::Glassy => "glassy",
    }
    .to_string()
}

fn nav_active_style_name(style: NavActiveStyle) -> String {
    match style {
        NavActiveStyle::Base => "base",
        NavActiveStyle::Box => "box",
        NavActiveStyle::Underlined => "underlined",
    }
    .to_string()
}

/// A resolved nav-bar entry: the configured label/path plus the
/// `startsWith(current_path, nav.path)` active-class derivation.
#[derive(Debug, Clone)]
pub struct NavLink {
    pub label: String,
    pub href: String,
    pub active: bool,
}

/// Builds the resolved nav list for the page currently being rendered.
pub fn nav_links(config: &Config, current_path: &str) -> Vec<NavLink> {
    config
        .nav
        .iter()
        .map(|item: &NavItem| NavLink {
            label: item.label.clone(),
            href: format!("{}{}", config.base_url, item.path.trim_start_matches('/')),
            active: current_path.starts_with(&item.path),
        })
        .collect()
}

/// One entry in a backlinks footer or a section/tag page listing.
#[derive(Debug, Clone)]
pub struct PageSummary {
    pub title: String,
    pub href: String,
    pub description: String,
    pub date_display: String,
    pub growth_emoji: Option<&'static str>,
    pub tags: Vec<String>,
}

impl PageSummary {
    pub fn from_page(page: &Page, base_url: &str) -> Self {
        Self {
            title: page.title.clone(),
            href: format!("{base_url}{}", page.permalink.trim_start_matches('/')),
            description: page.description.clone().unwrap_or_default(),
            date_display: page.display_date().format("%Y-%m-%d").to_string(),
            growth_emoji: page.growth.map(|g| g.emoji()),
            tags: page.tags.clone(),
        }
    }
}

#[derive(Template)]
#[template(path = "page.html")]
pub struct PageTemplate<'a> {
    pub site: &'a SiteData,
    pub nav: Vec<NavLink>,
    pub current_path: String,
    pub title: String,
    pub description: String,
    pub content: String,
    pub toc: &'a [TocEntry],
    pub show_toc: bool,
    pub backlinks: Vec<PageSummary>,
    pub show_backlinks: bool,
    pub tags: Vec<String>,
    pub growth_emoji: Option<&'static str>,
    pub created_display: String,
    pub created_iso: String,
    pub has_modified: bool,
    pub modified_display: String,
    pub modified_iso: String,
    pub reading_time: u32,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate<'a> {
    pub site: &'a SiteData,
    pub nav: Vec<NavLink>,
    pub current_path: String,
    pub title: String,
    pub intro_html: Option<String>,
    pub pages: Vec<PageSummary>,
}

#[derive(Template)]
#[template(path = "tag_index.html")]
pub struct TagIndexTemplate<'a> {
    pub site: &'a SiteData,
    pub nav: Vec<NavLink>,
    pub current_path: String,
    pub tags: Vec<TagSummary>,
}

#[derive(Debug, Clone)]
pub struct TagSummary {
    pub name: String,
    pub count: usize,
    pub href: String,
}

#[derive(Template)]
#[template(path = "tag_page.html")]
pub struct TagPageTemplate<'a> {
    pub site: &'a SiteData,
    pub nav: Vec<NavLink>,
    pub current_path: String,
    pub tag: String,
    pub pages: Vec<PageSummary>,
}

/// Renders any of the four template structs, wrapping `askama::Error` in
/// the crate's unified error type.
pub fn render<T: Template>(template: &T) -> Result<String> {
    Ok(template.render()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn fonts_url_folds_spaces_to_plus() {
        let mut config = Config::default();
        config.theme.font_heading = "Space Grotesk".to_string();
        let site = SiteData::from_config(&config);
        let url = site.fonts_url();
        assert!(url.contains("family=Space+Grotesk"));
    }

    #[test]
    fn nav_links_mark_prefix_match_active() {
        let mut config = Config::default();
        config.nav.push(NavItem {
            label: "Notes".into(),
            path: "/notes/".into(),
        });
        let links = nav_links(&config, "/notes/some-page/");
        assert!(links[0].active);
        let links = nav_links(&config, "/about/");
        assert!(!links[0].active);
    }

    #[test]
    fn page_template_renders_with_minimal_fields() {
        let config = Config::default();
        let site = SiteData::from_config(&config);
        let toc = Vec::new();
        let template = PageTemplate {
            site: &site,
            nav: Vec::new(),
            current_path: "/hello/".to_string(),
            title: "Hello".to_string(),
            description: String::new(),
            content: "<p>Hi</p>".to_string(),
            toc: &toc,
            show_toc: false,
            backlinks: Vec::new(),
            show_backlinks: false,
            tags: Vec::new(),
            growth_emoji: None,
            created_display: "Jan 1, 2026".to_string(),
            created_iso: "2026-01-01".to_string(),
            has_modified: false,
            modified_display: String::new(),
            modified_iso: String::new(),
            reading_time: 1,
        };
        let html = render(&template).unwrap();
        assert!(html.contains("Hello"));
        assert!(html.contains("<p>Hi</p>"));
    }

    #[test]
    fn page_template_shows_both_dates_when_modified() {
        let config = Config::default();
        let site = SiteData::from_config(&config);
        let toc = Vec::new();
        let template = PageTemplate {
            site: &site,
            nav: Vec::new(),
            current_path: "/hello/".to_string(),
            title: "Hello".to_string(),
            description: String::new(),
            content: "<p>Hi</p>".to_string(),
            toc: &toc,
            show_toc: false,
            backlinks: Vec::new(),
            show_backlinks: false,
            tags: Vec::new(),
            growth_emoji: None,
            created_display: "Jan 15, 2024".to_string(),
            created_iso: "2024-01-15".to_string(),
            has_modified: true,
            modified_display: "Jun 20, 2024".to_string(),
            modified_iso: "2024-06-20".to_string(),
            reading_time: 1,
        };
        let html = render(&template).unwrap();
        assert!(html.contains("Updated"));
        assert!(html.contains("Jun 20, 2024"));
        assert!(html.contains("Created"));
        assert!(html.contains("Jan 15, 2024"));
    }

    #[test]
    fn index_template_renders_page_list() {
        let config = Config::default();
        let site = SiteData::from_config(&config);
        let template = IndexTemplate {
            site: &site,
            nav: Vec::new(),
            current_path: "/notes/".to_string(),
            title: "Notes".to_string(),
            intro_html: Some("<p>Welcome</p>".to_string()),
            pages: vec![PageSummary {
                title: "First".to_string(),
                href: "/notes/first/".to_string(),
                description: String::new(),
                date_display: "2026-01-01".to_string(),
                growth_emoji: None,
                tags: Vec::new(),
            }],
        };
        let html = render(&template).unwrap();
        assert!(html.contains("Welcome"));
        assert!(html.contains("First"));
    }

    #[test]
    fn tag_index_template_renders_tag_cloud() {
        let config = Config::default();
        let site = SiteData::from_config(&config);
        let template = TagIndexTemplate {
            site: &site,
            nav: Vec::new(),
            current_path: "/tags/".to_string(),
            tags: vec![TagSummary {
                name: "rust".to_string(),
                count: 3,
                href: "/tags/rust/".to_string(),
            }],
        };
        let html = render(&template).unwrap();
        assert!(html.contains("rust"));
    }

    #[test]
    fn tag_page_template_renders_pages_for_tag() {
        let config = Config::default();
        let site = SiteData::from_config(&config);
        let template = TagPageTemplate {
            site: &site,
            nav: Vec::new(),
            current_path: "/tags/rust/".to_string(),
            tag: "rust".to_string(),
            pages: vec![PageSummary {
                title: "Ownership".to_string(),
                href: "/ownership/".to_string(),
                description: String::new(),
                date_display: "2026-01-01".to_string(),
                growth_emoji: None,
                tags: vec!["rust".to_string()],
            }],
        };
        let html = render(&template).unwrap();
        assert!(html.contains("Ownership"));
    }
}
