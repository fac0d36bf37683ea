//! Link discovery and artifact extraction from fetched pages.

use crate::{normalize_url, CrawlError, FetchedPage};
use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use url::Url;

/// Finds outgoing links on a page.
#[cfg_attr(test, mockall::automock)]
pub trait LinkExtractor: Send + Sync {
    /// Returns absolute URLs. Relative links are resolved against the page,
    /// links that cannot be resolved are dropped.
    fn extract_links(&self, page: &FetchedPage) -> Vec<String>;
}

/// Produces the artifacts (image URLs and similar) found on a page.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageProcessor: Send + Sync {
    async fn extract_artifacts(&self, page: &FetchedPage) -> Result<Vec<String>, CrawlError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Favicon,
    Logo,
    Image,
}

const LOGO_MARKERS: [&str; 5] = ["logo", "brandmark", "company", "corporate", "branding"];

/// Classifies an artifact by its URL.
pub fn classify_artifact(url: &str) -> ArtifactKind {
    let lower = url.to_ascii_lowercase();
    if lower.contains("favicon") {
        ArtifactKind::Favicon
    } else if LOGO_MARKERS.iter().any(|m| lower.contains(m)) {
        ArtifactKind::Logo
    } else {
        ArtifactKind::Image
    }
}

// Selectors below are compile-time constants.
fn static_selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("static selector must parse")
}

fn is_http(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

fn resolve(base: &Url, raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    base.join(raw).ok().filter(is_http)
}

pub struct HtmlLinkExtractor {
    anchors: Selector,
}

impl HtmlLinkExtractor {
    pub fn new() -> Self {
        Self {
            anchors: static_selector("a[href]"),
        }
    }
}

impl Default for HtmlLinkExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkExtractor for HtmlLinkExtractor {
    fn extract_links(&self, page: &FetchedPage) -> Vec<String> {
        let document = Html::parse_document(&page.body);

        document
            .select(&self.anchors)
            .filter_map(|a| a.value().attr("href"))
            .filter(|href| {
                let href = href.trim_start();
                !(href.starts_with('#')
                    || href.starts_with("mailto:")
                    || href.starts_with("tel:")
                    || href.starts_with("javascript:")
                    || href.starts_with("data:"))
            })
            .filter_map(|href| resolve(&page.final_url, href))
            .map(|url| url.to_string())
            .collect()
    }
}

/// Collects image sources from static markup.
///
/// Looks at `img[src]`, the first candidate of every `srcset`, inline
/// `background-image: url(...)` styles and the page's `<link rel="icon">`.
pub struct HtmlImageProcessor {
    images: Selector,
    srcsets: Selector,
    styled: Selector,
    icons: Selector,
    favicon_fallback: bool,
}

impl HtmlImageProcessor {
    pub fn new() -> Self {
        Self {
            images: static_selector("img[src]"),
            srcsets: static_selector("img[srcset], source[srcset]"),
            styled: static_selector("[style*='background-image']"),
            icons: static_selector("link[rel~='icon']"),
            favicon_fallback: false,
        }
    }

    /// Report `/favicon.ico` on the page origin when the markup declares no icon.
    pub fn with_favicon_fallback(mut self, enabled: bool) -> Self {
        self.favicon_fallback = enabled;
        self
    }

    pub fn collect(&self, page: &FetchedPage) -> Vec<String> {
        let document = Html::parse_document(&page.body);
        let base = &page.final_url;
        let mut raw: Vec<String> = Vec::new();

        raw.extend(
            document
                .select(&self.images)
                .filter_map(|e| e.value().attr("src"))
                .map(str::to_string),
        );

        raw.extend(
            document
                .select(&self.srcsets)
                .filter_map(|e| e.value().attr("srcset"))
                .filter_map(first_srcset_candidate),
        );

        raw.extend(
            document
                .select(&self.styled)
                .filter_map(|e| e.value().attr("style"))
                .filter_map(background_image_url),
        );

        let icons: Vec<String> = document
            .select(&self.icons)
            .filter_map(|e| e.value().attr("href"))
            .map(str::to_string)
            .collect();
        if icons.is_empty() && self.favicon_fallback {
            raw.push("/favicon.ico".to_string());
        }
        raw.extend(icons);

        let mut seen = BTreeSet::new();
        raw.iter()
            .filter(|r| !r.trim_start().starts_with("data:"))
            .filter_map(|r| resolve(base, r))
            .map(|url| normalize_url(url.as_str()))
            .filter(|url| seen.insert(url.clone()))
            .collect()
    }
}

impl Default for HtmlImageProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageProcessor for HtmlImageProcessor {
    async fn extract_artifacts(&self, page: &FetchedPage) -> Result<Vec<String>, CrawlError> {
        Ok(self.collect(page))
    }
}

fn first_srcset_candidate(srcset: &str) -> Option<String> {
    srcset
        .split(',')
        .next()
        .and_then(|c| c.split_whitespace().next())
        .map(str::to_string)
}

fn background_image_url(style: &str) -> Option<String> {
    let start = style.find("url(")? + "url(".len();
    let rest = &style[start..];
    let end = rest.find(')')?;
    let value = rest[..end]
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim();
    (!value.is_empty()).then(|| value.to_string())
}
