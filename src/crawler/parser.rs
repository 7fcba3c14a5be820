//! HTML parser for extracting same-host references
//!
//! This module finds every resource a mirrored page depends on:
//! - `<a href>` and `<link href>` (pages, stylesheets, icons)
//! - `<img src>`
//! - CSS `url(...)` inside `<style>` blocks and inline `style` attributes

use crate::url::same_host;
use regex::Regex;
use scraper::{Html, Node};
use std::collections::HashSet;
use std::sync::OnceLock;
use url::Url;

/// Returns the attribute that carries a reference for a tag we follow
///
/// The extractor and the rewriter share this table so that every reference
/// that is mirrored is also the one that gets rewritten.
pub(crate) fn link_attribute(tag: &str) -> Option<&'static str> {
    match tag {
        "a" | "link" => Some("href"),
        "img" => Some("src"),
        _ => None,
    }
}

/// Matches `url(...)` with an unquoted, single- or double-quoted argument
pub(crate) fn css_url_regex() -> &'static Regex {
    static CSS_URL: OnceLock<Regex> = OnceLock::new();
    CSS_URL.get_or_init(|| {
        Regex::new(r#"url\(\s*['"]?([^)'"]+)['"]?\s*\)"#).expect("CSS url() pattern is valid")
    })
}

/// Iterates over the (whitespace-trimmed) arguments of every CSS `url(...)`
fn css_urls(css: &str) -> impl Iterator<Item = &str> {
    css_url_regex()
        .captures_iter(css)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

/// Resolves a raw reference against `base`, keeping it only if it is same-host
///
/// Returns None for:
/// - empty (or whitespace-only) references
/// - fragment-only references (`#top`)
/// - references that fail to resolve
/// - references whose host (and non-default port) differs from `base`
///
/// The fragment of the resolved URL is dropped.
fn resolve_same_host(base: &Url, raw: &str) -> Option<Url> {
    let reference = raw.trim();
    if reference.is_empty() || reference.starts_with('#') {
        return None;
    }

    let mut resolved = base.join(reference).ok()?;
    if !same_host(&resolved, base) {
        return None;
    }

    resolved.set_fragment(None);
    Some(resolved)
}

/// Collects resolved links in discovery order, reporting each URL once
struct LinkCollector<'a> {
    base: &'a Url,
    seen: HashSet<String>,
    links: Vec<Url>,
}

impl<'a> LinkCollector<'a> {
    fn new(base: &'a Url) -> Self {
        Self {
            base,
            seen: HashSet::new(),
            links: Vec::new(),
        }
    }

    fn add(&mut self, raw: &str) {
        if let Some(url) = resolve_same_host(self.base, raw) {
            if self.seen.insert(url.as_str().to_string()) {
                self.links.push(url);
            }
        }
    }

    fn add_css(&mut self, css: &str) {
        for reference in css_urls(css) {
            self.add(reference);
        }
    }
}

/// Extracts every same-host resource URL referenced by an HTML document
///
/// Parsing is best-effort: malformed markup is repaired by the HTML5 parser
/// and invalid UTF-8 is decoded lossily, so this never fails. The result is
/// in document order with duplicates removed; it does not know which URLs
/// were already mirrored.
///
/// # Arguments
///
/// * `base` - The URL the document was fetched from
/// * `html` - The raw document bytes
///
/// # Example
///
/// ```
/// use sumi_mirror::crawler::extract_links;
/// use url::Url;
///
/// let base = Url::parse("http://site.test/").unwrap();
/// let html = br#"<a href="/about.html">About</a><a href="http://other.test/x">Out</a>"#;
/// let links = extract_links(&base, html);
/// assert_eq!(links.len(), 1);
/// assert_eq!(links[0].as_str(), "http://site.test/about.html");
/// ```
pub fn extract_links(base: &Url, html: &[u8]) -> Vec<Url> {
    let source = String::from_utf8_lossy(html);
    let document = Html::parse_document(&source);
    if !document.errors.is_empty() {
        tracing::trace!(
            "{} recoverable parse errors in {}",
            document.errors.len(),
            base
        );
    }

    let mut collector = LinkCollector::new(base);

    for node in document.tree.root().descendants() {
        match node.value() {
            Node::Element(element) => {
                if let Some(attr) = link_attribute(element.name()) {
                    if let Some(value) = element.attr(attr) {
                        collector.add(value);
                    }
                }
                if let Some(style) = element.attr("style") {
                    collector.add_css(style);
                }
            }
            Node::Text(text) => {
                let in_style = node
                    .parent()
                    .and_then(|parent| parent.value().as_element().map(|el| el.name() == "style"))
                    .unwrap_or(false);
                if in_style {
                    collector.add_css(&text.text);
                }
            }
            _ => {}
        }
    }

    collector.links
}
