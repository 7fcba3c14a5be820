//! Link conversion for offline browsing
//!
//! Every same-host `href`/`src` (on the tags the extractor follows) and every
//! same-host CSS `url(...)` is replaced by a path relative to the directory
//! the page itself is saved in. The document is re-serialized from the
//! parsed tree; attribute order and unrelated markup are kept.

use crate::crawler::{css_url_regex, link_attribute};
use crate::output::layout::map_url;
use crate::url::same_host;
use crate::MirrorError;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use regex::Captures;
use scraper::node::Element;
use scraper::{Html, Node};
use std::path::{Component, Path};
use url::Url;

/// Bytes escaped when a local file name is written back into a reference
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Rewrites same-host references in an HTML page to local relative paths
///
/// # Arguments
///
/// * `html` - Raw bytes of the fetched page
/// * `page_url` - URL the page was fetched from
/// * `output_root` - Mirror root passed to the path mapper
/// * `page_local_dir` - Directory the page is saved in
///
/// # Returns
///
/// The re-serialized document. Running it through `rewrite_links` again
/// returns identical bytes: relative references resolve back to the same
/// local files.
///
/// If a relative path cannot be computed (for example one of the two paths
/// is absolute and the other is not), the reference falls back to the URL's
/// root-relative path instead of failing the page.
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use sumi_mirror::output::rewrite_links;
/// use url::Url;
///
/// let page = Url::parse("http://site.test/docs/").unwrap();
/// let html = br#"<a href="http://site.test/about.html">About</a>"#;
/// let out = rewrite_links(html, &page, Path::new("m"), Path::new("m/site.test/docs")).unwrap();
/// assert!(String::from_utf8(out).unwrap().contains(r#"href="../about.html""#));
/// ```
pub fn rewrite_links(
    html: &[u8],
    page_url: &Url,
    output_root: &Path,
    page_local_dir: &Path,
) -> Result<Vec<u8>, MirrorError> {
    if page_url.host_str().is_none() {
        return Err(MirrorError::Rewrite {
            url: page_url.to_string(),
            message: "page URL has no host".to_string(),
        });
    }

    let rewriter = LinkRewriter {
        page_url,
        output_root,
        page_local_dir,
    };

    let source = String::from_utf8_lossy(html);
    let mut document = Html::parse_document(&source);

    // Elements and <style> text, gathered before any node is borrowed mutably
    let targets: Vec<_> = document
        .tree
        .root()
        .descendants()
        .filter(|node| match node.value() {
            Node::Element(_) => true,
            Node::Text(_) => node
                .parent()
                .and_then(|parent| parent.value().as_element().map(|el| el.name() == "style"))
                .unwrap_or(false),
            _ => false,
        })
        .map(|node| node.id())
        .collect();

    let mut rewritten = 0usize;
    for id in targets {
        let Some(mut node) = document.tree.get_mut(id) else {
            continue;
        };
        match node.value() {
            Node::Element(element) => rewritten += rewriter.rewrite_element(element),
            Node::Text(text) => {
                if let Some((css, count)) = rewriter.rewrite_css(&text.text) {
                    text.text = css.into();
                    rewritten += count;
                }
            }
            _ => {}
        }
    }

    tracing::debug!("Rewrote {} references in {}", rewritten, page_url);
    Ok(document.html().into_bytes())
}

struct LinkRewriter<'a> {
    page_url: &'a Url,
    output_root: &'a Path,
    page_local_dir: &'a Path,
}

impl LinkRewriter<'_> {
    /// Rewrites the link attribute and inline style of one element
    fn rewrite_element(&self, element: &mut Element) -> usize {
        let link_attr = link_attribute(element.name());
        let mut count = 0;

        for (name, value) in element.attrs.iter_mut() {
            let key: &str = &name.local;
            if Some(key) == link_attr {
                if let Some(local) = self.localize(value) {
                    *value = local.into();
                    count += 1;
                }
            } else if key == "style" {
                if let Some((css, n)) = self.rewrite_css(value) {
                    *value = css.into();
                    count += n;
                }
            }
        }

        count
    }

    /// Rewrites each same-host `url(...)` in a CSS fragment
    ///
    /// Only the URL inside the parentheses changes; quotes and surrounding
    /// whitespace are kept. Returns None when nothing was rewritten.
    fn rewrite_css(&self, css: &str) -> Option<(String, usize)> {
        let mut count = 0;
        let output = css_url_regex().replace_all(css, |caps: &Captures| {
            let (Some(whole), Some(arg)) = (caps.get(0), caps.get(1)) else {
                return caps[0].to_string();
            };

            let raw = arg.as_str();
            let start = arg.start() + (raw.len() - raw.trim_start().len());
            let end = start + raw.trim().len();

            match self.localize(&css[start..end]) {
                Some(local) => {
                    count += 1;
                    format!("{}{}{}", &css[whole.start()..start], local, &css[end..whole.end()])
                }
                None => whole.as_str().to_string(),
            }
        });

        (count > 0).then(|| (output.into_owned(), count))
    }

    /// Maps one raw reference to its local relative form
    ///
    /// Returns None for references that must stay untouched: empty,
    /// fragment-only, unresolvable or off-host.
    fn localize(&self, raw: &str) -> Option<String> {
        let reference = raw.trim();
        if reference.is_empty() || reference.starts_with('#') {
            return None;
        }

        let resolved = self.page_url.join(reference).ok()?;
        if !same_host(&resolved, self.page_url) {
            return None;
        }

        let target = map_url(&resolved, self.output_root).ok()?.file_path();
        let mut local = match relative_path(&target, self.page_local_dir) {
            Some(relative) => relative,
            None => {
                tracing::debug!(
                    "No relative path from {} to {}, using root-relative {}",
                    self.page_local_dir.display(),
                    target.display(),
                    resolved.path()
                );
                resolved.path().to_string()
            }
        };

        if let Some(fragment) = resolved.fragment() {
            local.push('#');
            local.push_str(fragment);
        }

        Some(local)
    }
}

/// Slash-separated, percent-encoded path from `base_dir` to `target`
fn relative_path(target: &Path, base_dir: &Path) -> Option<String> {
    let relative = pathdiff::diff_paths(target, base_dir)?;
    if relative.is_absolute() || relative.as_os_str().is_empty() {
        return None;
    }

    let parts: Vec<String> = relative
        .components()
        .map(|component| match component {
            Component::ParentDir => "..".to_string(),
            Component::CurDir => ".".to_string(),
            other => {
                let name = other.as_os_str().to_string_lossy();
                utf8_percent_encode(&name, PATH_SEGMENT).to_string()
            }
        })
        .collect();

    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROOT: &str = "mirror";

    fn rewrite_at(page: &str, page_dir: &str, html: &str) -> String {
        let page_url = Url::parse(page).unwrap();
        let out = rewrite_links(
            html.as_bytes(),
            &page_url,
            Path::new(ROOT),
            Path::new(page_dir),
        )
        .unwrap();
        String::from_utf8(out).unwrap()
    }

    fn rewrite_root(html: &str) -> String {
        rewrite_at("http://site.test/", "mirror/site.test", html)
    }

    #[test]
    fn test_rewrites_same_host_links_from_root_page() {
        let out = rewrite_root(
            r#"<a href="/about.html">About</a><img src="http://site.test/img/logo.png"><link rel="stylesheet" href="css/site.css">"#,
        );
        assert!(out.contains(r#"href="about.html""#), "{}", out);
        assert!(out.contains(r#"src="img/logo.png""#), "{}", out);
        assert!(out.contains(r#"href="css/site.css""#), "{}", out);
    }

    #[test]
    fn test_relative_to_nested_page_directory() {
        let out = rewrite_at(
            "http://site.test/blog/2024/post.html",
            "mirror/site.test/blog/2024",
            r#"<a href="/about.html">About</a><img src="../../img/a.png"><a href="other.html">o</a>"#,
        );
        assert!(out.contains(r#"href="../../about.html""#), "{}", out);
        assert!(out.contains(r#"src="../../img/a.png""#), "{}", out);
        assert!(out.contains(r#"href="other.html""#), "{}", out);
    }

    #[test]
    fn test_directory_links_point_at_index_file() {
        let out = rewrite_root(r#"<a href="/docs/">Docs</a><a href="http://site.test">Home</a>"#);
        assert!(out.contains(r#"href="docs/index.html""#), "{}", out);
        assert!(out.contains(r#"href="index.html""#), "{}", out);
    }

    #[test]
    fn test_fragment_is_kept_and_query_dropped() {
        let out = rewrite_root(r#"<a href="/about.html?lang=en#team">Team</a>"#);
        assert!(out.contains(r#"href="about.html#team""#), "{}", out);
    }

    #[test]
    fn test_untouched_references() {
        let html = r##"<a href="https://other.test/x">x</a><a href="#top">top</a><a href="">e</a><a href="mailto:a@site.test">m</a><script src="/app.js"></script>"##;
        let out = rewrite_root(html);
        assert!(out.contains(r#"href="https://other.test/x""#), "{}", out);
        assert!(out.contains(r##"href="#top""##), "{}", out);
        assert!(out.contains(r#"href="""#), "{}", out);
        assert!(out.contains(r#"href="mailto:a@site.test""#), "{}", out);
        assert!(out.contains(r#"src="/app.js""#), "{}", out);
    }

    #[test]
    fn test_css_in_style_block_and_attribute() {
        let out = rewrite_at(
            "http://site.test/a/page.html",
            "mirror/site.test/a",
            r#"<html><head><style>body { background: url( "/img/bg.png" ) } .x { background: url(https://other.test/y.png) }</style></head>
            <body><div style="background-image: url('http://site.test/a/hero.jpg'); color: red">x</div></body></html>"#,
        );
        assert!(out.contains(r#"url( "../img/bg.png" )"#), "{}", out);
        assert!(out.contains("url(https://other.test/y.png)"), "{}", out);
        assert!(
            out.contains(r#"style="background-image: url('hero.jpg'); color: red""#),
            "{}",
            out
        );
    }

    #[test]
    fn test_attribute_order_preserved() {
        let out = rewrite_root(r#"<a id="x" href="/b.html" class="c" data-k="v">b</a>"#);
        assert!(
            out.contains(r#"<a id="x" href="b.html" class="c" data-k="v">"#),
            "{}",
            out
        );
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let html = r#"<!DOCTYPE html><html><head><title>t</title><style>p{background:url(/img/p.png)}</style>
            <link rel="stylesheet" href="/css/main.css"></head>
            <body><a href="http://site.test/docs/">docs</a><a href="/about.html#team">a</a>
            <img src="/logo.png" alt="logo"><a href="https://other.test/">out</a>
            <p style="background: url('/img/x.gif')">p</p></body></html>"#;

        let once = rewrite_at("http://site.test/blog/post.html", "mirror/site.test/blog", html);
        let twice = rewrite_at("http://site.test/blog/post.html", "mirror/site.test/blog", &once);
        assert_eq!(once, twice);
        assert!(once.contains(r#"href="../docs/index.html""#), "{}", once);
    }

    #[test]
    fn test_fallback_to_root_relative_path() {
        // Absolute page directory against a relative mirror root has no relative path
        let out = rewrite_at(
            "http://site.test/a/page.html",
            "/var/www/site.test/a",
            r#"<a href="/b/c.html#s">c</a><img src="/img/x.png">"#,
        );
        assert!(out.contains(r#"href="/b/c.html#s""#), "{}", out);
        assert!(out.contains(r#"src="/img/x.png""#), "{}", out);

        let again = rewrite_at("http://site.test/a/page.html", "/var/www/site.test/a", &out);
        assert_eq!(out, again);
    }

    #[test]
    fn test_decoded_file_names_are_encoded_in_references() {
        let out = rewrite_root(
            r#"<a href="my%20file.html">a</a><a href="/my file.html">b</a><img src="/caf%C3%A9/men%C3%BC.png">"#,
        );
        assert_eq!(out.matches(r#"href="my%20file.html""#).count(), 2, "{}", out);
        assert!(out.contains(r#"src="caf%C3%A9/men%C3%BC.png""#), "{}", out);

        let again = rewrite_root(&out);
        assert_eq!(out, again);
    }

    #[test]
    fn test_page_in_decoded_directory() {
        let out = rewrite_at(
            "http://site.test/my%20dir/page.html",
            "mirror/site.test/my dir",
            r#"<a href="/top.html">t</a><a href="sibling%231.html">s</a>"#,
        );
        assert!(out.contains(r#"href="../top.html""#), "{}", out);
        assert!(out.contains(r#"href="sibling%231.html""#), "{}", out);
    }

    #[test]
    fn test_page_url_without_host_is_error() {
        let page = Url::parse("data:text/html,hi").unwrap();
        let result = rewrite_links(b"<p>hi</p>", &page, Path::new(ROOT), Path::new(ROOT));
        assert!(matches!(result, Err(MirrorError::Rewrite { .. })));
    }

    #[test]
    fn test_relative_path_helper() {
        assert_eq!(
            relative_path(Path::new("m/h/a/b.html"), Path::new("m/h")),
            Some("a/b.html".to_string())
        );
        assert_eq!(
            relative_path(Path::new("m/h/b.html"), Path::new("m/h/x/y")),
            Some("../../b.html".to_string())
        );
        assert_eq!(relative_path(Path::new("m/h/b.html"), Path::new("/abs")), None);
        assert_eq!(
            relative_path(Path::new("m/h/a b/c#1.html"), Path::new("m/h")),
            Some("a%20b/c%231.html".to_string())
        );
    }
}
