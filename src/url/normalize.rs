use crate::UrlError;
use url::Url;

/// Parses a URL that may be crawled
///
/// Only `http` and `https` URLs with a host are accepted.
///
/// # Examples
///
/// ```
/// use sumi_mirror::url::parse_target;
///
/// assert!(parse_target("https://example.com/").is_ok());
/// assert!(parse_target("not a url \t").is_err());
/// assert!(parse_target("ftp://example.com/file").is_err());
/// ```
pub fn parse_target(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}

/// Computes the key a URL is stored under in the visited set
///
/// Equivalent spellings of the same resource collapse to one key:
///
/// 1. The host is lower-cased (default ports are already dropped by parsing)
/// 2. The fragment is removed
/// 3. Trailing slashes are removed, except for the root path `/`
///
/// The scheme and the query string are kept.
///
/// # Examples
///
/// ```
/// use sumi_mirror::url::visited_key;
/// use url::Url;
///
/// let a = Url::parse("http://Example.COM/docs/#intro").unwrap();
/// let b = Url::parse("http://example.com/docs").unwrap();
/// assert_eq!(visited_key(&a), visited_key(&b));
/// ```
pub fn visited_key(url: &Url) -> String {
    let mut key = url.clone();
    key.set_fragment(None);

    // Hosts of http(s) URLs are lower-cased by the parser already
    if let Some(host) = url.host_str() {
        let lowered = host.to_lowercase();
        if lowered != host && key.set_host(Some(&lowered)).is_err() {
            tracing::trace!("Keeping host {:?} of {} as parsed", host, url);
        }
    }

    let trimmed = url.path().trim_end_matches('/');
    let path = if trimmed.is_empty() { "/" } else { trimmed };
    if path != url.path() {
        key.set_path(path);
    }

    key.into()
}
