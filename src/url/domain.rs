use url::Url;

/// Returns the `host[:port]` authority of a URL
///
/// The port only appears when it differs from the scheme's default, so
/// `http://example.com:80/` yields `example.com`. This string names the
/// per-site directory under the mirror root.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_mirror::url::host_key;
///
/// let url = Url::parse("https://EXAMPLE.com/path").unwrap();
/// assert_eq!(host_key(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(host_key(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn host_key(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host,
    })
}

/// Checks whether two URLs address the same host
///
/// Hosts must match exactly (no subdomain matching) and so must any
/// non-default port. The scheme is ignored, so `http://example.com/x` is
/// same-host with `https://example.com/`.
pub fn same_host(a: &Url, b: &Url) -> bool {
    match (host_key(a), host_key(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
