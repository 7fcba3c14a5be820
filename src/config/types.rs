use serde::Deserialize;

/// Main configuration structure for Sumi-Mirror
///
/// Every section and key is optional; missing values fall back to the
/// defaults below and command-line flags are layered on top afterwards.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MirrorConfig {
    #[serde(default)]
    pub mirror: MirrorOptions,
    #[serde(default)]
    pub http: HttpOptions,
}

/// What to mirror and where to put it
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MirrorOptions {
    /// Root directory; one `<host>/` subtree is created per mirrored site
    #[serde(rename = "output-dir", default = "default_output_dir")]
    pub output_dir: String,

    /// File suffixes to skip (`jpg` and `.jpg` are equivalent)
    #[serde(default)]
    pub reject: Vec<String>,

    /// Path prefixes to skip (case-sensitive)
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Rewrite same-host references in saved HTML to relative local paths
    #[serde(rename = "convert-links", default)]
    pub convert_links: bool,

    /// Number of concurrent workers draining the frontier
    #[serde(default = "default_workers")]
    pub workers: usize,
}

/// HTTP client behaviour
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpOptions {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Whole-request timeout in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Byte-rate limit such as `200k` or `1M`; unset means unthrottled
    #[serde(rename = "rate-limit", default)]
    pub rate_limit: Option<String>,
}

fn default_output_dir() -> String {
    ".".to_string()
}

fn default_workers() -> usize {
    1
}

fn default_user_agent() -> String {
    format!("sumi-mirror/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for MirrorOptions {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            reject: Vec::new(),
            exclude: Vec::new(),
            convert_links: false,
            workers: default_workers(),
        }
    }
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            rate_limit: None,
        }
    }
}
