//! Sumi-Mirror: a same-host website mirroring engine
//!
//! This crate walks a site breadth-first from a start URL, saves every
//! same-host page, image, stylesheet and CSS-referenced asset under
//! `<output>/<host>/...`, and can rewrite the saved HTML so the copy is
//! browsable from disk.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod url;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Sumi-Mirror operations
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid start URL {url:?}: {message}")]
    InvalidStartUrl { url: String, message: String },

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Bad status for {url}: HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("{url} redirected off host to {target}")]
    OffHostRedirect { url: String, target: String },

    #[error("Failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file {}: {source}", path.display())]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Failed to rewrite links in {url}: {message}")]
    Rewrite { url: String, message: String },

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::PageState,
        to: state::PageState,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid rate limit: {0}")]
    InvalidRateLimit(String),

    #[error("Failed to read URL list {path}: {message}")]
    UrlList { path: String, message: String },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("Path segment {0:?} cannot be used as a file name")]
    UnsafeSegment(String),
}

/// Result type alias for Sumi-Mirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;

// Re-export commonly used types
pub use config::MirrorConfig;
pub use crawler::{run_mirror, Coordinator, Fetcher, HttpFetcher, MirrorReport, MirrorSettings};
pub use output::{TracingLog, TransferLog};
pub use state::PageState;
