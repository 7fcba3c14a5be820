//! Crawler module for mirroring sites
//!
//! This module contains the core mirroring logic, including:
//! - HTTP fetching with progress reporting and throttling
//! - HTML parsing and same-host link extraction
//! - Reject/exclude filtering
//! - The shared frontier and the worker coordination around it
//! - Plain single-URL and URL-list downloads

mod coordinator;
mod download;
mod fetcher;
mod filter;
mod frontier;
mod parser;

pub use coordinator::{
    run_mirror, Coordinator, MirrorReport, MirrorSettings, PageOutcome, PageRecord,
};
pub use download::{
    download_file, download_input, DownloadRecord, DownloadReport, DEFAULT_DOWNLOAD_CONCURRENCY,
};
pub use fetcher::{
    build_http_client, FetchError, FetchResponse, Fetcher, HttpFetcher, MAX_REDIRECTS,
    PROGRESS_INTERVAL,
};
pub use filter::should_skip;
pub use frontier::{CrawlTarget, Frontier};
pub use parser::extract_links;

pub(crate) use parser::{css_url_regex, link_attribute};
